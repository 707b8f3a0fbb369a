//! Remote platform error codes

pub const SYSTEM_BUSY: i64 = -1;
pub const SUCCESS: i64 = 0;

// 400xx: invalid parameters
pub const INVALID_CREDENTIAL: i64 = 40001;
pub const INVALID_GRANT_TYPE: i64 = 40002;
pub const INVALID_OPENID: i64 = 40003;
pub const INVALID_MEDIA_TYPE: i64 = 40004;
pub const INVALID_FILE_TYPE: i64 = 40005;
pub const INVALID_FILE_SIZE: i64 = 40006;
pub const INVALID_MEDIA_ID: i64 = 40007;
pub const INVALID_MESSAGE_TYPE: i64 = 40008;
pub const INVALID_APPID: i64 = 40013;
pub const ACCESS_TOKEN_INVALID: i64 = 40014;
pub const INVALID_MENU_TYPE: i64 = 40015;
pub const INVALID_BUTTON_COUNT: i64 = 40016;
pub const INVALID_BUTTON_TYPE: i64 = 40017;
pub const INVALID_BUTTON_NAME_LENGTH: i64 = 40018;
pub const INVALID_BUTTON_KEY_LENGTH: i64 = 40019;
pub const INVALID_BUTTON_URL_LENGTH: i64 = 40020;
pub const INVALID_SUB_BUTTON_COUNT: i64 = 40023;
pub const INVALID_PARAMETER: i64 = 40035;
pub const INVALID_REQUEST_FORMAT: i64 = 40038;
pub const INVALID_URL_LENGTH: i64 = 40039;
pub const INVALID_GROUP_ID: i64 = 40050;
pub const INVALID_GROUP_NAME: i64 = 40051;

// 410xx: missing parameters
pub const ACCESS_TOKEN_MISSING: i64 = 41001;
pub const APPID_MISSING: i64 = 41002;
pub const SECRET_MISSING: i64 = 41004;
pub const MEDIA_DATA_MISSING: i64 = 41005;
pub const MEDIA_ID_MISSING: i64 = 41006;
pub const OPENID_MISSING: i64 = 41009;

// 420xx: timeouts
pub const ACCESS_TOKEN_TIMEOUT: i64 = 42001;

// 43xxx-46xxx: request and resource constraints
pub const GET_REQUIRED: i64 = 43001;
pub const POST_REQUIRED: i64 = 43002;
pub const HTTPS_REQUIRED: i64 = 43003;
pub const RECEIVER_NOT_FOLLOWING: i64 = 43004;
pub const EMPTY_MEDIA: i64 = 44001;
pub const EMPTY_POST_BODY: i64 = 44002;
pub const EMPTY_NEWS: i64 = 44003;
pub const EMPTY_TEXT: i64 = 44004;
pub const MEDIA_SIZE_EXCEEDED: i64 = 45001;
pub const CONTENT_SIZE_EXCEEDED: i64 = 45002;
pub const API_CALL_LIMIT_EXCEEDED: i64 = 45009;
pub const REPLY_TIME_EXCEEDED: i64 = 45015;
pub const SYSTEM_GROUP_READ_ONLY: i64 = 45016;
pub const GROUP_NAME_TOO_LONG: i64 = 45017;
pub const GROUP_LIMIT_EXCEEDED: i64 = 45018;
pub const MEDIA_NOT_FOUND: i64 = 46001;
pub const MENU_NOT_FOUND: i64 = 46003;
pub const USER_NOT_FOUND: i64 = 46004;

pub const JSON_XML_PARSE_ERROR: i64 = 47001;
pub const API_UNAUTHORIZED: i64 = 48001;
pub const API_USER_UNAUTHORIZED: i64 = 50001;

/// Human-readable meaning of a remote error code, for logs
pub fn describe(code: i64) -> &'static str {
    match code {
        SYSTEM_BUSY => "system busy",
        SUCCESS => "ok",
        INVALID_CREDENTIAL => "invalid app secret or access token",
        INVALID_GRANT_TYPE => "invalid grant type",
        INVALID_OPENID => "invalid openid",
        INVALID_MEDIA_TYPE => "invalid media type",
        INVALID_FILE_TYPE => "invalid file type",
        INVALID_FILE_SIZE => "invalid file size",
        INVALID_MEDIA_ID => "invalid media id",
        INVALID_MESSAGE_TYPE => "invalid message type",
        INVALID_APPID => "invalid appid",
        ACCESS_TOKEN_INVALID => "invalid access token",
        INVALID_MENU_TYPE => "invalid menu type",
        INVALID_BUTTON_COUNT => "invalid button count",
        INVALID_BUTTON_TYPE => "invalid button type",
        INVALID_BUTTON_NAME_LENGTH => "invalid button name length",
        INVALID_BUTTON_KEY_LENGTH => "invalid button key length",
        INVALID_BUTTON_URL_LENGTH => "invalid button url length",
        INVALID_SUB_BUTTON_COUNT => "invalid sub-button count",
        INVALID_PARAMETER => "invalid parameter",
        INVALID_REQUEST_FORMAT => "invalid request format",
        INVALID_URL_LENGTH => "invalid url length",
        INVALID_GROUP_ID => "invalid group id",
        INVALID_GROUP_NAME => "invalid group name",
        ACCESS_TOKEN_MISSING => "access_token missing",
        APPID_MISSING => "appid missing",
        SECRET_MISSING => "secret missing",
        MEDIA_DATA_MISSING => "media data missing",
        MEDIA_ID_MISSING => "media_id missing",
        OPENID_MISSING => "openid missing",
        ACCESS_TOKEN_TIMEOUT => "access token expired",
        GET_REQUIRED => "GET required",
        POST_REQUIRED => "POST required",
        HTTPS_REQUIRED => "HTTPS required",
        RECEIVER_NOT_FOLLOWING => "receiver must follow the account",
        EMPTY_MEDIA => "media file is empty",
        EMPTY_POST_BODY => "POST body is empty",
        EMPTY_NEWS => "news content is empty",
        EMPTY_TEXT => "text content is empty",
        MEDIA_SIZE_EXCEEDED => "media size limit exceeded",
        CONTENT_SIZE_EXCEEDED => "content size limit exceeded",
        API_CALL_LIMIT_EXCEEDED => "api call limit exceeded",
        REPLY_TIME_EXCEEDED => "reply window exceeded",
        SYSTEM_GROUP_READ_ONLY => "system group cannot be modified",
        GROUP_NAME_TOO_LONG => "group name too long",
        GROUP_LIMIT_EXCEEDED => "group limit exceeded",
        MEDIA_NOT_FOUND => "media not found",
        MENU_NOT_FOUND => "menu not found",
        USER_NOT_FOUND => "user not found",
        JSON_XML_PARSE_ERROR => "JSON/XML parse error",
        API_UNAUTHORIZED => "api not authorized",
        API_USER_UNAUTHORIZED => "user has not authorized this api",
        _ => "unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_known_and_unknown() {
        assert_eq!(describe(ACCESS_TOKEN_TIMEOUT), "access token expired");
        assert_eq!(describe(SUCCESS), "ok");
        assert_eq!(describe(99999), "unknown error");
    }
}
