//! Follower groups and user profiles

use std::fmt;

use mp_common::ApiStatus;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::client::ApiClient;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    /// Members in the group; absent in create responses
    #[serde(default)]
    pub count: u64,
}

/// Language for localized profile fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lang {
    #[default]
    ZhCn,
    ZhTw,
    En,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::ZhCn => "zh_CN",
            Lang::ZhTw => "zh_TW",
            Lang::En => "en",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    /// 0 when the user does not follow the account; the other fields are then empty
    #[serde(default)]
    pub subscribe: i32,
    pub openid: String,
    #[serde(default)]
    pub nickname: String,
    /// 1 male, 2 female, 0 unknown
    #[serde(default)]
    pub sex: i32,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub headimgurl: String,
    #[serde(default)]
    pub subscribe_time: i64,
    #[serde(default)]
    pub unionid: Option<String>,
}

impl UserInfo {
    pub fn is_subscribed(&self) -> bool {
        self.subscribe != 0
    }
}

/// One page of the follower list
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Followers {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub data: OpenIdList,
    /// Pass to the next call to continue; empty on the last page
    #[serde(default)]
    pub next_openid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OpenIdList {
    #[serde(default)]
    pub openid: Vec<String>,
}

impl Followers {
    pub fn openids(&self) -> &[String] {
        &self.data.openid
    }

    pub fn has_more(&self) -> bool {
        !self.next_openid.is_empty() && !self.data.openid.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct GroupResponse {
    group: Group,
}

#[derive(Debug, Deserialize)]
struct GroupsResponse {
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
struct GroupIdResponse {
    groupid: i64,
}

impl ApiClient {
    pub async fn create_group(&self, name: &str) -> Result<Group> {
        let response: GroupResponse = self
            .post_json("/groups/create", &json!({"group": {"name": name}}))
            .await?;
        info!(group_id = response.group.id, name = %response.group.name, "Group created");
        Ok(response.group)
    }

    pub async fn groups(&self) -> Result<Vec<Group>> {
        let response: GroupsResponse = self.get_json("/groups/get", &[]).await?;
        Ok(response.groups)
    }

    /// Group the user currently belongs to
    pub async fn group_of(&self, openid: &str) -> Result<i64> {
        let response: GroupIdResponse = self
            .post_json("/groups/getid", &json!({"openid": openid}))
            .await?;
        Ok(response.groupid)
    }

    pub async fn update_group(&self, id: i64, name: &str) -> Result<()> {
        let _: ApiStatus = self
            .post_json("/groups/update", &json!({"group": {"id": id, "name": name}}))
            .await?;
        Ok(())
    }

    pub async fn move_user_to_group(&self, openid: &str, group_id: i64) -> Result<()> {
        let _: ApiStatus = self
            .post_json(
                "/groups/members/update",
                &json!({"openid": openid, "to_groupid": group_id}),
            )
            .await?;
        Ok(())
    }

    pub async fn user_info(&self, openid: &str, lang: Lang) -> Result<UserInfo> {
        self.get_json("/user/info", &[("openid", openid), ("lang", lang.as_str())])
            .await
    }

    /// Fetch one page of followers, starting after `next_openid` when given
    pub async fn followers(&self, next_openid: Option<&str>) -> Result<Followers> {
        match next_openid {
            Some(start) if !start.is_empty() => {
                self.get_json("/user/get", &[("next_openid", start)]).await
            }
            _ => self.get_json("/user/get", &[]).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_followers_last_page() {
        let page: Followers =
            serde_json::from_str(r#"{"total":2,"count":0,"next_openid":""}"#).unwrap();
        assert!(page.openids().is_empty());
        assert!(!page.has_more());
    }

    #[test]
    fn test_unsubscribed_user_info() {
        let info: UserInfo =
            serde_json::from_str(r#"{"subscribe":0,"openid":"o6_bmjrPTlm6_2sgVt7hMZOPfL2M"}"#)
                .unwrap();
        assert!(!info.is_subscribed());
        assert!(info.nickname.is_empty());
    }

    #[test]
    fn test_lang_codes() {
        assert_eq!(Lang::default().as_str(), "zh_CN");
        assert_eq!(Lang::En.to_string(), "en");
    }
}
