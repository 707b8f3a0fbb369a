//! Inbound XML decoding
//!
//! Payloads are a flat `<xml>` element whose children depend on `MsgType`
//! (and `Event` for events). Values may be plain text or CDATA.

use std::str::FromStr;

use mp_common::{
    Article, Coordinate, Event, EventType, InboundMessage, MessageBody, Music, MsgType, TitleDesc,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::de::DeError),

    #[error("Missing required field {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("Unreadable request body: {0}")]
    Body(String),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Wire shape: every field optional, validated in [`decode`]
#[derive(Debug, Default, Deserialize)]
struct RawMessage {
    #[serde(rename = "ToUserName")]
    to_user: Option<String>,
    #[serde(rename = "FromUserName")]
    from_user: Option<String>,
    #[serde(rename = "CreateTime")]
    create_time: Option<String>,
    #[serde(rename = "MsgType")]
    msg_type: Option<String>,
    #[serde(rename = "MsgId")]
    msg_id: Option<String>,

    #[serde(rename = "Content")]
    content: Option<String>,
    #[serde(rename = "PicUrl")]
    pic_url: Option<String>,
    #[serde(rename = "MediaId")]
    media_id: Option<String>,
    #[serde(rename = "Format")]
    format: Option<String>,
    #[serde(rename = "Recognition")]
    recognition: Option<String>,
    #[serde(rename = "ThumbMediaId")]
    thumb_media_id: Option<String>,
    #[serde(rename = "Location_X")]
    location_x: Option<String>,
    #[serde(rename = "Location_Y")]
    location_y: Option<String>,
    #[serde(rename = "Scale")]
    scale: Option<String>,
    #[serde(rename = "Label")]
    label: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
    #[serde(rename = "Url")]
    url: Option<String>,
    #[serde(rename = "MusicUrl")]
    music_url: Option<String>,
    #[serde(rename = "HQMusicUrl")]
    hq_music_url: Option<String>,
    #[serde(rename = "Articles")]
    articles: Option<RawArticles>,

    #[serde(rename = "Event")]
    event: Option<String>,
    #[serde(rename = "EventKey")]
    event_key: Option<String>,
    #[serde(rename = "Ticket")]
    ticket: Option<String>,
    #[serde(rename = "Latitude")]
    latitude: Option<String>,
    #[serde(rename = "Longitude")]
    longitude: Option<String>,
    #[serde(rename = "Precision")]
    precision: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawArticles {
    #[serde(rename = "item", default)]
    items: Vec<RawArticle>,
}

#[derive(Debug, Default, Deserialize)]
struct RawArticle {
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
    #[serde(rename = "Url")]
    url: Option<String>,
    #[serde(rename = "PicUrl")]
    pic_url: Option<String>,
}

/// Prefix on `EventKey` for subscribes that came from a parametric QR code
const QR_SCENE_PREFIX: &str = "qrscene_";

pub fn decode(raw: &[u8]) -> Result<InboundMessage> {
    let text = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidField {
        field: "body",
        value: "non UTF-8 payload".to_string(),
    })?;
    let msg: RawMessage = quick_xml::de::from_str(text)?;

    let to_user = required(msg.to_user.clone(), "ToUserName")?;
    let from_user = required(msg.from_user.clone(), "FromUserName")?;
    let create_time = parse_num::<i64>(msg.create_time.as_deref(), "CreateTime")?
        .ok_or(DecodeError::MissingField("CreateTime"))?;
    let msg_type = required(msg.msg_type.clone(), "MsgType")?;
    let msg_id = parse_num::<u64>(msg.msg_id.as_deref(), "MsgId")?;

    let body = decode_body(&msg_type, msg)?;

    Ok(InboundMessage {
        to_user,
        from_user,
        create_time,
        msg_id,
        body,
    })
}

fn decode_body(msg_type: &str, msg: RawMessage) -> Result<MessageBody> {
    let Ok(kind) = MsgType::from_str(msg_type) else {
        return Ok(MessageBody::Unknown {
            msg_type: msg_type.to_string(),
        });
    };

    let body = match kind {
        MsgType::Text => MessageBody::Text {
            content: msg.content.unwrap_or_default(),
        },
        MsgType::Image => MessageBody::Image {
            pic_url: msg.pic_url.unwrap_or_default(),
            media_id: msg.media_id.unwrap_or_default(),
        },
        MsgType::Voice => MessageBody::Voice {
            media_id: msg.media_id.unwrap_or_default(),
            format: msg.format.unwrap_or_default(),
            recognition: msg.recognition.filter(|r| !r.is_empty()),
        },
        MsgType::Video => MessageBody::Video {
            media_id: msg.media_id.unwrap_or_default(),
            thumb_media_id: msg.thumb_media_id.unwrap_or_default(),
        },
        MsgType::Music => MessageBody::Music {
            info: TitleDesc::new(
                msg.title.unwrap_or_default(),
                msg.description.unwrap_or_default(),
            ),
            music: Music {
                music_url: msg.music_url.unwrap_or_default(),
                hq_music_url: msg.hq_music_url.unwrap_or_default(),
                thumb_media_id: msg.thumb_media_id.unwrap_or_default(),
            },
        },
        MsgType::News => MessageBody::News {
            articles: msg
                .articles
                .map(|a| a.items)
                .unwrap_or_default()
                .into_iter()
                .map(|item| {
                    Article::new(
                        item.title.unwrap_or_default(),
                        item.description.unwrap_or_default(),
                        item.url.unwrap_or_default(),
                        item.pic_url.unwrap_or_default(),
                    )
                })
                .collect(),
        },
        MsgType::Location => MessageBody::Location {
            coordinate: Coordinate {
                latitude: parse_num(msg.location_x.as_deref(), "Location_X")?.unwrap_or_default(),
                longitude: parse_num(msg.location_y.as_deref(), "Location_Y")?.unwrap_or_default(),
            },
            scale: parse_num(msg.scale.as_deref(), "Scale")?.unwrap_or_default(),
            label: msg.label.unwrap_or_default(),
        },
        MsgType::Link => MessageBody::Link {
            info: TitleDesc::new(
                msg.title.unwrap_or_default(),
                msg.description.unwrap_or_default(),
            ),
            url: msg.url.unwrap_or_default(),
        },
        MsgType::Event => MessageBody::Event(decode_event(msg)?),
    };
    Ok(body)
}

fn decode_event(msg: RawMessage) -> Result<Event> {
    let name = required(msg.event, "Event")?;
    let key = msg.event_key.filter(|k| !k.is_empty());
    let ticket = msg.ticket.filter(|t| !t.is_empty());

    let Ok(kind) = EventType::from_str(&name) else {
        return Ok(Event::Unknown { event: name, key });
    };

    let event = match kind {
        EventType::Subscribe => Event::Subscribe {
            scene_key: key.map(|k| {
                k.strip_prefix(QR_SCENE_PREFIX)
                    .map(str::to_string)
                    .unwrap_or(k)
            }),
            ticket,
        },
        EventType::Unsubscribe => Event::Unsubscribe,
        EventType::Scan => Event::Scan {
            key: key.unwrap_or_default(),
            ticket,
        },
        EventType::Location => Event::Location {
            latitude: parse_num(msg.latitude.as_deref(), "Latitude")?.unwrap_or_default(),
            longitude: parse_num(msg.longitude.as_deref(), "Longitude")?.unwrap_or_default(),
            precision: parse_num(msg.precision.as_deref(), "Precision")?.unwrap_or_default(),
        },
        EventType::Click => Event::Click {
            key: key.unwrap_or_default(),
        },
        EventType::View => Event::View {
            url: key.unwrap_or_default(),
        },
    };
    Ok(event)
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DecodeError::MissingField(field)),
    }
}

/// Absent or blank is `None`; present but unparsable is an error
fn parse_num<T: FromStr>(value: Option<&str>, field: &'static str) -> Result<Option<T>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| DecodeError::InvalidField {
            field,
            value: v.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_cdata() {
        let xml = r#"<xml>
            <ToUserName><![CDATA[toUser]]></ToUserName>
            <FromUserName><![CDATA[fromUser]]></FromUserName>
            <CreateTime>1348831860</CreateTime>
            <MsgType><![CDATA[text]]></MsgType>
            <Content><![CDATA[this is a test]]></Content>
            <MsgId>1234567890123456</MsgId>
        </xml>"#;

        let msg = decode(xml.as_bytes()).unwrap();
        assert_eq!(msg.to_user, "toUser");
        assert_eq!(msg.from_user, "fromUser");
        assert_eq!(msg.create_time, 1348831860);
        assert_eq!(msg.msg_id, Some(1234567890123456));
        assert_eq!(msg.text(), Some("this is a test"));
    }

    #[test]
    fn test_decode_plain_text_values() {
        let xml = "<xml><ToUserName>a</ToUserName><FromUserName>b</FromUserName>\
                   <CreateTime>1</CreateTime><MsgType>text</MsgType><Content>hi &amp; bye</Content></xml>";
        let msg = decode(xml.as_bytes()).unwrap();
        assert_eq!(msg.text(), Some("hi & bye"));
        assert_eq!(msg.msg_id, None);
    }

    #[test]
    fn test_decode_location_coordinate() {
        let xml = r#"<xml>
            <ToUserName><![CDATA[toUser]]></ToUserName>
            <FromUserName><![CDATA[fromUser]]></FromUserName>
            <CreateTime>1351776360</CreateTime>
            <MsgType><![CDATA[location]]></MsgType>
            <Location_X>23.134521</Location_X>
            <Location_Y>113.358803</Location_Y>
            <Scale>20</Scale>
            <Label><![CDATA[Location]]></Label>
            <MsgId>1234567890123456</MsgId>
        </xml>"#;

        let msg = decode(xml.as_bytes()).unwrap();
        match msg.body {
            MessageBody::Location { coordinate, scale, label } => {
                assert_eq!(coordinate.latitude, 23.134521);
                assert_eq!(coordinate.longitude, 113.358803);
                assert_eq!(scale, 20);
                assert_eq!(label, "Location");
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_decode_voice_with_recognition() {
        let xml = r#"<xml><ToUserName>a</ToUserName><FromUserName>b</FromUserName>
            <CreateTime>1</CreateTime><MsgType>voice</MsgType>
            <MediaId>media_id</MediaId><Format>amr</Format>
            <Recognition><![CDATA[hello]]></Recognition></xml>"#;
        let msg = decode(xml.as_bytes()).unwrap();
        assert_eq!(
            msg.body,
            MessageBody::Voice {
                media_id: "media_id".to_string(),
                format: "amr".to_string(),
                recognition: Some("hello".to_string()),
            }
        );
    }

    #[test]
    fn test_decode_image() {
        let xml = r#"<xml><ToUserName>a</ToUserName><FromUserName>b</FromUserName>
            <CreateTime>1</CreateTime><MsgType>image</MsgType>
            <PicUrl><![CDATA[http://img.example/1.jpg]]></PicUrl>
            <MediaId>img_media</MediaId><MsgId>7</MsgId></xml>"#;
        let msg = decode(xml.as_bytes()).unwrap();
        assert_eq!(msg.msg_id, Some(7));
        assert_eq!(
            msg.body,
            MessageBody::Image {
                pic_url: "http://img.example/1.jpg".to_string(),
                media_id: "img_media".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_video() {
        let xml = r#"<xml><ToUserName>a</ToUserName><FromUserName>b</FromUserName>
            <CreateTime>1</CreateTime><MsgType>video</MsgType>
            <MediaId>video_media</MediaId><ThumbMediaId>thumb_media</ThumbMediaId></xml>"#;
        let msg = decode(xml.as_bytes()).unwrap();
        assert_eq!(
            msg.body,
            MessageBody::Video {
                media_id: "video_media".to_string(),
                thumb_media_id: "thumb_media".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_music() {
        let xml = r#"<xml><ToUserName>a</ToUserName><FromUserName>b</FromUserName>
            <CreateTime>1</CreateTime><MsgType>music</MsgType>
            <Title>song</Title><Description>artist</Description>
            <MusicUrl>http://m.example/s.mp3</MusicUrl><HQMusicUrl>http://m.example/hq.mp3</HQMusicUrl>
            <ThumbMediaId>cover</ThumbMediaId></xml>"#;
        let msg = decode(xml.as_bytes()).unwrap();
        assert_eq!(
            msg.body,
            MessageBody::Music {
                info: TitleDesc::new("song", "artist"),
                music: Music {
                    music_url: "http://m.example/s.mp3".to_string(),
                    hq_music_url: "http://m.example/hq.mp3".to_string(),
                    thumb_media_id: "cover".to_string(),
                },
            }
        );
    }

    #[test]
    fn test_decode_link() {
        let xml = r#"<xml><ToUserName>a</ToUserName><FromUserName>b</FromUserName>
            <CreateTime>1</CreateTime><MsgType>link</MsgType>
            <Title><![CDATA[Read this]]></Title><Description><![CDATA[summary]]></Description>
            <Url><![CDATA[http://example.com/post?a=1&b=2]]></Url></xml>"#;
        let msg = decode(xml.as_bytes()).unwrap();
        assert_eq!(
            msg.body,
            MessageBody::Link {
                info: TitleDesc::new("Read this", "summary"),
                url: "http://example.com/post?a=1&b=2".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_news_items() {
        let xml = r#"<xml><ToUserName>a</ToUserName><FromUserName>b</FromUserName>
            <CreateTime>1</CreateTime><MsgType>news</MsgType><ArticleCount>2</ArticleCount>
            <Articles>
              <item><Title>t1</Title><Description>d1</Description><PicUrl>p1</PicUrl><Url>u1</Url></item>
              <item><Title>t2</Title><Description>d2</Description><PicUrl>p2</PicUrl><Url>u2</Url></item>
            </Articles></xml>"#;
        let msg = decode(xml.as_bytes()).unwrap();
        match msg.body {
            MessageBody::News { articles } => {
                assert_eq!(articles.len(), 2);
                assert_eq!(articles[1], Article::new("t2", "d2", "u2", "p2"));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_decode_click_event_uppercase() {
        let xml = r#"<xml>
            <ToUserName><![CDATA[toUser]]></ToUserName>
            <FromUserName><![CDATA[FromUser]]></FromUserName>
            <CreateTime>123456789</CreateTime>
            <MsgType><![CDATA[event]]></MsgType>
            <Event><![CDATA[CLICK]]></Event>
            <EventKey><![CDATA[EVENTKEY]]></EventKey>
        </xml>"#;
        let msg = decode(xml.as_bytes()).unwrap();
        assert_eq!(msg.event(), Some(&Event::Click { key: "EVENTKEY".to_string() }));
    }

    #[test]
    fn test_decode_qr_subscribe_strips_scene_prefix() {
        let xml = r#"<xml><ToUserName>a</ToUserName><FromUserName>b</FromUserName>
            <CreateTime>1</CreateTime><MsgType>event</MsgType><Event>subscribe</Event>
            <EventKey><![CDATA[qrscene_123123]]></EventKey><Ticket><![CDATA[TICKET]]></Ticket></xml>"#;
        let msg = decode(xml.as_bytes()).unwrap();
        assert_eq!(
            msg.event(),
            Some(&Event::Subscribe {
                scene_key: Some("123123".to_string()),
                ticket: Some("TICKET".to_string()),
            })
        );
    }

    #[test]
    fn test_decode_location_event() {
        let xml = r#"<xml><ToUserName>a</ToUserName><FromUserName>b</FromUserName>
            <CreateTime>1</CreateTime><MsgType>event</MsgType><Event>LOCATION</Event>
            <Latitude>23.137466</Latitude><Longitude>113.352425</Longitude><Precision>119.385040</Precision></xml>"#;
        let msg = decode(xml.as_bytes()).unwrap();
        match msg.event() {
            Some(Event::Location { latitude, precision, .. }) => {
                assert_eq!(*latitude, 23.137466);
                assert_eq!(*precision, 119.38504);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_types_decode() {
        let xml = "<xml><ToUserName>a</ToUserName><FromUserName>b</FromUserName>\
                   <CreateTime>1</CreateTime><MsgType>event</MsgType><Event>TEMPLATESENDJOBFINISH</Event></xml>";
        let msg = decode(xml.as_bytes()).unwrap();
        assert!(matches!(msg.event(), Some(Event::Unknown { .. })));

        let xml = "<xml><ToUserName>a</ToUserName><FromUserName>b</FromUserName>\
                   <CreateTime>1</CreateTime><MsgType>shortvideo</MsgType></xml>";
        let msg = decode(xml.as_bytes()).unwrap();
        assert_eq!(msg.msg_type(), None);
    }

    #[test]
    fn test_missing_header_rejected() {
        let xml = "<xml><ToUserName>a</ToUserName><CreateTime>1</CreateTime><MsgType>text</MsgType></xml>";
        assert!(matches!(
            decode(xml.as_bytes()),
            Err(DecodeError::MissingField("FromUserName"))
        ));
    }

    #[test]
    fn test_non_integer_create_time_rejected() {
        let xml = "<xml><ToUserName>a</ToUserName><FromUserName>b</FromUserName>\
                   <CreateTime>yesterday</CreateTime><MsgType>text</MsgType></xml>";
        assert!(matches!(
            decode(xml.as_bytes()),
            Err(DecodeError::InvalidField { field: "CreateTime", .. })
        ));
    }

    #[test]
    fn test_malformed_xml_rejected() {
        assert!(decode(b"<xml><ToUserName>a</FromUserName></xml>").is_err());
        assert!(decode(b"not xml at all").is_err());
        assert!(decode(b"").is_err());
    }
}
