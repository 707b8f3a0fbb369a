//! Outbound side of the MP gateway
//!
//! - [`CredentialStore`]: the latest access token, shared by every caller
//! - [`TokenRefresher`]: background task that keeps the store fresh
//! - [`ApiClient`]: push messages plus menu, group, user, QR code and media calls

pub mod client;
pub mod credential;
pub mod error;
pub mod media;
pub mod menu;
pub mod push;
pub mod qrcode;
pub mod refresher;
pub mod user;

pub use client::{ApiClient, ApiClientConfig};
pub use credential::{Credential, CredentialStore};
pub use error::{ClientError, Result};
pub use media::{MediaType, UploadedMedia};
pub use menu::{Button, ButtonKind, Menu};
pub use push::{PushBody, PushMessage, Pusher};
pub use qrcode::QrCode;
pub use refresher::{RefresherConfig, RefresherHandle, TokenRefresher, TokenSource};
pub use user::{Followers, Group, Lang, UserInfo};
