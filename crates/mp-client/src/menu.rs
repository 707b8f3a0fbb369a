//! Custom menu management

use mp_common::ApiStatus;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::ApiClient;
use crate::error::{ClientError, Result};

pub const MAX_BUTTONS: usize = 3;
pub const MAX_SUB_BUTTONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonKind {
    /// Delivers a click event carrying the button key
    Click,
    /// Opens the button URL
    View,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ButtonKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_button: Vec<Button>,
}

impl Button {
    pub fn click(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Some(ButtonKind::Click),
            key: Some(key.into()),
            url: None,
            sub_button: Vec::new(),
        }
    }

    pub fn view(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Some(ButtonKind::View),
            key: None,
            url: Some(url.into()),
            sub_button: Vec::new(),
        }
    }

    /// A top-level button that only opens a sub-menu
    pub fn group(name: impl Into<String>, sub_buttons: Vec<Button>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            key: None,
            url: None,
            sub_button: sub_buttons,
        }
    }

    fn validate_leaf(&self) -> Result<()> {
        match self.kind {
            Some(ButtonKind::Click) if self.key.as_deref().map_or(true, str::is_empty) => Err(
                ClientError::invalid_request(format!("click button '{}' has no key", self.name)),
            ),
            Some(ButtonKind::View) if self.url.as_deref().map_or(true, str::is_empty) => Err(
                ClientError::invalid_request(format!("view button '{}' has no url", self.name)),
            ),
            Some(_) => Ok(()),
            None => Err(ClientError::invalid_request(format!(
                "button '{}' has neither a type nor sub-buttons",
                self.name
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    #[serde(default)]
    pub button: Vec<Button>,
}

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.button.push(button);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.button.is_empty() {
            return Err(ClientError::invalid_request("menu has no buttons"));
        }
        if self.button.len() > MAX_BUTTONS {
            return Err(ClientError::invalid_request(format!(
                "menu has {} buttons, at most {} allowed",
                self.button.len(),
                MAX_BUTTONS
            )));
        }

        for button in &self.button {
            if button.sub_button.is_empty() {
                button.validate_leaf()?;
                continue;
            }
            if button.sub_button.len() > MAX_SUB_BUTTONS {
                return Err(ClientError::invalid_request(format!(
                    "button '{}' has {} sub-buttons, at most {} allowed",
                    button.name,
                    button.sub_button.len(),
                    MAX_SUB_BUTTONS
                )));
            }
            for sub in &button.sub_button {
                if !sub.sub_button.is_empty() {
                    return Err(ClientError::invalid_request(format!(
                        "sub-button '{}' cannot have its own sub-buttons",
                        sub.name
                    )));
                }
                sub.validate_leaf()?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct MenuResponse {
    menu: Menu,
}

impl ApiClient {
    /// Replace the account menu. The menu is validated locally first.
    pub async fn create_menu(&self, menu: &Menu) -> Result<()> {
        menu.validate()?;
        let _: ApiStatus = self.post_json("/menu/create", menu).await?;
        info!(buttons = menu.button.len(), "Menu created");
        Ok(())
    }

    pub async fn get_menu(&self) -> Result<Menu> {
        let response: MenuResponse = self.get_json("/menu/get", &[]).await?;
        Ok(response.menu)
    }

    pub async fn delete_menu(&self) -> Result<()> {
        let _: ApiStatus = self.get_json("/menu/delete", &[]).await?;
        info!("Menu deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_menu_json_shape() {
        let menu = Menu::new()
            .with_button(Button::click("Today", "V1001_TODAY_MUSIC"))
            .with_button(Button::group(
                "More",
                vec![Button::view("Search", "http://www.soso.com/")],
            ));

        assert!(menu.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&menu).unwrap(),
            json!({"button": [
                {"name": "Today", "type": "click", "key": "V1001_TODAY_MUSIC"},
                {"name": "More", "sub_button": [
                    {"name": "Search", "type": "view", "url": "http://www.soso.com/"}
                ]}
            ]})
        );
    }

    #[test]
    fn test_too_many_buttons() {
        let mut menu = Menu::new();
        for i in 0..4 {
            menu = menu.with_button(Button::click(format!("b{}", i), "k"));
        }
        assert!(matches!(menu.validate(), Err(ClientError::InvalidRequest(_))));
    }

    #[test]
    fn test_too_many_sub_buttons() {
        let subs = (0..6).map(|i| Button::click(format!("s{}", i), "k")).collect();
        let menu = Menu::new().with_button(Button::group("g", subs));
        assert!(menu.validate().is_err());
    }

    #[test]
    fn test_click_requires_key() {
        let menu = Menu::new().with_button(Button::click("b", ""));
        assert!(menu.validate().is_err());
        assert!(Menu::new().validate().is_err());
    }

    #[test]
    fn test_get_menu_response_parses_empty_sub_buttons() {
        let body = json!({"menu": {"button": [
            {"type": "click", "name": "Today", "key": "K", "sub_button": []}
        ]}});
        let response: MenuResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.menu.button[0], Button::click("Today", "K"));
    }
}
