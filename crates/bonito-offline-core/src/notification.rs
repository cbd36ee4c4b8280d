//! Push payloads and notification clicks.
//!
//! The cache manager does not display anything itself: a push produces the
//! `Notification` the host should show, and a click produces the
//! `ClickResponse` describing what to do with the notification and the
//! client windows.

use serde::{Deserialize, Serialize};

const DEFAULT_TITLE: &str = "Bonito Guide";
const DEFAULT_BODY: &str = "Nova informação disponível";
const ICON: &str = "/icon-192x192.png";
const BADGE: &str = "/icon-72x72.png";
const TAG: &str = "bonito-notification";

pub const ACTION_OPEN: &str = "open";
pub const ACTION_CLOSE: &str = "close";

/// Window opened when the user asks for the app
const ROOT_PATH: &str = "/";

#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Build the notification for a JSON push payload `{title, body}`.
    /// Missing fields fall back to the guide's defaults.
    pub fn from_push(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let payload: PushPayload = serde_json::from_slice(payload)?;

        Ok(Self {
            title: non_empty(payload.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: non_empty(payload.body).unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: ICON.to_string(),
            badge: BADGE.to_string(),
            tag: TAG.to_string(),
            require_interaction: true,
            actions: vec![
                NotificationAction {
                    action: ACTION_OPEN.to_string(),
                    title: "Abrir App".to_string(),
                },
                NotificationAction {
                    action: ACTION_CLOSE.to_string(),
                    title: "Fechar".to_string(),
                },
            ],
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// What the host must do after a notification click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickResponse {
    pub close_notification: bool,
    /// Focus an existing client window at this path, or open a new one.
    pub focus_or_open: Option<String>,
}

impl ClickResponse {
    /// The default tap and the "open" action bring the app forward at the
    /// root path; any other action just dismisses the notification.
    pub fn for_action(action: Option<&str>) -> Self {
        let open = match action {
            None | Some("") => true,
            Some(action) => action == ACTION_OPEN,
        };

        Self {
            close_notification: true,
            focus_or_open: open.then(|| ROOT_PATH.to_string()),
        }
    }
}
