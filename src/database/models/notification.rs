use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outbound message for the external delivery subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub recipient_id: Uuid,
    pub content: String,
}

impl Notification {
    pub fn new(recipient_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            recipient_id,
            content: content.into(),
        }
    }
}
