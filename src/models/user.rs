use serde::{Deserialize, Serialize};

use super::slot::WorkingHours;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(rename = "workingHours", default)]
    pub working_hours: Option<WorkingHours>,
}

impl User {
    pub fn working_hours(&self) -> WorkingHours {
        self.preferences.working_hours.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inbox {
    #[serde(rename = "inboxId")]
    pub inbox_id: String,
    /// Owning user id.
    pub user: String,
    pub name: String,
    #[serde(default)]
    pub persona: String,
}
