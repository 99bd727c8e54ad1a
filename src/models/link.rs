use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A destination row written by the management application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub id: String,
    pub handle: String,
    pub slug: Option<String>,
    pub app: Option<String>,
    pub app_route: Option<String>,
    pub app_id: Option<String>,
    pub url: Option<String>,
    pub android_scheme: Option<String>,
    pub apple_scheme: Option<String>,
    pub team_id: Option<String>,
}

impl LinkRecord {
    /// The destination URL, if the record carries a non-empty one.
    pub fn usable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.trim().is_empty())
    }

    pub fn is_usable(&self) -> bool {
        self.usable_url().is_some()
    }
}
