use serde::{Deserialize, Serialize};

/// Grafana folder a project directory is published into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub title: String,
    #[serde(default)]
    pub uid: Option<String>,
}

impl Folder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uid: None,
        }
    }
}
