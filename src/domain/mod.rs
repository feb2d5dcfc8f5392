pub mod alert;
pub mod dashboard;
pub mod folder;
pub mod layout;
pub mod model;
pub mod panel;
pub mod ports;
pub mod target;
pub mod variation;

use serde_json::Value;

/// Rendering into the JSON documents Grafana consumes.
pub trait ToJsonData {
    fn to_json_data(&self) -> Value;
}
