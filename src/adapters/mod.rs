// Adapters for external systems.

pub mod grafana;

pub use grafana::GrafanaClient;
