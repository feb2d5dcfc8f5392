pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::GrafanaClient;
pub use app::pipelines::{OutputPipeline, ProjectSource, PublishPipeline};
pub use config::{cli::LocalStorage, loader::Project};
pub use core::engine::GritEngine;
pub use utils::error::{GritError, Result};
