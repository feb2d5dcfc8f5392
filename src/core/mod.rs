pub mod alert_builder;
pub mod engine;
pub mod renderer;

pub use crate::domain::model::{FolderDefinition, RenderResult};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
