pub mod output_pipeline;
pub mod publish_pipeline;

pub use output_pipeline::OutputPipeline;
pub use publish_pipeline::PublishPipeline;

use crate::config::loader::Project;
use crate::core::renderer;
use crate::domain::model::{FolderDefinition, RenderResult};
use crate::domain::variation::Variation;
use crate::utils::error::Result;

/// The collect and render phases every pipeline shares.
#[derive(Debug, Clone)]
pub struct ProjectSource {
    pub project: Project,
    pub variation: Variation,
}

impl ProjectSource {
    pub fn new(project: Project, variation: Variation) -> Self {
        Self { project, variation }
    }

    pub fn collect(&self) -> Result<Vec<FolderDefinition>> {
        tracing::debug!(
            "Loading '{}' for variation '{}'",
            self.project.name(),
            self.variation.name
        );
        self.project.load_folders(&self.variation)
    }

    pub fn render(&self, folders: Vec<FolderDefinition>) -> Result<RenderResult> {
        renderer::render(&self.variation, &self.project.config.alerting, folders)
    }
}
