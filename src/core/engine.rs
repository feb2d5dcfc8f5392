use crate::core::Pipeline;
use crate::utils::error::Result;

/// Drives a pipeline through collect, render and emit.
pub struct GritEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> GritEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Collecting definitions...");
        let folders = self.pipeline.collect().await?;
        tracing::info!(
            "Collected {} folders with {} definition files",
            folders.len(),
            folders.iter().map(|f| f.files.len()).sum::<usize>()
        );

        tracing::info!("Rendering...");
        let result = self.pipeline.render(folders).await?;
        tracing::info!(
            "Rendered {} dashboards and {} alert rules for '{}'",
            result.dashboards.len(),
            result.rule_count(),
            result.variation.name
        );

        let summary = self.pipeline.emit(result).await?;
        tracing::info!("{}", summary);

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::folder::Folder;
    use crate::domain::model::{FolderDefinition, RenderResult};
    use crate::domain::variation::Variation;
    use crate::utils::error::GritError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPipeline {
        calls: Mutex<Vec<&'static str>>,
        fail_render: bool,
    }

    #[async_trait]
    impl Pipeline for RecordingPipeline {
        async fn collect(&self) -> Result<Vec<FolderDefinition>> {
            self.calls.lock().unwrap().push("collect");
            Ok(vec![FolderDefinition {
                dir_name: "ops".to_string(),
                folder: Folder::new("Ops"),
                files: vec![],
            }])
        }

        async fn render(&self, folders: Vec<FolderDefinition>) -> Result<RenderResult> {
            self.calls.lock().unwrap().push("render");
            if self.fail_render {
                return Err(GritError::layout("broken"));
            }
            assert_eq!(folders.len(), 1);
            Ok(RenderResult {
                variation: Variation::default(),
                dashboards: vec![],
                alerts: vec![],
            })
        }

        async fn emit(&self, result: RenderResult) -> Result<String> {
            self.calls.lock().unwrap().push("emit");
            Ok(format!("emitted {}", result.variation.name))
        }
    }

    #[tokio::test]
    async fn test_run_calls_phases_in_order() {
        let engine = GritEngine::new(RecordingPipeline::default());
        let summary = engine.run().await.unwrap();

        assert_eq!(summary, "emitted default");
        assert_eq!(
            *engine.pipeline.calls.lock().unwrap(),
            vec!["collect", "render", "emit"]
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_render_error() {
        let engine = GritEngine::new(RecordingPipeline {
            fail_render: true,
            ..Default::default()
        });
        assert!(engine.run().await.is_err());
        assert_eq!(*engine.pipeline.calls.lock().unwrap(), vec!["collect", "render"]);
    }
}
