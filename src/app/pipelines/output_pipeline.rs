use crate::app::pipelines::ProjectSource;
use crate::core::{FolderDefinition, Pipeline, RenderResult, Storage};
use crate::domain::ToJsonData;
use crate::utils::error::Result;
use serde_json::{json, Value};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Writes rendered dashboards and alert provisioning files for one
/// variation below the storage root.
pub struct OutputPipeline<S: Storage> {
    source: ProjectSource,
    storage: S,
    output_root: String,
    bundle: bool,
    dry_run: bool,
}

impl<S: Storage> OutputPipeline<S> {
    pub fn new(source: ProjectSource, storage: S, output_root: impl Into<String>) -> Self {
        Self {
            source,
            storage,
            output_root: output_root.into(),
            bundle: false,
            dry_run: false,
        }
    }

    pub fn with_bundle(mut self, bundle: bool) -> Self {
        self.bundle = bundle;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Relative path and pretty JSON for every file of `result`.
    fn files(result: &RenderResult) -> Result<Vec<(String, String)>> {
        let env = &result.variation.name;
        let mut files = Vec::with_capacity(result.dashboards.len() + result.alerts.len() + 1);

        for rendered in &result.dashboards {
            files.push((
                format!(
                    "{}/{}/{}.json",
                    env,
                    rendered.folder_dir,
                    rendered.dashboard.uid()
                ),
                serde_json::to_string_pretty(&rendered.dashboard.to_json_data())?,
            ));
        }
        for rendered in &result.alerts {
            files.push((
                format!("{}-alerts/{}.json", env, rendered.uid),
                serde_json::to_string_pretty(&rendered.provisioning.to_json_data())?,
            ));
        }

        let manifest = Self::manifest(result, &files);
        files.push((
            format!("{}/manifest.json", env),
            serde_json::to_string_pretty(&manifest)?,
        ));
        Ok(files)
    }

    fn manifest(result: &RenderResult, files: &[(String, String)]) -> Value {
        let alerts_prefix = format!("{}-alerts/", result.variation.name);
        let (alerts, dashboards): (Vec<&str>, Vec<&str>) = files
            .iter()
            .map(|(path, _)| path.as_str())
            .partition(|path| path.starts_with(&alerts_prefix));

        json!({
            "alerts": alerts,
            "dashboards": dashboards,
            "generatedAt": chrono::Utc::now().to_rfc3339(),
            "provider": result.variation.provider,
            "ruleCount": result.rule_count(),
            "variation": result.variation.name,
        })
    }

    fn bundle_files(files: &[(String, String)]) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (path, content) in files {
            zip.start_file::<_, ()>(path.as_str(), FileOptions::default())?;
            zip.write_all(content.as_bytes())?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for OutputPipeline<S> {
    async fn collect(&self) -> Result<Vec<FolderDefinition>> {
        self.source.collect()
    }

    async fn render(&self, folders: Vec<FolderDefinition>) -> Result<RenderResult> {
        self.source.render(folders)
    }

    async fn emit(&self, result: RenderResult) -> Result<String> {
        let env = result.variation.name.clone();
        let files = Self::files(&result)?;

        if self.dry_run {
            for (path, _) in &files {
                tracing::info!("[dry-run] would write {}/{}", self.output_root, path);
            }
            return Ok(format!(
                "Dry run: {} files for '{}' not written",
                files.len(),
                env
            ));
        }

        tracing::debug!("Writing {} files for '{}'", files.len(), env);
        for (path, content) in &files {
            self.storage.write_file(path, content.as_bytes()).await?;
        }

        if self.bundle {
            let zip_data = Self::bundle_files(&files)?;
            tracing::debug!("Writing ZIP bundle ({} bytes)", zip_data.len());
            self.storage
                .write_file(&format!("{}.zip", env), &zip_data)
                .await?;
        }

        Ok(format!("{}/{}", self.output_root, env))
    }
}
