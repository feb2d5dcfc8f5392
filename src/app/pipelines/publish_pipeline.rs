use crate::adapters::grafana::GrafanaClient;
use crate::app::pipelines::ProjectSource;
use crate::core::{FolderDefinition, Pipeline, RenderResult};
use crate::domain::folder::Folder;
use crate::domain::ToJsonData;
use crate::utils::error::Result;
use std::collections::HashMap;

/// Uploads a rendered variation to Grafana.
pub struct PublishPipeline {
    source: ProjectSource,
    client: GrafanaClient,
    overwrite: bool,
    dry_run: bool,
}

impl PublishPipeline {
    pub fn new(source: ProjectSource, client: GrafanaClient) -> Self {
        Self {
            source,
            client,
            overwrite: true,
            dry_run: false,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    async fn folder_uid(
        &self,
        cache: &mut HashMap<String, String>,
        folder: &Folder,
    ) -> Result<String> {
        if let Some(uid) = cache.get(&folder.title) {
            return Ok(uid.clone());
        }
        let uid = self.client.ensure_folder(folder).await?;
        cache.insert(folder.title.clone(), uid.clone());
        Ok(uid)
    }
}

#[async_trait::async_trait]
impl Pipeline for PublishPipeline {
    async fn collect(&self) -> Result<Vec<FolderDefinition>> {
        self.source.collect()
    }

    async fn render(&self, folders: Vec<FolderDefinition>) -> Result<RenderResult> {
        self.source.render(folders)
    }

    async fn emit(&self, result: RenderResult) -> Result<String> {
        let env = &result.variation.name;
        let rule_count = result.rule_count();

        if self.dry_run {
            for rendered in &result.dashboards {
                tracing::info!(
                    "[dry-run] would publish dashboard '{}' into '{}'",
                    rendered.dashboard.title(),
                    rendered.folder.title
                );
            }
            return Ok(format!(
                "Dry run: {} dashboards and {} alert rules for '{}' not published",
                result.dashboards.len(),
                rule_count,
                env
            ));
        }

        let mut folders = HashMap::new();

        for rendered in &result.dashboards {
            let folder_uid = self.folder_uid(&mut folders, &rendered.folder).await?;
            self.client
                .upload_dashboard(
                    &rendered.dashboard.to_json_data(),
                    &folder_uid,
                    self.overwrite,
                )
                .await?;
            tracing::info!("Published dashboard '{}'", rendered.dashboard.title());
        }

        for rendered in &result.alerts {
            for group in &rendered.provisioning.groups {
                let folder = if group.folder == rendered.folder.title {
                    rendered.folder.clone()
                } else {
                    Folder::new(group.folder.clone())
                };
                let folder_uid = self.folder_uid(&mut folders, &folder).await?;
                for rule in &group.rules {
                    self.client
                        .upload_alert_rule(rule, &folder_uid, &group.name)
                        .await?;
                    tracing::debug!("Published alert rule '{}'", rule.title);
                }
            }
        }

        Ok(format!(
            "Published {} dashboards and {} alert rules for '{}' to {}",
            result.dashboards.len(),
            rule_count,
            env,
            self.client.base_url()
        ))
    }
}
