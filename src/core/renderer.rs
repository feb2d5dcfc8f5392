use crate::config::definition::{AlertingConfig, DashboardDefinition};
use crate::config::project_config::AlertingDefaults;
use crate::core::alert_builder::{builder_for, BuilderContext};
use crate::domain::alert::{AlertFileBasedProvisioning, AlertGroup};
use crate::domain::dashboard::Dashboard;
use crate::domain::folder::Folder;
use crate::domain::layout::PlacedPanel;
use crate::domain::model::{FolderDefinition, RenderResult, RenderedAlerts, RenderedDashboard};
use crate::domain::variation::Variation;
use crate::utils::error::{GritError, Result};
use std::collections::{HashMap, HashSet};

/// Turns parsed folders into dashboards and alert provisioning for one
/// variation.
pub fn render(
    variation: &Variation,
    defaults: &AlertingDefaults,
    folders: Vec<FolderDefinition>,
) -> Result<RenderResult> {
    let mut dashboards = Vec::new();
    let mut alerts = Vec::new();
    let mut dashboard_sources: HashMap<String, String> = HashMap::new();
    let mut alert_sources: HashMap<String, String> = HashMap::new();

    for folder_def in folders {
        for file in folder_def.files {
            let definition = file.definition;

            if let Some(dashboard_def) = definition.dashboard {
                let uid = dashboard_def.meta.uid.clone();
                if let Some(previous) = dashboard_sources.insert(uid.clone(), file.source.clone()) {
                    return Err(GritError::definition(
                        &file.source,
                        format!("dashboard uid '{}' is already used by {}", uid, previous),
                    ));
                }

                let (dashboard, provisioning) = render_dashboard(
                    variation,
                    defaults,
                    &folder_def.folder,
                    dashboard_def,
                    definition.alerting.as_ref(),
                    &file.source,
                )?;
                tracing::debug!(
                    "Rendered dashboard '{}' ({} panels) from {}",
                    dashboard.title(),
                    dashboard.panels.len(),
                    file.source
                );
                if let Some(provisioning) = provisioning {
                    claim_alert_file(&mut alert_sources, dashboard.uid(), &file.source)?;
                    alerts.push(RenderedAlerts {
                        uid: dashboard.uid().to_string(),
                        folder: folder_def.folder.clone(),
                        provisioning,
                    });
                }
                dashboards.push(RenderedDashboard {
                    folder_dir: folder_def.dir_name.clone(),
                    folder: folder_def.folder.clone(),
                    dashboard,
                });
            } else if definition.alerting.is_some() {
                tracing::warn!(
                    "{} has an [alerting] section but no dashboard, ignoring it",
                    file.source
                );
            }

            if !definition.alert_groups.is_empty() {
                let groups = definition
                    .alert_groups
                    .into_iter()
                    .map(|group| {
                        group.into_group(
                            &folder_def.folder.title,
                            &defaults.evaluate_interval,
                            &defaults.evaluate_for,
                        )
                    })
                    .collect::<Result<Vec<AlertGroup>>>()?;
                claim_alert_file(&mut alert_sources, &file.name, &file.source)?;
                alerts.push(RenderedAlerts {
                    uid: file.name.clone(),
                    folder: folder_def.folder.clone(),
                    provisioning: AlertFileBasedProvisioning { groups },
                });
            }
        }
    }

    warn_on_duplicate_rule_uids(&alerts);

    Ok(RenderResult {
        variation: variation.clone(),
        dashboards,
        alerts,
    })
}

/// Alert files are keyed by name alone, so two sources may not share one.
fn claim_alert_file(
    claimed: &mut HashMap<String, String>,
    uid: &str,
    source: &str,
) -> Result<()> {
    if let Some(previous) = claimed.insert(uid.to_string(), source.to_string()) {
        return Err(GritError::definition(
            source,
            format!(
                "alert file '{}' is already produced by {}; rename one of the files",
                uid, previous
            ),
        ));
    }
    Ok(())
}

fn render_dashboard(
    variation: &Variation,
    defaults: &AlertingDefaults,
    folder: &Folder,
    definition: DashboardDefinition,
    alerting: Option<&AlertingConfig>,
    source: &str,
) -> Result<(Dashboard, Option<AlertFileBasedProvisioning>)> {
    let stack = definition.stack();
    let dashboard = Dashboard::compose(definition.meta, &stack)?;

    let alerted: Vec<_> = dashboard
        .panels
        .iter()
        .filter_map(|placed| match placed {
            PlacedPanel::Panel { id, panel, .. } => panel.alert.as_ref().map(|a| (*id, panel, a)),
            PlacedPanel::RowHeader { .. } => None,
        })
        .collect();

    let Some(alerting) = alerting else {
        if let Some((_, panel, _)) = alerted.first() {
            return Err(GritError::definition(
                source,
                format!(
                    "panel '{}' declares an alert but the file has no [alerting] section",
                    panel.title
                ),
            ));
        }
        return Ok((dashboard, None));
    };

    let mut ctx = BuilderContext::new(
        variation.clone(),
        alerting
            .evaluate_for
            .clone()
            .unwrap_or_else(|| defaults.evaluate_for.clone()),
    );
    if alerting.link_dashboard {
        ctx.dashboard_uid = Some(dashboard.uid().to_string());
    }
    ctx.datasource = alerting.datasource.clone();
    ctx.team = alerting.team.clone();
    ctx.labels = alerting.labels.clone();

    let mut builder = builder_for(ctx, alerting);
    for (panel_id, panel, alert) in alerted {
        builder.register_panel(panel_id, panel, alert)?;
    }
    let rules = builder.build()?;
    tracing::debug!(
        "Built {} of {} alert rules for '{}' in environment '{}'",
        rules.len(),
        builder.pending(),
        dashboard.title(),
        builder.context().environment.name
    );
    if rules.is_empty() {
        return Ok((dashboard, None));
    }

    let group = AlertGroup {
        name: alerting
            .group
            .clone()
            .unwrap_or_else(|| dashboard.title().to_string()),
        folder: alerting.folder.clone().unwrap_or_else(|| folder.title.clone()),
        evaluate_interval: alerting
            .evaluate_interval
            .clone()
            .unwrap_or_else(|| defaults.evaluate_interval.clone()),
        rules,
    };
    Ok((
        dashboard,
        Some(AlertFileBasedProvisioning {
            groups: vec![group],
        }),
    ))
}

fn warn_on_duplicate_rule_uids(alerts: &[RenderedAlerts]) {
    let mut seen = HashSet::new();
    for rule in alerts
        .iter()
        .flat_map(|a| a.provisioning.groups.iter())
        .flat_map(|g| g.rules.iter())
    {
        if !seen.insert(rule.uid.as_str()) {
            tracing::warn!(
                "Alert rule uid {} ('{}') is generated more than once",
                rule.uid,
                rule.title
            );
        }
    }
}
