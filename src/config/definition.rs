use crate::config::project_config::substitute_vars;
use crate::domain::alert::{
    default_exec_err_state, default_no_data_state, AlertExpression, AlertGroup, AlertRule,
    AlertState, AlertTrigger, TimeRange,
};
use crate::domain::dashboard::DashboardMeta;
use crate::domain::folder::Folder;
use crate::domain::layout::{Row, Stack};
use crate::domain::target::Target;
use crate::utils::error::{GritError, Result};
use crate::utils::uid::create_uid_from_string;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const FOLDER_FILE: &str = "folder.toml";

/// Contents of one definition file inside a project folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionFile {
    #[serde(default)]
    pub dashboard: Option<DashboardDefinition>,
    #[serde(default)]
    pub alerting: Option<AlertingConfig>,
    #[serde(default)]
    pub alert_groups: Vec<AlertGroupDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardDefinition {
    #[serde(flatten)]
    pub meta: DashboardMeta,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl DashboardDefinition {
    pub fn stack(&self) -> Stack {
        Stack::new(self.rows.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertingKind {
    Prometheus,
    Cloudwatch,
    Elasticsearch,
}

fn default_true() -> bool {
    true
}

/// Per-dashboard alert rule builder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    pub kind: AlertingKind,
    #[serde(default)]
    pub evaluate_for: Option<String>,
    #[serde(default)]
    pub evaluate_interval: Option<String>,
    #[serde(default)]
    pub datasource: Option<String>,
    #[serde(default)]
    pub metric_namespace: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    /// Adds `__dashboardUid__`/`__panelId__` annotations to derived rules.
    #[serde(default = "default_true")]
    pub link_dashboard: bool,
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub auto_bucket_agg_ids: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertGroupDefinition {
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub evaluate_interval: Option<String>,
    #[serde(default)]
    pub rules: Vec<AlertRuleDefinition>,
}

impl AlertGroupDefinition {
    pub fn into_group(
        self,
        default_folder: &str,
        default_interval: &str,
        default_evaluate_for: &str,
    ) -> Result<AlertGroup> {
        let rules = self
            .rules
            .into_iter()
            .map(|rule| rule.into_rule(default_evaluate_for))
            .collect::<Result<Vec<_>>>()?;
        Ok(AlertGroup {
            name: self.name,
            folder: self.folder.unwrap_or_else(|| default_folder.to_string()),
            evaluate_interval: self
                .evaluate_interval
                .unwrap_or_else(|| default_interval.to_string()),
            rules,
        })
    }
}

fn default_rule_time_from() -> String {
    "5m".to_string()
}

fn default_rule_time_to() -> String {
    "now".to_string()
}

/// Alert rule spelled out query by query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRuleDefinition {
    #[serde(default)]
    pub uid: Option<String>,
    pub title: String,
    pub condition: String,
    #[serde(default)]
    pub evaluate_for: Option<String>,
    #[serde(default = "default_rule_time_from")]
    pub time_from: String,
    #[serde(default = "default_rule_time_to")]
    pub time_to: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub dashboard_uid: Option<String>,
    #[serde(default)]
    pub panel_id: Option<u32>,
    #[serde(default = "default_no_data_state")]
    pub no_data_state: AlertState,
    #[serde(default = "default_exec_err_state")]
    pub exec_err_state: AlertState,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default)]
    pub queries: Vec<Target>,
    #[serde(default)]
    pub expressions: Vec<AlertExpression>,
}

impl AlertRuleDefinition {
    pub fn into_rule(self, default_evaluate_for: &str) -> Result<AlertRule> {
        let mut ref_ids = HashSet::new();
        for ref_id in self
            .queries
            .iter()
            .map(Target::ref_id)
            .chain(self.expressions.iter().map(|e| e.ref_id.as_str()))
        {
            if !ref_ids.insert(ref_id.to_string()) {
                return Err(GritError::definition(
                    &self.title,
                    format!("refId '{}' is used more than once", ref_id),
                ));
            }
        }
        if !ref_ids.contains(&self.condition) {
            return Err(GritError::definition(
                &self.title,
                format!("condition '{}' does not name a query or expression", self.condition),
            ));
        }

        let (from, to) = TimeRange::new(&self.time_from, &self.time_to).relative_seconds()?;
        let triggers = self
            .queries
            .into_iter()
            .map(AlertTrigger::Query)
            .chain(self.expressions.into_iter().map(AlertTrigger::Expression))
            .collect();

        Ok(AlertRule {
            uid: self
                .uid
                .unwrap_or_else(|| create_uid_from_string(&self.title)),
            title: self.title,
            triggers,
            time_range_from: from,
            time_range_to: to,
            annotations: self.annotations,
            labels: self.labels,
            condition: self.condition,
            no_data_state: self.no_data_state,
            exec_err_state: self.exec_err_state,
            evaluate_for: self
                .evaluate_for
                .unwrap_or_else(|| default_evaluate_for.to_string()),
            dashboard_uid: self.dashboard_uid,
            panel_id: self.panel_id,
            is_paused: self.is_paused,
        })
    }
}

/// `folder.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderFile {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
}

impl FolderFile {
    pub fn into_folder(self, dir_name: &str) -> Folder {
        Folder {
            title: self.title.unwrap_or_else(|| dir_name.to_string()),
            uid: self.uid,
        }
    }
}

pub fn parse_definition(
    content: &str,
    vars: &BTreeMap<String, String>,
    source: &str,
) -> Result<DefinitionFile> {
    parse_with_vars(content, vars, source)
}

pub fn parse_folder_file(
    content: &str,
    vars: &BTreeMap<String, String>,
    source: &str,
) -> Result<FolderFile> {
    parse_with_vars(content, vars, source)
}

fn parse_with_vars<T: serde::de::DeserializeOwned>(
    content: &str,
    vars: &BTreeMap<String, String>,
    source: &str,
) -> Result<T> {
    let processed = substitute_vars(content, vars);
    toml::from_str(&processed).map_err(|e| GritError::ConfigParseError {
        path: source.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::panel::PanelKind;

    fn vars() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("env".to_string(), "prod".to_string()),
            ("cluster".to_string(), "eu-1".to_string()),
        ])
    }

    #[test]
    fn test_parse_dashboard_definition() {
        let content = r#"
[dashboard]
uid = "api-${env}"
title = "API (${cluster})"
tags = ["prometheus"]
data_source = "Prometheus"

[[dashboard.rows]]
height = 6
title = "Traffic"

[[dashboard.rows.panels]]
title = "Requests"
unit = "reqps"

[[dashboard.rows.panels.targets]]
kind = "prometheus"
expr = "sum(rate(http_requests_total{cluster=\"${cluster}\"}[5m]))"

[dashboard.rows.panels.alert]
threshold = { gt = 100 }
alert_msg = "Too many requests"

[alerting]
kind = "prometheus"
team = "platform"
"#;
        let file = parse_definition(content, &vars(), "api.toml").unwrap();
        let dashboard = file.dashboard.unwrap();
        assert_eq!(dashboard.meta.uid, "api-prod");
        assert_eq!(dashboard.meta.title, "API (eu-1)");
        assert_eq!(dashboard.meta.timezone, "utc");
        assert_eq!(dashboard.rows[0].height, 6);

        let panel = &dashboard.rows[0].panels[0];
        assert_eq!(panel.kind, PanelKind::TimeSeries);
        assert!(panel.alert.is_some());
        match &panel.targets[0] {
            Target::Prometheus(t) => assert!(t.expr.contains("cluster=\"eu-1\"")),
            other => panic!("unexpected target {:?}", other),
        }

        let alerting = file.alerting.unwrap();
        assert_eq!(alerting.kind, AlertingKind::Prometheus);
        assert!(alerting.link_dashboard);
    }

    #[test]
    fn test_explicit_alert_group() {
        let content = r#"
[[alert_groups]]
name = "TestGroup"
folder = "AWS"

[[alert_groups.rules]]
uid = "alertTestSerg"
title = "AWS EC2 | High CPU Utilization"
condition = "C"
evaluate_for = "1m"
labels = { severity = "critical" }
annotations = { summary = "High CPU Utilization on AWS EC2 instances" }

[[alert_groups.rules.queries]]
kind = "cloudwatch"
namespace = "AWS/EC2"
metric_name = "CPUUtilization"
statistics = ["Average"]
dimensions = { InstanceId = "*" }

[[alert_groups.rules.expressions]]
ref_id = "B"
type = "reduce"
expression = "A"
reduce_function = "mean"
reduce_mode = "strict"

[[alert_groups.rules.expressions]]
ref_id = "C"
type = "math"
expression = "$B > 90"
"#;
        let file = parse_definition(content, &vars(), "ec2.toml").unwrap();
        let group = file
            .alert_groups
            .into_iter()
            .next()
            .unwrap()
            .into_group("Infra", "1m", "5m")
            .unwrap();
        assert_eq!(group.folder, "AWS");
        assert_eq!(group.evaluate_interval, "1m");

        let rule = &group.rules[0];
        assert_eq!(rule.uid, "alertTestSerg");
        assert_eq!(rule.evaluate_for, "1m");
        assert_eq!(rule.time_range_from, 300);
        assert_eq!(rule.triggers.len(), 3);
        assert!(matches!(rule.triggers[0], AlertTrigger::Query(_)));
    }

    #[test]
    fn test_rule_condition_must_exist() {
        let rule = AlertRuleDefinition {
            uid: None,
            title: "broken".to_string(),
            condition: "Z".to_string(),
            evaluate_for: None,
            time_from: default_rule_time_from(),
            time_to: default_rule_time_to(),
            annotations: BTreeMap::new(),
            labels: BTreeMap::new(),
            dashboard_uid: None,
            panel_id: None,
            no_data_state: default_no_data_state(),
            exec_err_state: default_exec_err_state(),
            is_paused: false,
            queries: vec![],
            expressions: vec![AlertExpression::math("A", "1 > 0")],
        };
        assert!(rule.clone().into_rule("5m").is_err());

        let mut fixed = rule;
        fixed.condition = "A".to_string();
        let built = fixed.into_rule("5m").unwrap();
        assert_eq!(built.uid, create_uid_from_string("broken"));
        assert_eq!(built.evaluate_for, "5m");
    }

    #[test]
    fn test_folder_file_defaults_to_dir_name() {
        let folder = parse_folder_file("", &vars(), "folder.toml")
            .unwrap()
            .into_folder("infra");
        assert_eq!(folder, Folder::new("infra"));

        let folder = parse_folder_file("title = \"Infra ${env}\"", &vars(), "folder.toml")
            .unwrap()
            .into_folder("infra");
        assert_eq!(folder.title, "Infra prod");
    }
}
