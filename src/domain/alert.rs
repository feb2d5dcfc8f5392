use crate::domain::target::{BucketAgg, MetricAgg, Target};
use crate::domain::ToJsonData;
use crate::utils::error::{GritError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const ALERT_CONDITION_REF: &str = "ALERT_CONDITION";
pub const REDUCE_EXPRESSION_REF: &str = "REDUCE_EXPRESSION";
pub const QUERY_REF: &str = "QUERY";
const EXPRESSION_DATASOURCE: &str = "__expr__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionType {
    Reduce,
    Math,
    Resample,
    ClassicConditions,
    Threshold,
}

impl ExpressionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpressionType::Reduce => "reduce",
            ExpressionType::Math => "math",
            ExpressionType::Resample => "resample",
            ExpressionType::ClassicConditions => "classic_conditions",
            ExpressionType::Threshold => "threshold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReduceFunction {
    #[default]
    Last,
    Mean,
    Min,
    Max,
    Sum,
    Count,
}

impl ReduceFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReduceFunction::Last => "last",
            ReduceFunction::Mean => "mean",
            ReduceFunction::Min => "min",
            ReduceFunction::Max => "max",
            ReduceFunction::Sum => "sum",
            ReduceFunction::Count => "count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReduceMode {
    #[default]
    #[serde(rename = "strict")]
    Strict,
    #[serde(rename = "dropNN")]
    DropNonNumbers,
    #[serde(rename = "replaceNN")]
    ReplaceNonNumbers,
}

impl ReduceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReduceMode::Strict => "strict",
            ReduceMode::DropNonNumbers => "dropNN",
            ReduceMode::ReplaceNonNumbers => "replaceNN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertState {
    Alerting,
    NoData,
    #[serde(rename = "OK")]
    Ok,
    Error,
    KeepLast,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Alerting => "Alerting",
            AlertState::NoData => "NoData",
            AlertState::Ok => "OK",
            AlertState::Error => "Error",
            AlertState::KeepLast => "KeepLast",
        }
    }
}

pub fn default_no_data_state() -> AlertState {
    AlertState::KeepLast
}

pub fn default_exec_err_state() -> AlertState {
    AlertState::Alerting
}

/// Converts a Grafana relative time ("now", "5m", "now-1h") to seconds.
///
/// Units other than m/h/d/w yield 0; a non-numeric amount is an error.
pub fn convert_time_range_to_seconds(value: &str) -> Result<u64> {
    if value == "now" {
        return Ok(0);
    }
    let body = value.strip_prefix("now-").unwrap_or(value);
    let Some(unit) = body.chars().last() else {
        return Err(GritError::TimeRangeError {
            value: value.to_string(),
            reason: "empty time range".to_string(),
        });
    };
    let factor = match unit {
        'm' => 60,
        'h' => 3600,
        'd' => 86400,
        'w' => 604800,
        _ => return Ok(0),
    };
    let amount = &body[..body.len() - unit.len_utf8()];
    let amount: u64 = amount.parse().map_err(|_| GritError::TimeRangeError {
        value: value.to_string(),
        reason: format!("'{}' is not a whole number", amount),
    })?;
    amount
        .checked_mul(factor)
        .ok_or_else(|| GritError::TimeRangeError {
            value: value.to_string(),
            reason: "time range is too large".to_string(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

impl TimeRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn relative_seconds(&self) -> Result<(u64, u64)> {
        Ok((
            convert_time_range_to_seconds(&self.from)?,
            convert_time_range_to_seconds(&self.to)?,
        ))
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::new("5m", "now")
    }
}

/// Condition applied to the reduced value of an alert query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Threshold {
    #[serde(rename = "gt")]
    GreaterThan(f64),
    #[serde(rename = "lt")]
    LessThan(f64),
    #[serde(rename = "within_range")]
    WithinRange(f64, f64),
    #[serde(rename = "outside_range")]
    OutsideRange(f64, f64),
}

impl Threshold {
    /// Math expression over `$var`.
    pub fn expression(&self, var: &str) -> String {
        match self {
            Threshold::GreaterThan(v) => format!("${} > {}", var, v),
            Threshold::LessThan(v) => format!("${} < {}", var, v),
            Threshold::WithinRange(lo, hi) => format!("(${v} > {}) && (${v} < {})", lo, hi, v = var),
            Threshold::OutsideRange(lo, hi) => {
                format!("(${v} < {}) || (${v} > {})", lo, hi, v = var)
            }
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::GreaterThan(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertExpression {
    pub ref_id: String,
    #[serde(rename = "type")]
    pub expression_type: ExpressionType,
    pub expression: String,
    #[serde(default)]
    pub reduce_function: ReduceFunction,
    #[serde(default)]
    pub reduce_mode: ReduceMode,
}

impl AlertExpression {
    pub fn reduce(
        ref_id: impl Into<String>,
        expression: impl Into<String>,
        function: ReduceFunction,
        mode: ReduceMode,
    ) -> Self {
        Self {
            ref_id: ref_id.into(),
            expression_type: ExpressionType::Reduce,
            expression: expression.into(),
            reduce_function: function,
            reduce_mode: mode,
        }
    }

    pub fn math(ref_id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            expression_type: ExpressionType::Math,
            expression: expression.into(),
            reduce_function: ReduceFunction::default(),
            reduce_mode: ReduceMode::default(),
        }
    }
}

impl ToJsonData for AlertExpression {
    fn to_json_data(&self) -> Value {
        json!({
            "datasourceUid": EXPRESSION_DATASOURCE,
            "model": {
                "datasource": { "type": EXPRESSION_DATASOURCE, "uid": EXPRESSION_DATASOURCE },
                "expression": self.expression,
                "hide": false,
                "intervalMs": 1000,
                "maxDataPoints": 43200,
                "reducer": self.reduce_function.as_str(),
                "refId": self.ref_id,
                "settings": { "mode": self.reduce_mode.as_str() },
                "type": self.expression_type.as_str(),
            },
            "queryType": "",
            "refId": self.ref_id,
            "relativeTimeRange": { "from": 0, "to": 0 },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertTrigger {
    Query(Target),
    Expression(AlertExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRule {
    pub uid: String,
    pub title: String,
    pub triggers: Vec<AlertTrigger>,
    pub time_range_from: u64,
    pub time_range_to: u64,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub condition: String,
    pub no_data_state: AlertState,
    pub exec_err_state: AlertState,
    pub evaluate_for: String,
    pub dashboard_uid: Option<String>,
    pub panel_id: Option<u32>,
    pub is_paused: bool,
}

impl ToJsonData for AlertRule {
    fn to_json_data(&self) -> Value {
        let data: Vec<Value> = self
            .triggers
            .iter()
            .map(|trigger| match trigger {
                AlertTrigger::Query(target) => json!({
                    "datasourceUid": target.datasource(),
                    "model": target.to_json_data(),
                    "refId": target.ref_id(),
                    "relativeTimeRange": {
                        "from": self.time_range_from,
                        "to": self.time_range_to,
                    },
                }),
                AlertTrigger::Expression(expression) => expression.to_json_data(),
            })
            .collect();

        let mut rule = json!({
            "annotations": self.annotations,
            "condition": self.condition,
            "data": data,
            "execErrState": self.exec_err_state.as_str(),
            "for": self.evaluate_for,
            "isPaused": self.is_paused,
            "labels": self.labels,
            "noDataState": self.no_data_state.as_str(),
            "title": self.title,
            "uid": self.uid,
        });
        if let Some(dashboard_uid) = &self.dashboard_uid {
            rule["dashboardUid"] = json!(dashboard_uid);
        }
        if let Some(panel_id) = self.panel_id {
            rule["panelId"] = json!(panel_id);
        }
        rule
    }
}

pub fn default_alert_folder() -> String {
    "alert".to_string()
}

pub fn default_evaluate_interval() -> String {
    "1m".to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertGroup {
    pub name: String,
    pub folder: String,
    pub evaluate_interval: String,
    pub rules: Vec<AlertRule>,
}

impl AlertGroup {
    pub fn new(name: impl Into<String>, rules: Vec<AlertRule>) -> Self {
        Self {
            name: name.into(),
            folder: default_alert_folder(),
            evaluate_interval: default_evaluate_interval(),
            rules,
        }
    }
}

impl ToJsonData for AlertGroup {
    fn to_json_data(&self) -> Value {
        json!({
            "folder": self.folder,
            "interval": self.evaluate_interval,
            "name": self.name,
            "orgId": 1,
            "rules": self.rules.iter().map(ToJsonData::to_json_data).collect::<Vec<_>>(),
        })
    }
}

/// Content of one Grafana alerting provisioning file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlertFileBasedProvisioning {
    pub groups: Vec<AlertGroup>,
}

impl AlertFileBasedProvisioning {
    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.rules.len()).sum()
    }
}

impl ToJsonData for AlertFileBasedProvisioning {
    fn to_json_data(&self) -> Value {
        json!({
            "apiVersion": 1,
            "groups": self.groups.iter().map(ToJsonData::to_json_data).collect::<Vec<_>>(),
        })
    }
}

fn default_alert_msg() -> String {
    "NOT_IMPLEMENTED".to_string()
}

fn default_alert_time_from() -> String {
    "1h".to_string()
}

fn default_alert_time_shift() -> String {
    "now".to_string()
}

/// Alert requested on a dashboard panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelAlert {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub threshold: Threshold,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default = "default_alert_msg")]
    pub alert_msg: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub reduce_function: ReduceFunction,
    #[serde(default = "default_alert_time_from")]
    pub time_from: String,
    #[serde(default = "default_alert_time_shift")]
    pub time_shift: String,
    #[serde(default)]
    pub bucket_aggs: Vec<BucketAgg>,
    #[serde(default)]
    pub metric_aggs: Vec<MetricAgg>,
    #[serde(default = "default_no_data_state")]
    pub no_data_state: AlertState,
    #[serde(default = "default_exec_err_state")]
    pub exec_err_state: AlertState,
}

impl Default for PanelAlert {
    fn default() -> Self {
        Self {
            title: None,
            threshold: Threshold::default(),
            labels: BTreeMap::new(),
            alert_msg: default_alert_msg(),
            team: None,
            reduce_function: ReduceFunction::default(),
            time_from: default_alert_time_from(),
            time_shift: default_alert_time_shift(),
            bucket_aggs: Vec::new(),
            metric_aggs: Vec::new(),
            no_data_state: default_no_data_state(),
            exec_err_state: default_exec_err_state(),
        }
    }
}
