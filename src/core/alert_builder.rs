//! Alert rule builders.
//!
//! A builder collects rule registrations for one dashboard, either
//! registered directly or derived from panels carrying a [`PanelAlert`],
//! and turns them into Grafana alert rules. Every rule ends in an
//! `ALERT_CONDITION` math expression over reduced query results.

use crate::config::definition::{AlertingConfig, AlertingKind};
use crate::domain::alert::{
    default_exec_err_state, default_no_data_state, AlertExpression, AlertRule, AlertState,
    AlertTrigger, PanelAlert, ReduceFunction, ReduceMode, TimeRange, ALERT_CONDITION_REF,
    QUERY_REF, REDUCE_EXPRESSION_REF,
};
use crate::domain::panel::Panel;
use crate::domain::target::{
    BucketAgg, CloudwatchTarget, ElasticsearchTarget, MetricAgg, PrometheusTarget, Target,
};
use crate::domain::variation::Variation;
use crate::utils::error::{GritError, Result};
use crate::utils::uid::create_uid_from_string;
use std::collections::BTreeMap;

const DEFAULT_PROMETHEUS_DATASOURCE: &str = "prometheus";
const DEFAULT_CLOUDWATCH_DATASOURCE: &str = "cloudwatch";
const DEFAULT_ELASTICSEARCH_DATASOURCE: &str = "elasticsearch";
const DEFAULT_INTERVAL_MS: u64 = 1000;

const ELASTICSEARCH_STATUS_TEMPLATE: &str = "{{- with $values -}}{{- $lastValue := \"\" -}}{{- $lastInstance := \"\" -}}{{- range $k, $v := . -}}{{- $lastValue = $v -}}{{- $lastInstance = $v.Labels -}}{{- end -}}\nInstance: {{ $lastInstance }} | Value:   {{ $lastValue }}{{- end -}}";

/// State shared by every builder kind.
#[derive(Debug, Clone)]
pub struct BuilderContext {
    pub environment: Variation,
    pub evaluate_for: String,
    pub dashboard_uid: Option<String>,
    pub datasource: Option<String>,
    pub team: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl BuilderContext {
    pub fn new(environment: Variation, evaluate_for: impl Into<String>) -> Self {
        Self {
            environment,
            evaluate_for: evaluate_for.into(),
            dashboard_uid: None,
            datasource: None,
            team: None,
            labels: BTreeMap::new(),
        }
    }

    pub fn with_dashboard_uid(mut self, uid: impl Into<String>) -> Self {
        self.dashboard_uid = Some(uid.into());
        self
    }

    pub fn with_datasource(mut self, datasource: impl Into<String>) -> Self {
        self.datasource = Some(datasource.into());
        self
    }

    fn annotations(&self, summary: &str, panel_id: Option<u32>) -> BTreeMap<String, String> {
        let mut annotations = BTreeMap::new();
        annotations.insert("summary".to_string(), summary.to_string());
        if let Some(dashboard_uid) = &self.dashboard_uid {
            annotations.insert("__dashboardUid__".to_string(), dashboard_uid.clone());
            if let Some(panel_id) = panel_id {
                annotations.insert("__panelId__".to_string(), panel_id.to_string());
            }
        }
        annotations
    }

    fn assemble(&self, common: &RuleCommon, triggers: Vec<AlertTrigger>) -> Result<AlertRule> {
        let (from, to) = common.time_range.relative_seconds()?;
        Ok(AlertRule {
            uid: create_uid_from_string(&common.title),
            title: common.title.clone(),
            triggers,
            time_range_from: from,
            time_range_to: to,
            annotations: common.annotations.clone(),
            labels: common.labels.clone(),
            condition: ALERT_CONDITION_REF.to_string(),
            no_data_state: common.no_data_state,
            exec_err_state: common.exec_err_state,
            evaluate_for: self.evaluate_for.clone(),
            dashboard_uid: self.dashboard_uid.clone(),
            panel_id: common.panel_id,
            is_paused: false,
        })
    }

    /// Title, expression and time range of a rule derived from a panel.
    fn derive(&self, panel_id: u32, panel: &Panel, alert: &PanelAlert) -> DerivedAlert {
        let base = alert.title.clone().unwrap_or_else(|| panel.title.clone());
        let mut title = format!("[{}]", self.environment.name).to_uppercase() + " " + &base;
        if let Some(team) = alert.team.as_ref().or(self.team.as_ref()) {
            if !team.is_empty() {
                title.push_str(" | ");
                title.push_str(team);
            }
        }

        // Panel-level time settings take precedence over the alert's own.
        let time_from = panel.time_from.clone().unwrap_or_else(|| alert.time_from.clone());
        let time_shift = panel
            .time_shift
            .clone()
            .unwrap_or_else(|| alert.time_shift.clone());

        let mut labels = self.labels.clone();
        labels.extend(alert.labels.clone());

        DerivedAlert {
            title,
            alert_expression: alert.threshold.expression(REDUCE_EXPRESSION_REF),
            time_range: TimeRange::new(time_from, time_shift),
            labels,
            panel_id,
        }
    }
}

struct DerivedAlert {
    title: String,
    alert_expression: String,
    time_range: TimeRange,
    labels: BTreeMap<String, String>,
    panel_id: u32,
}

#[derive(Debug, Clone)]
struct RuleCommon {
    title: String,
    reduce_function: ReduceFunction,
    alert_expression: String,
    time_range: TimeRange,
    annotations: BTreeMap<String, String>,
    labels: BTreeMap<String, String>,
    panel_id: Option<u32>,
    no_data_state: AlertState,
    exec_err_state: AlertState,
}

/// One metric or several, each with its own refId.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleMetric<M> {
    Single(M),
    Multiple(Vec<M>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleRegistration<M> {
    pub title: String,
    pub metric: RuleMetric<M>,
    pub reduce_function: ReduceFunction,
    pub alert_expression: String,
    pub alert_msg: String,
    pub labels: BTreeMap<String, String>,
    pub panel_id: Option<u32>,
    pub time_range: TimeRange,
    pub no_data_state: AlertState,
    pub exec_err_state: AlertState,
}

impl<M> RuleRegistration<M> {
    pub fn new(
        title: impl Into<String>,
        metric: RuleMetric<M>,
        alert_expression: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            metric,
            reduce_function: ReduceFunction::Last,
            alert_expression: alert_expression.into(),
            alert_msg: String::new(),
            labels: BTreeMap::new(),
            panel_id: None,
            time_range: TimeRange::default(),
            no_data_state: default_no_data_state(),
            exec_err_state: default_exec_err_state(),
        }
    }

    fn split(self, ctx: &BuilderContext) -> (RuleCommon, RuleMetric<M>) {
        let common = RuleCommon {
            annotations: ctx.annotations(&self.alert_msg, self.panel_id),
            title: self.title,
            reduce_function: self.reduce_function,
            alert_expression: self.alert_expression,
            time_range: self.time_range,
            labels: self.labels,
            panel_id: self.panel_id,
            no_data_state: self.no_data_state,
            exec_err_state: self.exec_err_state,
        };
        (common, self.metric)
    }
}

fn reduce_of(ref_id: &str, query_ref: &str, function: ReduceFunction) -> AlertTrigger {
    AlertTrigger::Expression(AlertExpression::reduce(
        ref_id,
        query_ref,
        function,
        ReduceMode::DropNonNumbers,
    ))
}

fn condition_of(expression: &str) -> AlertTrigger {
    AlertTrigger::Expression(AlertExpression::math(ALERT_CONDITION_REF, expression))
}

/// QUERY, REDUCE_EXPRESSION, ALERT_CONDITION for a single metric;
/// `<ref>-QUERY` and `<ref>` per metric plus one ALERT_CONDITION otherwise.
fn triggers_for<M>(
    common: &RuleCommon,
    metric: &RuleMetric<M>,
    query: impl Fn(&M, String) -> Target,
    ref_of: impl Fn(&M) -> &str,
) -> Vec<AlertTrigger> {
    let mut triggers = Vec::new();
    match metric {
        RuleMetric::Single(m) => {
            triggers.push(AlertTrigger::Query(query(m, QUERY_REF.to_string())));
            triggers.push(reduce_of(
                REDUCE_EXPRESSION_REF,
                QUERY_REF,
                common.reduce_function,
            ));
        }
        RuleMetric::Multiple(metrics) => {
            for m in metrics {
                let ref_id = ref_of(m);
                let query_ref = format!("{}-QUERY", ref_id);
                triggers.push(AlertTrigger::Query(query(m, query_ref.clone())));
                triggers.push(reduce_of(ref_id, &query_ref, common.reduce_function));
            }
        }
    }
    triggers.push(condition_of(&common.alert_expression));
    triggers
}

fn mismatched_target(kind: &str, panel: &Panel) -> GritError {
    let found = panel
        .first_target()
        .map(Target::kind)
        .unwrap_or("no target");
    GritError::definition(
        &panel.title,
        format!("{} alert needs a {} target first, found {}", kind, kind, found),
    )
}

pub trait AlertRuleBuilder: Send + Sync {
    fn context(&self) -> &BuilderContext;

    /// Registers a rule derived from a placed panel and its alert request.
    fn register_panel(&mut self, panel_id: u32, panel: &Panel, alert: &PanelAlert) -> Result<()>;

    fn build(&self) -> Result<Vec<AlertRule>>;

    fn pending(&self) -> usize;
}

pub fn build_all(builders: &[&dyn AlertRuleBuilder]) -> Result<Vec<AlertRule>> {
    let mut rules = Vec::new();
    for builder in builders {
        rules.extend(builder.build()?);
    }
    Ok(rules)
}

/// Builder selected by a dashboard's `[alerting]` section.
pub fn builder_for(ctx: BuilderContext, config: &AlertingConfig) -> Box<dyn AlertRuleBuilder> {
    match config.kind {
        AlertingKind::Prometheus => Box::new(PrometheusAlertRuleBuilder::new(ctx)),
        AlertingKind::Cloudwatch => Box::new(CloudwatchAlertRuleBuilder::new(
            ctx,
            config.metric_namespace.clone().unwrap_or_default(),
        )),
        AlertingKind::Elasticsearch => {
            let mut builder = ElasticsearchAlertRuleBuilder::new(ctx);
            builder.interval_ms = config.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS);
            builder.auto_bucket_agg_ids = config.auto_bucket_agg_ids;
            Box::new(builder)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrometheusMetric {
    pub ref_id: String,
    pub expr: String,
    pub legend_format: String,
    pub datasource: Option<String>,
}

pub struct PrometheusAlertRuleBuilder {
    ctx: BuilderContext,
    rules: Vec<(RuleCommon, RuleMetric<PrometheusMetric>)>,
}

impl PrometheusAlertRuleBuilder {
    pub fn new(ctx: BuilderContext) -> Self {
        Self {
            ctx,
            rules: Vec::new(),
        }
    }

    pub fn register(&mut self, registration: RuleRegistration<PrometheusMetric>) {
        self.rules.push(registration.split(&self.ctx));
    }
}

impl AlertRuleBuilder for PrometheusAlertRuleBuilder {
    fn context(&self) -> &BuilderContext {
        &self.ctx
    }

    fn register_panel(&mut self, panel_id: u32, panel: &Panel, alert: &PanelAlert) -> Result<()> {
        let Some(Target::Prometheus(target)) = panel.first_target() else {
            return Err(mismatched_target("prometheus", panel));
        };
        let derived = self.ctx.derive(panel_id, panel, alert);
        let metric = PrometheusMetric {
            ref_id: target.ref_id.clone(),
            expr: target.expr.clone(),
            legend_format: target.legend_format.clone(),
            datasource: target.datasource.clone(),
        };
        self.register(derived.into_registration(RuleMetric::Single(metric), alert));
        Ok(())
    }

    fn build(&self) -> Result<Vec<AlertRule>> {
        let fallback = self.ctx.datasource.clone();
        self.rules
            .iter()
            .map(|(common, metric)| {
                let triggers = triggers_for(
                    common,
                    metric,
                    |m, ref_id| {
                        let datasource = fallback
                            .clone()
                            .or_else(|| m.datasource.clone())
                            .unwrap_or_else(|| DEFAULT_PROMETHEUS_DATASOURCE.to_string());
                        Target::Prometheus(PrometheusTarget {
                            ref_id,
                            expr: m.expr.clone(),
                            legend_format: m.legend_format.clone(),
                            datasource: Some(datasource),
                            instant: false,
                            interval: None,
                        })
                    },
                    |m| m.ref_id.as_str(),
                );
                self.ctx.assemble(common, triggers)
            })
            .collect()
    }

    fn pending(&self) -> usize {
        self.rules.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloudwatchMetric {
    pub ref_id: String,
    pub namespace: Option<String>,
    pub name: String,
    pub statistics: Vec<String>,
    pub dimensions: BTreeMap<String, String>,
    pub match_exact: bool,
    pub region: String,
}

pub struct CloudwatchAlertRuleBuilder {
    ctx: BuilderContext,
    metric_namespace: String,
    rules: Vec<(RuleCommon, RuleMetric<CloudwatchMetric>)>,
}

impl CloudwatchAlertRuleBuilder {
    pub fn new(ctx: BuilderContext, metric_namespace: impl Into<String>) -> Self {
        Self {
            ctx,
            metric_namespace: metric_namespace.into(),
            rules: Vec::new(),
        }
    }

    pub fn register(&mut self, registration: RuleRegistration<CloudwatchMetric>) {
        self.rules.push(registration.split(&self.ctx));
    }
}

impl AlertRuleBuilder for CloudwatchAlertRuleBuilder {
    fn context(&self) -> &BuilderContext {
        &self.ctx
    }

    fn register_panel(&mut self, panel_id: u32, panel: &Panel, alert: &PanelAlert) -> Result<()> {
        let Some(Target::Cloudwatch(target)) = panel.first_target() else {
            return Err(mismatched_target("cloudwatch", panel));
        };
        let derived = self.ctx.derive(panel_id, panel, alert);
        let metric = CloudwatchMetric {
            ref_id: target.ref_id.clone(),
            namespace: target.namespace.clone(),
            name: target.metric_name.clone(),
            statistics: target.statistics.clone(),
            dimensions: target.dimensions.clone(),
            match_exact: target.match_exact,
            region: target.region.clone(),
        };
        self.register(derived.into_registration(RuleMetric::Single(metric), alert));
        Ok(())
    }

    /// Rules are only produced for environments hosted on AWS.
    fn build(&self) -> Result<Vec<AlertRule>> {
        if !self.ctx.environment.provider.contains("aws") {
            tracing::debug!(
                "Skipping {} CloudWatch rules for provider '{}'",
                self.rules.len(),
                self.ctx.environment.provider
            );
            return Ok(Vec::new());
        }

        let datasource = self
            .ctx
            .datasource
            .clone()
            .unwrap_or_else(|| DEFAULT_CLOUDWATCH_DATASOURCE.to_string());
        self.rules
            .iter()
            .map(|(common, metric)| {
                let triggers = triggers_for(
                    common,
                    metric,
                    |m, ref_id| {
                        Target::Cloudwatch(CloudwatchTarget {
                            ref_id,
                            namespace: Some(
                                m.namespace
                                    .clone()
                                    .unwrap_or_else(|| self.metric_namespace.clone()),
                            ),
                            metric_name: m.name.clone(),
                            statistics: m.statistics.clone(),
                            dimensions: m.dimensions.clone(),
                            region: m.region.clone(),
                            match_exact: m.match_exact,
                            period: None,
                            datasource: Some(datasource.clone()),
                        })
                    },
                    |m| m.ref_id.as_str(),
                );
                self.ctx.assemble(common, triggers)
            })
            .collect()
    }

    fn pending(&self) -> usize {
        self.rules.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElasticsearchRegistration {
    pub title: String,
    pub query: String,
    pub bucket_aggs: Vec<BucketAgg>,
    pub metric_aggs: Vec<MetricAgg>,
    pub interval_ms: u64,
    pub datasource: String,
    pub reduce_function: ReduceFunction,
    pub alert_expression: String,
    pub alert_msg: String,
    pub labels: BTreeMap<String, String>,
    pub panel_id: Option<u32>,
    pub apply_auto_bucket_agg_ids: bool,
    pub time_range: TimeRange,
    pub no_data_state: AlertState,
    pub exec_err_state: AlertState,
}

struct ElasticsearchRule {
    common: RuleCommon,
    target: ElasticsearchTarget,
    apply_auto_bucket_agg_ids: bool,
}

pub struct ElasticsearchAlertRuleBuilder {
    ctx: BuilderContext,
    interval_ms: u64,
    auto_bucket_agg_ids: bool,
    rules: Vec<ElasticsearchRule>,
}

impl ElasticsearchAlertRuleBuilder {
    pub fn new(ctx: BuilderContext) -> Self {
        Self {
            ctx,
            interval_ms: DEFAULT_INTERVAL_MS,
            auto_bucket_agg_ids: false,
            rules: Vec::new(),
        }
    }

    pub fn register(&mut self, registration: ElasticsearchRegistration) {
        let mut annotations = self
            .ctx
            .annotations(&registration.alert_msg, registration.panel_id);
        annotations.insert(
            "status".to_string(),
            ELASTICSEARCH_STATUS_TEMPLATE.to_string(),
        );

        let metric_aggs = if registration.metric_aggs.is_empty() {
            vec![MetricAgg::count()]
        } else {
            registration.metric_aggs
        };
        let mut target = ElasticsearchTarget::new(registration.query);
        target.ref_id = QUERY_REF.to_string();
        target.bucket_aggs = registration.bucket_aggs;
        target.metric_aggs = metric_aggs;
        target.interval_ms = Some(registration.interval_ms);
        target.datasource = Some(registration.datasource);

        self.rules.push(ElasticsearchRule {
            common: RuleCommon {
                title: registration.title,
                reduce_function: registration.reduce_function,
                alert_expression: registration.alert_expression,
                time_range: registration.time_range,
                annotations,
                labels: registration.labels,
                panel_id: registration.panel_id,
                no_data_state: registration.no_data_state,
                exec_err_state: registration.exec_err_state,
            },
            target,
            apply_auto_bucket_agg_ids: registration.apply_auto_bucket_agg_ids,
        });
    }
}

impl AlertRuleBuilder for ElasticsearchAlertRuleBuilder {
    fn context(&self) -> &BuilderContext {
        &self.ctx
    }

    fn register_panel(&mut self, panel_id: u32, panel: &Panel, alert: &PanelAlert) -> Result<()> {
        let Some(Target::Elasticsearch(target)) = panel.first_target() else {
            return Err(mismatched_target("elasticsearch", panel));
        };
        let derived = self.ctx.derive(panel_id, panel, alert);

        let bucket_aggs = if alert.bucket_aggs.is_empty() {
            target.bucket_aggs.clone()
        } else {
            alert.bucket_aggs.clone()
        };
        let metric_aggs = if alert.metric_aggs.is_empty() {
            target.metric_aggs.clone()
        } else {
            alert.metric_aggs.clone()
        };
        let datasource = self
            .ctx
            .datasource
            .clone()
            .or_else(|| target.datasource.clone())
            .unwrap_or_else(|| DEFAULT_ELASTICSEARCH_DATASOURCE.to_string());

        self.register(ElasticsearchRegistration {
            title: derived.title,
            query: target.query.clone(),
            bucket_aggs,
            metric_aggs,
            interval_ms: self.interval_ms,
            datasource,
            reduce_function: alert.reduce_function,
            alert_expression: derived.alert_expression,
            alert_msg: alert.alert_msg.clone(),
            labels: derived.labels,
            panel_id: Some(derived.panel_id),
            apply_auto_bucket_agg_ids: self.auto_bucket_agg_ids,
            time_range: derived.time_range,
            no_data_state: alert.no_data_state,
            exec_err_state: alert.exec_err_state,
        });
        Ok(())
    }

    fn build(&self) -> Result<Vec<AlertRule>> {
        self.rules
            .iter()
            .map(|rule| {
                let mut target = rule.target.clone();
                if rule.apply_auto_bucket_agg_ids {
                    target = target.auto_bucket_agg_ids();
                }
                let triggers = vec![
                    AlertTrigger::Query(Target::Elasticsearch(target)),
                    reduce_of(
                        REDUCE_EXPRESSION_REF,
                        QUERY_REF,
                        rule.common.reduce_function,
                    ),
                    condition_of(&rule.common.alert_expression),
                ];
                self.ctx.assemble(&rule.common, triggers)
            })
            .collect()
    }

    fn pending(&self) -> usize {
        self.rules.len()
    }
}

impl DerivedAlert {
    fn into_registration<M>(self, metric: RuleMetric<M>, alert: &PanelAlert) -> RuleRegistration<M> {
        RuleRegistration {
            title: self.title,
            metric,
            reduce_function: alert.reduce_function,
            alert_expression: self.alert_expression,
            alert_msg: alert.alert_msg.clone(),
            labels: self.labels,
            panel_id: Some(self.panel_id),
            time_range: self.time_range,
            no_data_state: alert.no_data_state,
            exec_err_state: alert.exec_err_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::Threshold;
    use crate::domain::panel::PanelKind;
    use crate::domain::ToJsonData;

    fn ctx(provider: &str) -> BuilderContext {
        BuilderContext::new(Variation::new("prod", provider), "5m").with_dashboard_uid("dash-1")
    }

    fn prometheus_panel() -> Panel {
        let mut target = PrometheusTarget::new("sum(rate(errors_total[5m]))");
        target.legend_format = "{{ service }}".to_string();
        Panel::new("Error rate", PanelKind::TimeSeries).with_target(Target::Prometheus(target))
    }

    fn cloudwatch_panel() -> Panel {
        Panel::new("CPU", PanelKind::TimeSeries).with_target(Target::Cloudwatch(CloudwatchTarget {
            ref_id: "A".to_string(),
            namespace: None,
            metric_name: "CPUUtilization".to_string(),
            statistics: vec!["Average".to_string()],
            dimensions: BTreeMap::from([("InstanceId".to_string(), "*".to_string())]),
            region: "default".to_string(),
            match_exact: true,
            period: None,
            datasource: None,
        }))
    }

    fn ref_ids(rule: &AlertRule) -> Vec<String> {
        rule.triggers
            .iter()
            .map(|t| match t {
                AlertTrigger::Query(target) => target.ref_id().to_string(),
                AlertTrigger::Expression(e) => e.ref_id.clone(),
            })
            .collect()
    }

    #[test]
    fn test_prometheus_panel_alert() {
        let mut builder = PrometheusAlertRuleBuilder::new(ctx(""));
        let alert = PanelAlert {
            threshold: Threshold::GreaterThan(5.0),
            team: Some("platform".to_string()),
            alert_msg: "Errors are elevated".to_string(),
            ..Default::default()
        };
        builder
            .register_panel(3, &prometheus_panel(), &alert)
            .unwrap();
        assert_eq!(builder.pending(), 1);

        let rules = builder.build().unwrap();
        let rule = &rules[0];
        assert_eq!(rule.title, "[PROD] Error rate | platform");
        assert_eq!(rule.uid, create_uid_from_string("[PROD] Error rate | platform"));
        assert_eq!(rule.condition, "ALERT_CONDITION");
        assert_eq!(rule.time_range_from, 3600);
        assert_eq!(rule.time_range_to, 0);
        assert_eq!(rule.panel_id, Some(3));
        assert_eq!(rule.annotations["summary"], "Errors are elevated");
        assert_eq!(rule.annotations["__panelId__"], "3");
        assert_eq!(rule.annotations["__dashboardUid__"], "dash-1");
        assert_eq!(
            ref_ids(rule),
            vec!["QUERY", "REDUCE_EXPRESSION", "ALERT_CONDITION"]
        );

        match &rule.triggers[2] {
            AlertTrigger::Expression(e) => assert_eq!(e.expression, "$REDUCE_EXPRESSION > 5"),
            other => panic!("unexpected trigger {:?}", other),
        }
        let data = rule.to_json_data();
        assert_eq!(data["data"][0]["datasourceUid"], "prometheus");
        assert_eq!(data["data"][0]["model"]["legendFormat"], "{{ service }}");
    }

    #[test]
    fn test_panel_time_settings_override_alert() {
        let mut builder = PrometheusAlertRuleBuilder::new(ctx(""));
        let mut panel = prometheus_panel();
        panel.time_from = Some("15m".to_string());
        let alert = PanelAlert {
            time_from: "2h".to_string(),
            ..Default::default()
        };
        builder.register_panel(1, &panel, &alert).unwrap();
        let rules = builder.build().unwrap();
        assert_eq!(rules[0].time_range_from, 900);
    }

    #[test]
    fn test_multiple_prometheus_metrics() {
        let mut builder = PrometheusAlertRuleBuilder::new(ctx("").with_datasource("prom-uid"));
        let metric = |ref_id: &str, expr: &str| PrometheusMetric {
            ref_id: ref_id.to_string(),
            expr: expr.to_string(),
            legend_format: String::new(),
            datasource: None,
        };
        let mut registration = RuleRegistration::new(
            "[PROD] Saturation",
            RuleMetric::Multiple(vec![metric("A", "cpu"), metric("B", "mem")]),
            "$A > 80 || $B > 90",
        );
        registration.alert_msg = "Saturated".to_string();
        builder.register(registration);

        let rules = builder.build().unwrap();
        assert_eq!(
            ref_ids(&rules[0]),
            vec!["A-QUERY", "A", "B-QUERY", "B", "ALERT_CONDITION"]
        );
        assert_eq!(rules[0].time_range_from, 300);
        let data = rules[0].to_json_data();
        assert_eq!(data["data"][2]["datasourceUid"], "prom-uid");
        assert_eq!(data["data"][1]["model"]["expression"], "A-QUERY");
    }

    #[test]
    fn test_cloudwatch_requires_aws_provider() {
        let alert = PanelAlert::default();

        let mut onprem = CloudwatchAlertRuleBuilder::new(ctx("onprem"), "AWS/EC2");
        onprem.register_panel(1, &cloudwatch_panel(), &alert).unwrap();
        assert_eq!(onprem.pending(), 1);
        assert!(onprem.build().unwrap().is_empty());

        let mut aws = CloudwatchAlertRuleBuilder::new(ctx("aws-eu"), "AWS/EC2");
        aws.register_panel(1, &cloudwatch_panel(), &alert).unwrap();
        let rules = aws.build().unwrap();
        assert_eq!(rules.len(), 1);
        match &rules[0].triggers[0] {
            AlertTrigger::Query(Target::Cloudwatch(t)) => {
                assert_eq!(t.namespace.as_deref(), Some("AWS/EC2"));
                assert_eq!(t.datasource.as_deref(), Some("cloudwatch"));
                assert_eq!(t.ref_id, "QUERY");
            }
            other => panic!("unexpected trigger {:?}", other),
        }
    }

    #[test]
    fn test_elasticsearch_panel_alert() {
        let mut target = ElasticsearchTarget::new("level:error");
        target.bucket_aggs = vec![BucketAgg::terms("service"), BucketAgg::date_histogram()];
        target.datasource = Some("logs".to_string());
        let panel = Panel::new("Errors", PanelKind::TimeSeries)
            .with_target(Target::Elasticsearch(target));

        let mut builder = ElasticsearchAlertRuleBuilder::new(ctx(""));
        builder.auto_bucket_agg_ids = true;
        builder
            .register_panel(2, &panel, &PanelAlert::default())
            .unwrap();
        let rules = builder.build().unwrap();
        let rule = &rules[0];

        assert!(rule.annotations["status"].starts_with("{{- with $values -}}"));
        match &rule.triggers[0] {
            AlertTrigger::Query(Target::Elasticsearch(t)) => {
                assert_eq!(t.query, "level:error");
                assert_eq!(t.datasource.as_deref(), Some("logs"));
                assert_eq!(t.interval_ms, Some(1000));
                assert_eq!(t.metric_aggs, vec![MetricAgg::count()]);
                let ids: Vec<_> = t.bucket_aggs.iter().map(|a| a.id().unwrap()).collect();
                assert_eq!(ids, vec!["1", "2"]);
            }
            other => panic!("unexpected trigger {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_target_is_rejected() {
        let mut builder = PrometheusAlertRuleBuilder::new(ctx(""));
        let err = builder
            .register_panel(1, &cloudwatch_panel(), &PanelAlert::default())
            .unwrap_err();
        assert!(err.to_string().contains("found cloudwatch"));
    }

    #[test]
    fn test_build_all_concatenates() {
        let mut prometheus = PrometheusAlertRuleBuilder::new(ctx(""));
        prometheus
            .register_panel(1, &prometheus_panel(), &PanelAlert::default())
            .unwrap();
        let mut cloudwatch = CloudwatchAlertRuleBuilder::new(ctx("aws"), "AWS/EC2");
        cloudwatch
            .register_panel(2, &cloudwatch_panel(), &PanelAlert::default())
            .unwrap();

        let rules = build_all(&[&prometheus, &cloudwatch]).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].title, "[PROD] CPU");
    }
}
