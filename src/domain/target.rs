use crate::domain::ToJsonData;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A panel or alert query, tagged by datasource kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Target {
    Prometheus(PrometheusTarget),
    Cloudwatch(CloudwatchTarget),
    Elasticsearch(ElasticsearchTarget),
}

impl Target {
    pub fn ref_id(&self) -> &str {
        match self {
            Target::Prometheus(t) => &t.ref_id,
            Target::Cloudwatch(t) => &t.ref_id,
            Target::Elasticsearch(t) => &t.ref_id,
        }
    }

    pub fn datasource(&self) -> Option<&str> {
        match self {
            Target::Prometheus(t) => t.datasource.as_deref(),
            Target::Cloudwatch(t) => t.datasource.as_deref(),
            Target::Elasticsearch(t) => t.datasource.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Target::Prometheus(_) => "prometheus",
            Target::Cloudwatch(_) => "cloudwatch",
            Target::Elasticsearch(_) => "elasticsearch",
        }
    }

    pub fn with_ref_id(mut self, ref_id: impl Into<String>) -> Self {
        let ref_id = ref_id.into();
        match &mut self {
            Target::Prometheus(t) => t.ref_id = ref_id,
            Target::Cloudwatch(t) => t.ref_id = ref_id,
            Target::Elasticsearch(t) => t.ref_id = ref_id,
        }
        self
    }

    /// Fills in the datasource when the target does not name one.
    pub fn with_default_datasource(mut self, datasource: Option<&str>) -> Self {
        let Some(datasource) = datasource else {
            return self;
        };
        let slot = match &mut self {
            Target::Prometheus(t) => &mut t.datasource,
            Target::Cloudwatch(t) => &mut t.datasource,
            Target::Elasticsearch(t) => &mut t.datasource,
        };
        if slot.is_none() {
            *slot = Some(datasource.to_string());
        }
        self
    }
}

impl ToJsonData for Target {
    fn to_json_data(&self) -> Value {
        match self {
            Target::Prometheus(t) => t.to_json_data(),
            Target::Cloudwatch(t) => t.to_json_data(),
            Target::Elasticsearch(t) => t.to_json_data(),
        }
    }
}

fn default_ref_id() -> String {
    "A".to_string()
}

fn default_region() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_time_field() -> String {
    "@timestamp".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrometheusTarget {
    #[serde(default = "default_ref_id")]
    pub ref_id: String,
    pub expr: String,
    #[serde(default)]
    pub legend_format: String,
    #[serde(default)]
    pub datasource: Option<String>,
    #[serde(default)]
    pub instant: bool,
    #[serde(default)]
    pub interval: Option<String>,
}

impl PrometheusTarget {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            ref_id: default_ref_id(),
            expr: expr.into(),
            legend_format: String::new(),
            datasource: None,
            instant: false,
            interval: None,
        }
    }
}

impl ToJsonData for PrometheusTarget {
    fn to_json_data(&self) -> Value {
        json!({
            "datasource": self.datasource,
            "expr": self.expr,
            "format": "time_series",
            "instant": self.instant,
            "interval": self.interval.clone().unwrap_or_default(),
            "intervalFactor": 2,
            "legendFormat": self.legend_format,
            "refId": self.ref_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudwatchTarget {
    #[serde(default = "default_ref_id")]
    pub ref_id: String,
    #[serde(default)]
    pub namespace: Option<String>,
    pub metric_name: String,
    #[serde(default)]
    pub statistics: Vec<String>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_true")]
    pub match_exact: bool,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub datasource: Option<String>,
}

impl ToJsonData for CloudwatchTarget {
    fn to_json_data(&self) -> Value {
        json!({
            "datasource": self.datasource,
            "dimensions": self.dimensions,
            "expression": "",
            "matchExact": self.match_exact,
            "metricEditorMode": 0,
            "metricName": self.metric_name,
            "metricQueryType": 0,
            "namespace": self.namespace.clone().unwrap_or_default(),
            "period": self.period.clone().unwrap_or_default(),
            "refId": self.ref_id,
            "region": self.region,
            "statistics": self.statistics,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticsearchTarget {
    #[serde(default = "default_ref_id")]
    pub ref_id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub bucket_aggs: Vec<BucketAgg>,
    #[serde(default)]
    pub metric_aggs: Vec<MetricAgg>,
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default = "default_time_field")]
    pub time_field: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub datasource: Option<String>,
}

impl ElasticsearchTarget {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            ref_id: default_ref_id(),
            query: query.into(),
            bucket_aggs: Vec::new(),
            metric_aggs: Vec::new(),
            interval_ms: None,
            time_field: default_time_field(),
            alias: None,
            datasource: None,
        }
    }

    /// Gives every bucket aggregation without an id the smallest unused
    /// positive integer id. Aggregations that already have an id keep it.
    pub fn auto_bucket_agg_ids(mut self) -> Self {
        let taken: BTreeSet<String> = self
            .bucket_aggs
            .iter()
            .filter_map(|agg| agg.id().map(str::to_string))
            .collect();
        let mut next = 1u32;
        for agg in &mut self.bucket_aggs {
            if agg.id().is_some() {
                continue;
            }
            while taken.contains(&next.to_string()) {
                next += 1;
            }
            agg.set_id(next.to_string());
            next += 1;
        }
        self
    }
}

impl ToJsonData for ElasticsearchTarget {
    fn to_json_data(&self) -> Value {
        let metrics: Vec<MetricAgg> = if self.metric_aggs.is_empty() {
            vec![MetricAgg::count()]
        } else {
            self.metric_aggs.clone()
        };
        let mut data = json!({
            "alias": self.alias.clone().unwrap_or_default(),
            "bucketAggs": self.bucket_aggs.iter().map(ToJsonData::to_json_data).collect::<Vec<_>>(),
            "datasource": self.datasource,
            "metrics": metrics.iter().map(ToJsonData::to_json_data).collect::<Vec<_>>(),
            "query": self.query,
            "refId": self.ref_id,
            "timeField": self.time_field,
        });
        if let Some(interval_ms) = self.interval_ms {
            data["intervalMs"] = json!(interval_ms);
        }
        data
    }
}

fn default_histogram_interval() -> String {
    "auto".to_string()
}

fn default_order() -> String {
    "desc".to_string()
}

fn default_order_by() -> String {
    "_term".to_string()
}

fn default_min_doc_count() -> u64 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterQuery {
    pub query: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BucketAgg {
    DateHistogram {
        #[serde(default)]
        id: Option<String>,
        #[serde(default = "default_time_field")]
        field: String,
        #[serde(default = "default_histogram_interval")]
        interval: String,
        #[serde(default)]
        min_doc_count: u64,
    },
    Terms {
        #[serde(default)]
        id: Option<String>,
        field: String,
        #[serde(default)]
        size: u64,
        #[serde(default = "default_order")]
        order: String,
        #[serde(default = "default_order_by")]
        order_by: String,
        #[serde(default = "default_min_doc_count")]
        min_doc_count: u64,
    },
    Filters {
        #[serde(default)]
        id: Option<String>,
        filters: Vec<FilterQuery>,
    },
}

impl BucketAgg {
    pub fn date_histogram() -> Self {
        BucketAgg::DateHistogram {
            id: None,
            field: default_time_field(),
            interval: default_histogram_interval(),
            min_doc_count: 0,
        }
    }

    pub fn terms(field: impl Into<String>) -> Self {
        BucketAgg::Terms {
            id: None,
            field: field.into(),
            size: 0,
            order: default_order(),
            order_by: default_order_by(),
            min_doc_count: default_min_doc_count(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            BucketAgg::DateHistogram { id, .. }
            | BucketAgg::Terms { id, .. }
            | BucketAgg::Filters { id, .. } => id.as_deref(),
        }
    }

    fn set_id(&mut self, value: String) {
        match self {
            BucketAgg::DateHistogram { id, .. }
            | BucketAgg::Terms { id, .. }
            | BucketAgg::Filters { id, .. } => *id = Some(value),
        }
    }
}

impl ToJsonData for BucketAgg {
    fn to_json_data(&self) -> Value {
        let id = self.id().unwrap_or("0");
        match self {
            BucketAgg::DateHistogram {
                field,
                interval,
                min_doc_count,
                ..
            } => json!({
                "field": field,
                "id": id,
                "settings": {
                    "interval": interval,
                    "min_doc_count": min_doc_count,
                    "trimEdges": 0,
                },
                "type": "date_histogram",
            }),
            BucketAgg::Terms {
                field,
                size,
                order,
                order_by,
                min_doc_count,
                ..
            } => json!({
                "field": field,
                "id": id,
                "settings": {
                    "min_doc_count": min_doc_count,
                    "order": order,
                    "orderBy": order_by,
                    "size": size.to_string(),
                },
                "type": "terms",
            }),
            BucketAgg::Filters { filters, .. } => json!({
                "id": id,
                "settings": {
                    "filters": filters
                        .iter()
                        .map(|f| json!({ "label": f.label, "query": f.query }))
                        .collect::<Vec<_>>(),
                },
                "type": "filters",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricAgg {
    Count {
        #[serde(default)]
        id: Option<String>,
    },
    Avg {
        #[serde(default)]
        id: Option<String>,
        field: String,
    },
    Sum {
        #[serde(default)]
        id: Option<String>,
        field: String,
    },
    Min {
        #[serde(default)]
        id: Option<String>,
        field: String,
    },
    Max {
        #[serde(default)]
        id: Option<String>,
        field: String,
    },
}

impl MetricAgg {
    pub fn count() -> Self {
        MetricAgg::Count { id: None }
    }
}

impl ToJsonData for MetricAgg {
    fn to_json_data(&self) -> Value {
        let (kind, id, field) = match self {
            MetricAgg::Count { id } => ("count", id, None),
            MetricAgg::Avg { id, field } => ("avg", id, Some(field)),
            MetricAgg::Sum { id, field } => ("sum", id, Some(field)),
            MetricAgg::Min { id, field } => ("min", id, Some(field)),
            MetricAgg::Max { id, field } => ("max", id, Some(field)),
        };
        let mut data = json!({
            "hide": false,
            "id": id.clone().unwrap_or_else(|| "0".to_string()),
            "type": kind,
        });
        if let Some(field) = field {
            data["field"] = json!(field);
            data["settings"] = json!({});
        }
        data
    }
}
