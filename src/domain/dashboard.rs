use crate::domain::layout::{PlacedPanel, Stack};
use crate::domain::target::Target;
use crate::domain::ToJsonData;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    #[default]
    Query,
    Custom,
    Interval,
    Constant,
    Datasource,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Query => "query",
            TemplateKind::Custom => "custom",
            TemplateKind::Interval => "interval",
            TemplateKind::Constant => "constant",
            TemplateKind::Datasource => "datasource",
        }
    }
}

/// Dashboard variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: TemplateKind,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub datasource: Option<String>,
    #[serde(default)]
    pub multi: bool,
    #[serde(default)]
    pub include_all: bool,
}

impl ToJsonData for Template {
    fn to_json_data(&self) -> Value {
        let options: Vec<Value> = match self.kind {
            TemplateKind::Custom | TemplateKind::Interval => self
                .query
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| json!({ "selected": false, "text": v, "value": v }))
                .collect(),
            _ => Vec::new(),
        };
        let refresh = if self.kind == TemplateKind::Query { 1 } else { 0 };
        json!({
            "datasource": self.datasource,
            "hide": 0,
            "includeAll": self.include_all,
            "label": self.label.clone().unwrap_or_else(|| self.name.clone()),
            "multi": self.multi,
            "name": self.name,
            "options": options,
            "query": self.query,
            "refresh": refresh,
            "type": self.kind.as_str(),
        })
    }
}

fn default_timezone() -> String {
    "utc".to_string()
}

fn default_time_from() -> String {
    "now-1h".to_string()
}

fn default_time_to() -> String {
    "now".to_string()
}

fn default_editable() -> bool {
    true
}

/// Dashboard settings that do not depend on layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMeta {
    pub uid: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default = "default_time_from")]
    pub time_from: String,
    #[serde(default = "default_time_to")]
    pub time_to: String,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default = "default_editable")]
    pub editable: bool,
    #[serde(default)]
    pub templates: Vec<Template>,
}

impl DashboardMeta {
    pub fn new(uid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            title: title.into(),
            description: None,
            tags: Vec::new(),
            timezone: default_timezone(),
            version: 0,
            refresh: None,
            time_from: default_time_from(),
            time_to: default_time_to(),
            data_source: None,
            editable: default_editable(),
            templates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub meta: DashboardMeta,
    pub panels: Vec<PlacedPanel>,
}

impl Dashboard {
    /// Lays out the stack and resolves datasources: target, then panel,
    /// then the dashboard default.
    pub fn compose(meta: DashboardMeta, stack: &Stack) -> Result<Self> {
        let mut panels = stack.layout()?;
        for placed in &mut panels {
            if let PlacedPanel::Panel { panel, .. } = placed {
                if panel.datasource.is_none() {
                    panel.datasource = meta.data_source.clone();
                }
                let datasource = panel.datasource.clone();
                panel.targets = std::mem::take(&mut panel.targets)
                    .into_iter()
                    .map(|t: Target| t.with_default_datasource(datasource.as_deref()))
                    .collect();
            }
        }
        Ok(Self { meta, panels })
    }

    pub fn uid(&self) -> &str {
        &self.meta.uid
    }

    pub fn title(&self) -> &str {
        &self.meta.title
    }
}

impl ToJsonData for Dashboard {
    fn to_json_data(&self) -> Value {
        let meta = &self.meta;
        json!({
            "annotations": { "list": [] },
            "description": meta.description.clone().unwrap_or_default(),
            "editable": meta.editable,
            "graphTooltip": 0,
            "id": null,
            "links": [],
            "panels": self.panels.iter().map(ToJsonData::to_json_data).collect::<Vec<_>>(),
            "refresh": meta.refresh.clone().unwrap_or_default(),
            "schemaVersion": 39,
            "tags": meta.tags,
            "templating": {
                "list": meta.templates.iter().map(ToJsonData::to_json_data).collect::<Vec<_>>(),
            },
            "time": { "from": meta.time_from, "to": meta.time_to },
            "timepicker": {},
            "timezone": meta.timezone,
            "title": meta.title,
            "uid": meta.uid,
            "version": meta.version,
        })
    }
}
