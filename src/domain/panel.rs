use crate::domain::alert::PanelAlert;
use crate::domain::target::Target;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    #[default]
    TimeSeries,
    Graph,
    Stat,
    Gauge,
    Table,
    Text,
    BarGauge,
    Logs,
}

impl PanelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelKind::TimeSeries => "timeseries",
            PanelKind::Graph => "graph",
            PanelKind::Stat => "stat",
            PanelKind::Gauge => "gauge",
            PanelKind::Table => "table",
            PanelKind::Text => "text",
            PanelKind::BarGauge => "bargauge",
            PanelKind::Logs => "logs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Panel {
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: PanelKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub datasource: Option<String>,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub time_from: Option<String>,
    #[serde(default)]
    pub time_shift: Option<String>,
    #[serde(default)]
    pub transparent: bool,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub alert: Option<PanelAlert>,
}

impl Panel {
    pub fn new(title: impl Into<String>, kind: PanelKind) -> Self {
        Self {
            title: title.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    pub fn first_target(&self) -> Option<&Target> {
        self.targets.first()
    }
}
