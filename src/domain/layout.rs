//! Grid composition: rows of equally wide panels stacked top to bottom on
//! Grafana's 24-column grid.

use crate::domain::panel::Panel;
use crate::domain::ToJsonData;
use crate::utils::error::{GritError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const GRID_WIDTH: u32 = 24;
const ROW_HEADER_HEIGHT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPos {
    pub h: u32,
    pub w: u32,
    pub x: u32,
    pub y: u32,
}

fn default_row_height() -> u32 {
    8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default = "default_row_height")]
    pub height: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub panels: Vec<Panel>,
}

impl Row {
    pub fn new(height: u32, panels: Vec<Panel>) -> Self {
        Self {
            height,
            title: None,
            panels,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

pub fn row3(panels: Vec<Panel>) -> Row {
    Row::new(3, panels)
}

pub fn row4(panels: Vec<Panel>) -> Row {
    Row::new(4, panels)
}

pub fn row5(panels: Vec<Panel>) -> Row {
    Row::new(5, panels)
}

pub fn row6(panels: Vec<Panel>) -> Row {
    Row::new(6, panels)
}

pub fn row7(panels: Vec<Panel>) -> Row {
    Row::new(7, panels)
}

pub fn row8(panels: Vec<Panel>) -> Row {
    Row::new(8, panels)
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlacedPanel {
    RowHeader {
        id: u32,
        title: String,
        y: u32,
    },
    Panel {
        id: u32,
        grid_pos: GridPos,
        panel: Panel,
    },
}

impl PlacedPanel {
    pub fn id(&self) -> u32 {
        match self {
            PlacedPanel::RowHeader { id, .. } | PlacedPanel::Panel { id, .. } => *id,
        }
    }
}

impl ToJsonData for PlacedPanel {
    fn to_json_data(&self) -> Value {
        match self {
            PlacedPanel::RowHeader { id, title, y } => json!({
                "collapsed": false,
                "gridPos": { "h": ROW_HEADER_HEIGHT, "w": GRID_WIDTH, "x": 0, "y": y },
                "id": id,
                "panels": [],
                "title": title,
                "type": "row",
            }),
            PlacedPanel::Panel {
                id,
                grid_pos,
                panel,
            } => {
                let mut data = json!({
                    "datasource": panel.datasource,
                    "description": panel.description.clone().unwrap_or_default(),
                    "fieldConfig": { "defaults": {}, "overrides": [] },
                    "gridPos": grid_pos,
                    "id": id,
                    "targets": panel.targets.iter().map(ToJsonData::to_json_data).collect::<Vec<_>>(),
                    "title": panel.title,
                    "transparent": panel.transparent,
                    "type": panel.kind.as_str(),
                });
                if let Some(unit) = &panel.unit {
                    data["fieldConfig"]["defaults"]["unit"] = json!(unit);
                }
                if let Some(time_from) = &panel.time_from {
                    data["timeFrom"] = json!(time_from);
                }
                if let Some(time_shift) = &panel.time_shift {
                    data["timeShift"] = json!(time_shift);
                }
                if let Some(content) = &panel.content {
                    data["options"] = json!({ "content": content, "mode": "markdown" });
                }
                data
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stack {
    pub rows: Vec<Row>,
}

impl Stack {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Places every row on the grid and numbers panels from 1 in order.
    pub fn layout(&self) -> Result<Vec<PlacedPanel>> {
        let mut placed = Vec::new();
        let mut next_id = 1u32;
        let mut y = 0u32;

        for (index, row) in self.rows.iter().enumerate() {
            if row.height == 0 {
                return Err(GritError::layout(format!(
                    "row {} has height 0",
                    index + 1
                )));
            }
            let count = row.panels.len() as u32;
            if count > GRID_WIDTH {
                return Err(GritError::layout(format!(
                    "row {} has {} panels, at most {} fit",
                    index + 1,
                    count,
                    GRID_WIDTH
                )));
            }

            if let Some(title) = &row.title {
                placed.push(PlacedPanel::RowHeader {
                    id: next_id,
                    title: title.clone(),
                    y,
                });
                next_id += 1;
                y += ROW_HEADER_HEIGHT;
            }

            if count == 0 {
                continue;
            }

            let base = GRID_WIDTH / count;
            let extra = GRID_WIDTH % count;
            let mut x = 0u32;
            for (i, panel) in row.panels.iter().enumerate() {
                let w = base + u32::from((i as u32) < extra);
                placed.push(PlacedPanel::Panel {
                    id: next_id,
                    grid_pos: GridPos {
                        h: row.height,
                        w,
                        x,
                        y,
                    },
                    panel: panel.clone(),
                });
                next_id += 1;
                x += w;
            }
            y += row.height;
        }

        Ok(placed)
    }
}
