// Chart domain model and store
use super::descriptor::lenient_index;
use super::view::ResolvedData;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Chart type rendered as a plain data grid; it never gets a generated title.
pub const TABLE_CHART_TYPE: &str = "Table";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub chart_type: String,
    pub view_or_table: String,
    #[serde(default)]
    pub options: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient_index", skip_serializing_if = "Option::is_none")]
    pub morph_index: Option<u64>,
}

impl Chart {
    #[cfg(test)]
    pub fn new(chart_type: &str, view_or_table: &str) -> Self {
        Self {
            chart_type: chart_type.to_string(),
            view_or_table: view_or_table.to_string(),
            options: Map::new(),
            morph_index: None,
        }
    }

    #[cfg(test)]
    pub fn title(&self) -> Option<&str> {
        self.options.get("title").and_then(Value::as_str)
    }
}

/// A resolved chart handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequest {
    pub chart_name: String,
    pub chart_type: String,
    pub options: Map<String, Value>,
    pub data: ResolvedData,
}

/// Title for a chart over `data`. Up to two value columns are listed against
/// the category column; wider data is named after the view or table. Active
/// filters are appended as a `where` clause list.
pub fn chart_title(chart_type: &str, data: &ResolvedData) -> Option<String> {
    if chart_type == TABLE_CHART_TYPE {
        return None;
    }

    let mut title = match data.columns.split_first() {
        Some((category, values)) if !values.is_empty() && values.len() <= 2 => {
            let names: Vec<&str> = values.iter().map(|c| c.name.as_str()).collect();
            format!("{} v {}", names.join(", "), category.name)
        }
        _ => data.name.clone(),
    };

    if !data.active_filters.is_empty() {
        let clauses: Vec<String> = data.active_filters.iter().map(|f| f.clause()).collect();
        title.push_str(" where ");
        title.push_str(&clauses.join(", "));
    }

    Some(title)
}

#[derive(Debug, Clone, Default)]
pub struct ChartStore {
    charts: BTreeMap<String, Chart>,
}

impl ChartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chart(&mut self, name: &str, chart: Chart) {
        self.charts.insert(name.to_string(), chart);
    }

    pub fn remove(&mut self, name: &str) -> Option<Chart> {
        self.charts.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Chart> {
        self.charts.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Chart> {
        self.charts.get_mut(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.charts.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Chart)> {
        self.charts.iter()
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn clear(&mut self) {
        self.charts.clear();
    }
}
