// Dashboard descriptor: the persisted *.gd.json document
use super::chart::Chart;
use super::filter::Filter;
use super::table::Table;
use super::view::View;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const REQUIRED_KEYS: [&str; 4] = ["tables", "views", "filters", "charts"];
pub const OPTIONAL_KEYS: [&str; 3] = ["fill", "morphs", "numMorphs"];

/// Outcome of validating or loading a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }
}

/// Checks the top-level shape: an object with all required keys and no keys
/// beyond the required and optional ones. Missing and unexpected keys are
/// reported together.
pub fn validate_descriptor(descriptor: &Value) -> Validation {
    let Some(object) = descriptor.as_object() else {
        return Validation::invalid("Dashboard descriptor must be a JSON object");
    };

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| !object.contains_key(*key))
        .collect();
    let unexpected: Vec<&str> = object
        .keys()
        .map(String::as_str)
        .filter(|key| !REQUIRED_KEYS.contains(key) && !OPTIONAL_KEYS.contains(key))
        .collect();

    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!("missing required keys: {}", missing.join(", ")));
    }
    if !unexpected.is_empty() {
        problems.push(format!("unexpected keys: {}", unexpected.join(", ")));
    }

    if problems.is_empty() {
        Validation::ok()
    } else {
        Validation::invalid(format!("Invalid dashboard descriptor: {}", problems.join("; ")))
    }
}

/// Background fill: RGBA fractions or an opaque color expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fill {
    Rgba { r: f64, g: f64, b: f64, a: f64 },
    Expression(String),
}

fn lenient_filter<'de, D>(deserializer: D) -> Result<Option<Filter>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Reads a stored morph index. Anything but a non-negative integer is read
/// as absent, so the element restores after the indexed ones.
pub fn lenient_index<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_u64()))
}

/// A named filter as stored: the filter plus its widget layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub filter: Filter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<Value>,
    #[serde(default, deserialize_with = "lenient_index", skip_serializing_if = "Option::is_none")]
    pub morph_index: Option<u64>,
}

/// A chart as stored, with its click filter. A click filter that does not
/// parse is dropped and reseeded on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(flatten)]
    pub chart: Chart,
    #[serde(default, deserialize_with = "lenient_filter", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDescriptor {
    pub tables: BTreeMap<String, Table>,
    pub views: BTreeMap<String, View>,
    pub filters: BTreeMap<String, FilterSpec>,
    pub charts: BTreeMap<String, ChartSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub morphs: Vec<Value>,
    pub num_morphs: u64,
}

/// One visual element to instantiate during a restore.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreTask {
    Filter { name: String, spec: FilterSpec },
    Chart { name: String, spec: ChartSpec },
    Morph(Value),
}

impl RestoreTask {
    pub fn morph_index(&self) -> Option<u64> {
        match self {
            RestoreTask::Filter { spec, .. } => spec.morph_index,
            RestoreTask::Chart { spec, .. } => spec.chart.morph_index,
            RestoreTask::Morph(value) => value.get("morphIndex").and_then(Value::as_u64),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RestoreTask::Filter { name, .. } => format!("filter {}", name),
            RestoreTask::Chart { name, .. } => format!("chart {}", name),
            RestoreTask::Morph(_) => "free element".to_string(),
        }
    }
}

/// Everything a restore needs, split out of a validated descriptor. Data
/// entries load directly; visual elements are ordered front to back by
/// morph index, entries without one last.
#[derive(Debug, Clone, Default)]
pub struct RestorePlan {
    pub tables: Vec<(String, Table)>,
    pub views: Vec<(String, View)>,
    pub fill: Option<Fill>,
    pub tasks: Vec<RestoreTask>,
    /// Entries that could not be read, with the reason.
    pub skipped: Vec<String>,
}

impl RestorePlan {
    pub fn from_descriptor(descriptor: &Map<String, Value>) -> Self {
        let mut plan = RestorePlan::default();

        plan.tables = plan.read_entries(descriptor, "tables", "table");
        plan.views = plan.read_entries(descriptor, "views", "view");

        for (name, spec) in plan.read_entries::<FilterSpec>(descriptor, "filters", "filter") {
            plan.tasks.push(RestoreTask::Filter { name, spec });
        }
        for (name, spec) in plan.read_entries::<ChartSpec>(descriptor, "charts", "chart") {
            plan.tasks.push(RestoreTask::Chart { name, spec });
        }

        let morphs = match descriptor.get("morphs") {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Object(items)) => items.values().cloned().collect(),
            _ => Vec::new(),
        };
        plan.tasks.extend(morphs.into_iter().map(RestoreTask::Morph));

        plan.fill = match descriptor.get("fill") {
            None | Some(Value::Null) => None,
            Some(fill) => match serde_json::from_value(fill.clone()) {
                Ok(fill) => Some(fill),
                Err(e) => {
                    plan.skipped.push(format!("fill: {}", e));
                    None
                }
            },
        };

        plan.tasks
            .sort_by_key(|task| task.morph_index().unwrap_or(u64::MAX));
        plan
    }

    fn read_entries<T>(&mut self, descriptor: &Map<String, Value>, key: &str, kind: &str) -> Vec<(String, T)>
    where
        T: for<'de> Deserialize<'de>,
    {
        let Some(entries) = descriptor.get(key).and_then(Value::as_object) else {
            self.skipped.push(format!("{}: expected an object", key));
            return Vec::new();
        };

        let mut parsed = Vec::with_capacity(entries.len());
        for (name, entry) in entries {
            match serde_json::from_value(entry.clone()) {
                Ok(value) => parsed.push((name.clone(), value)),
                Err(e) => self.skipped.push(format!("{} {}: {}", kind, name, e)),
            }
        }
        parsed
    }
}
