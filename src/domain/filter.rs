// Filter domain model and registry
use super::error::DashboardError;
use super::table::TableStore;
use super::value::{as_number, format_number, format_value, values_equal};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reads a bound as a number; anything that is not a finite number becomes
/// absent, leaving the filter invalid instead of unparseable.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).filter(|n| n.is_finite()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectFilter {
    pub column_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeFilter {
    pub column_name: String,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericSelectFilter {
    #[serde(flatten)]
    pub range: RangeFilter,
    pub increment: f64,
}

/// A predicate over one column. The variant is fixed when the filter is
/// created; value changes never turn a select filter into a range filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Filter {
    Select(SelectFilter),
    Range(RangeFilter),
    NumericSelect(NumericSelectFilter),
}

const FILTER_KINDS: &[&str] = &["select", "range", "numericSelect"];

/// Kind of a stored filter that carries no `kind` tag, read from its fields.
fn kind_from_fields(object: &Value) -> &'static str {
    if object.get("minValue").is_some() || object.get("maxValue").is_some() {
        if object.get("increment").is_some_and(Value::is_number) {
            "numericSelect"
        } else {
            "range"
        }
    } else {
        "select"
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let object = Value::deserialize(deserializer)?;
        if !object.is_object() {
            return Err(D::Error::custom("a filter must be a JSON object"));
        }

        let kind = match object.get("kind").and_then(Value::as_str) {
            Some(kind) => kind.to_string(),
            None => kind_from_fields(&object).to_string(),
        };
        let filter = match kind.as_str() {
            "select" => serde_json::from_value(object).map(Filter::Select),
            "range" => serde_json::from_value(object).map(Filter::Range),
            "numericSelect" => serde_json::from_value(object).map(Filter::NumericSelect),
            other => return Err(D::Error::unknown_variant(other, FILTER_KINDS)),
        };
        filter.map_err(D::Error::custom)
    }
}

impl Filter {
    pub fn select(column_name: &str, value: Option<Value>) -> Self {
        Filter::Select(SelectFilter {
            column_name: column_name.to_string(),
            value,
        })
    }

    #[cfg(test)]
    pub fn range(column_name: &str, min_value: f64, max_value: f64) -> Self {
        Filter::Range(RangeFilter {
            column_name: column_name.to_string(),
            min_value: Some(min_value),
            max_value: Some(max_value),
        })
    }

    /// A stepped numeric slider spanning the whole value range of a column.
    pub fn numeric_select(column_name: &str, parameters: &RangeParameters) -> Self {
        Filter::NumericSelect(NumericSelectFilter {
            range: RangeFilter {
                column_name: column_name.to_string(),
                min_value: Some(parameters.min),
                max_value: Some(parameters.max),
            },
            increment: parameters.increment,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Filter::Select(_) => "select",
            Filter::Range(_) => "range",
            Filter::NumericSelect(_) => "numericSelect",
        }
    }

    pub fn column_name(&self) -> &str {
        match self {
            Filter::Select(f) => &f.column_name,
            Filter::Range(f) => &f.column_name,
            Filter::NumericSelect(f) => &f.range.column_name,
        }
    }

    fn bounds(&self) -> Option<(f64, f64)> {
        let range = match self {
            Filter::Select(_) => return None,
            Filter::Range(f) => f,
            Filter::NumericSelect(f) => &f.range,
        };
        Some((range.min_value?, range.max_value?))
    }

    /// A filter constrains rows only when it names a column and carries a
    /// value (select) or both numeric bounds (range).
    pub fn is_valid(&self) -> bool {
        if self.column_name().is_empty() {
            return false;
        }
        match self {
            Filter::Select(f) => f.value.is_some(),
            Filter::Range(_) | Filter::NumericSelect(_) => self.bounds().is_some(),
        }
    }

    /// Whether a cell satisfies this filter. Range bounds are inclusive and
    /// compare numerically; a cell that is not a number never matches.
    pub fn matches(&self, cell: &Value) -> bool {
        match self {
            Filter::Select(f) => f.value.as_ref().is_some_and(|v| values_equal(cell, v)),
            Filter::Range(_) | Filter::NumericSelect(_) => match (self.bounds(), as_number(cell)) {
                (Some((min, max)), Some(n)) => min <= n && n <= max,
                _ => false,
            },
        }
    }

    /// Title clause: `column = value` or `max >= column >= min`.
    pub fn clause(&self) -> String {
        match self {
            Filter::Select(f) => format!(
                "{} = {}",
                f.column_name,
                f.value.as_ref().map(format_value).unwrap_or_default()
            ),
            Filter::Range(_) | Filter::NumericSelect(_) => {
                let (min, max) = self.bounds().unwrap_or((f64::NAN, f64::NAN));
                format!(
                    "{} >= {} >= {}",
                    format_number(max),
                    self.column_name(),
                    format_number(min)
                )
            }
        }
    }

    /// Applies a new value. The value shape has to match the filter kind.
    pub fn set_value(&mut self, name: &str, value: FilterValue) -> Result<(), DashboardError> {
        match (self, value) {
            (Filter::Select(f), FilterValue::Select(v)) => {
                f.value = Some(v);
                Ok(())
            }
            (Filter::Range(f), FilterValue::Range { min, max })
            | (Filter::NumericSelect(NumericSelectFilter { range: f, .. }), FilterValue::Range { min, max }) => {
                f.min_value = Some(min);
                f.max_value = Some(max);
                Ok(())
            }
            (filter, _) => Err(DashboardError::FilterKindMismatch {
                name: name.to_string(),
                kind: filter.kind(),
            }),
        }
    }
}

/// New value carried by a filter change.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Range { min: f64, max: f64 },
    Select(Value),
}

#[derive(Deserialize)]
struct RangeBounds {
    min: f64,
    max: f64,
}

impl FilterValue {
    /// Reads a value sent for `filter`. Select filters take any JSON value
    /// as is; range filters need `{min, max}` numbers.
    pub fn for_filter(name: &str, filter: &Filter, raw: Value) -> Result<Self, DashboardError> {
        match filter {
            Filter::Select(_) => Ok(FilterValue::Select(raw)),
            Filter::Range(_) | Filter::NumericSelect(_) => {
                let bounds: RangeBounds = serde_json::from_value(raw).map_err(|_| {
                    DashboardError::FilterKindMismatch {
                        name: name.to_string(),
                        kind: filter.kind(),
                    }
                })?;
                Ok(FilterValue::Range {
                    min: bounds.min,
                    max: bounds.max,
                })
            }
        }
    }
}

/// Which filter a change targets: a user-named filter widget or the click
/// filter attached to a chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterTarget {
    Named(String),
    Chart(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterChange {
    pub target: FilterTarget,
    pub value: FilterValue,
}

/// A user-created filter together with its widget placement.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedFilter {
    pub filter: Filter,
    pub widget: Option<Value>,
    pub morph_index: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    named: BTreeMap<String, NamedFilter>,
    chart_filters: BTreeMap<String, Filter>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, name: &str, filter: NamedFilter) {
        self.named.insert(name.to_string(), filter);
    }

    pub fn set_chart_filter(&mut self, chart_name: &str, filter: Filter) {
        self.chart_filters.insert(chart_name.to_string(), filter);
    }

    pub fn remove_chart_filter(&mut self, chart_name: &str) -> Option<Filter> {
        self.chart_filters.remove(chart_name)
    }

    pub fn named(&self) -> impl Iterator<Item = (&String, &NamedFilter)> {
        self.named.iter()
    }

    pub fn chart_filter(&self, chart_name: &str) -> Option<&Filter> {
        self.chart_filters.get(chart_name)
    }

    /// Resolves a filter reference: user-named filters first, then chart
    /// click filters.
    pub fn lookup(&self, name: &str) -> Option<&Filter> {
        self.named
            .get(name)
            .map(|f| &f.filter)
            .or_else(|| self.chart_filters.get(name))
    }

    /// The filter a change would target.
    pub fn target(&self, target: &FilterTarget) -> Option<&Filter> {
        match target {
            FilterTarget::Named(name) => self.named.get(name).map(|f| &f.filter),
            FilterTarget::Chart(name) => self.chart_filters.get(name),
        }
    }

    pub fn apply(&mut self, change: &FilterChange) -> Result<(), DashboardError> {
        let (name, filter) = match &change.target {
            FilterTarget::Named(name) => (
                name,
                self.named.get_mut(name).map(|f| &mut f.filter),
            ),
            FilterTarget::Chart(name) => (name, self.chart_filters.get_mut(name)),
        };
        let filter = filter.ok_or_else(|| DashboardError::UnknownFilter(name.clone()))?;
        filter.set_value(name, change.value.clone())
    }

    pub fn len(&self) -> usize {
        self.named.len()
    }

    pub fn clear(&mut self) {
        self.named.clear();
        self.chart_filters.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeParameters {
    pub min: f64,
    pub max: f64,
    pub increment: f64,
}

/// Largest power of ten not above `step`.
fn floor_power_of_ten(step: f64) -> f64 {
    let mut power = 10f64.powf(step.log10().floor());
    // log10 is inexact near exact powers of ten
    if power * 10.0 <= step {
        power *= 10.0;
    }
    while power > step {
        power /= 10.0;
    }
    power
}

/// Slider parameters for a numeric column: the extreme values and the
/// largest power of ten not above the tightest gap between values, or a
/// thousandth of the span if that is wider. Returns `None` when the column
/// has no numeric values.
pub fn compute_range_parameters(
    tables: &TableStore,
    column_name: &str,
    table_name: Option<&str>,
) -> Option<RangeParameters> {
    let mut numbers: Vec<f64> = tables
        .get_all_values(column_name, table_name)
        .iter()
        .filter_map(as_number)
        .collect();
    numbers.sort_by(f64::total_cmp);
    numbers.dedup();

    let min = *numbers.first()?;
    let max = *numbers.last()?;

    let floor_bound = (max - min) / 1000.0;
    let smallest_gap = numbers
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|gap| *gap > 0.0)
        .fold(f64::INFINITY, f64::min);

    let step = if smallest_gap.is_finite() {
        smallest_gap.max(floor_bound)
    } else {
        floor_bound
    };
    let increment = if step > 0.0 { floor_power_of_ten(step) } else { 1.0 };

    Some(RangeParameters { min, max, increment })
}
