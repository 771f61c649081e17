// View domain model and store
use super::error::DashboardError;
use super::filter::{Filter, FilterRegistry};
use super::table::{Column, Table, TableStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub table: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub filter_names: Vec<String>,
}

impl View {
    #[cfg(test)]
    pub fn new(table: &str, columns: &[&str], filter_names: &[&str]) -> Self {
        let mut view = Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            filter_names: Vec::new(),
        };
        for name in filter_names {
            view.add_filter_name(name);
        }
        view
    }

    /// Filter references behave as a set; duplicates are ignored.
    pub fn add_filter_name(&mut self, name: &str) {
        if !self.filter_names.iter().any(|n| n == name) {
            self.filter_names.push(name.to_string());
        }
    }

    /// The projection has to be non-empty and appear in the table in the
    /// same order.
    pub fn check_projection(&self, name: &str, table: &Table) -> Result<(), DashboardError> {
        let mut table_columns = table.column_names();
        let is_subsequence = self
            .columns
            .iter()
            .all(|wanted| table_columns.any(|c| c == wanted.as_str()));

        if self.columns.is_empty() || !is_subsequence {
            return Err(DashboardError::InvalidProjection {
                view: name.to_string(),
                table: self.table.clone(),
            });
        }
        Ok(())
    }
}

/// Rows of a table or view after filtering and projection, in original row
/// order. The first column is the category axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedData {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
    #[serde(skip)]
    pub active_filters: Vec<Filter>,
}

impl ResolvedData {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
            active_filters: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The full table, unfiltered. Unknown tables resolve to no data.
pub fn resolve_table(name: &str, tables: &TableStore) -> ResolvedData {
    match tables.get(name) {
        Some(table) => ResolvedData {
            name: name.to_string(),
            columns: table.columns.clone(),
            rows: table.rows.clone(),
            active_filters: Vec::new(),
        },
        None => ResolvedData::empty(name),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewStore {
    views: BTreeMap<String, View>,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_view(&mut self, name: &str, mut view: View) {
        for filter_name in std::mem::take(&mut view.filter_names) {
            view.add_filter_name(&filter_name);
        }
        self.views.insert(name.to_string(), view);
    }

    pub fn get(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &View)> {
        self.views.iter()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn clear(&mut self) {
        self.views.clear();
    }

    /// Filters the view's table by every valid filter it references (a
    /// logical AND) and projects the surviving rows onto the view's columns.
    ///
    /// Unknown views and views over missing tables resolve to no data.
    /// Filter references that are unresolved, invalid, or name a column the
    /// table lacks contribute no constraint, as do projected columns the
    /// table lacks.
    pub fn resolve(&self, name: &str, tables: &TableStore, filters: &FilterRegistry) -> ResolvedData {
        let Some(view) = self.views.get(name) else {
            return ResolvedData::empty(name);
        };
        let Some(table) = tables.get(&view.table) else {
            return ResolvedData::empty(name);
        };

        let constraints: Vec<(usize, &Filter)> = view
            .filter_names
            .iter()
            .filter_map(|filter_name| filters.lookup(filter_name))
            .filter(|filter| filter.is_valid())
            .filter_map(|filter| {
                table
                    .column_index(filter.column_name())
                    .map(|index| (index, filter))
            })
            .collect();

        let projection: Vec<usize> = view
            .columns
            .iter()
            .filter_map(|c| table.column_index(c))
            .collect();

        let rows = table
            .rows
            .iter()
            .filter(|row| {
                constraints
                    .iter()
                    .all(|(index, filter)| row.get(*index).is_some_and(|cell| filter.matches(cell)))
            })
            .map(|row| {
                projection
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        ResolvedData {
            name: name.to_string(),
            columns: projection.iter().map(|&i| table.columns[i].clone()).collect(),
            rows,
            active_filters: constraints.into_iter().map(|(_, f)| f.clone()).collect(),
        }
    }
}
