// Table domain model and store
use super::error::DashboardError;
use super::value::sort_dedup;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    Date,
    Datetime,
    Timeofday,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    #[cfg(test)]
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    #[cfg(test)]
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Checks the structural constraints: at least one column, unique column
    /// names, and every row as wide as the column list. Cell types are not
    /// checked against the declared column type.
    pub fn validate(&self, name: &str) -> Result<(), DashboardError> {
        if self.columns.is_empty() {
            return Err(DashboardError::NoColumns(name.to_string()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DashboardError::DuplicateColumn {
                    table: name.to_string(),
                    column: column.name.clone(),
                });
            }
        }

        for (row, values) in self.rows.iter().enumerate() {
            if values.len() != self.columns.len() {
                return Err(DashboardError::RowLength {
                    table: name.to_string(),
                    row,
                    expected: self.columns.len(),
                    actual: values.len(),
                });
            }
        }

        Ok(())
    }

    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column_name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Distinct values of one column, ascending.
    pub fn column_values(&self, index: usize) -> Vec<Value> {
        let mut values: Vec<Value> = self
            .rows
            .iter()
            .filter_map(|row| row.get(index).cloned())
            .collect();
        sort_dedup(&mut values);
        values
    }
}

/// A column together with the table it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRecord {
    pub table_name: String,
    pub index: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, Default)]
pub struct TableStore {
    tables: BTreeMap<String, Table>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any table already stored under `name`.
    pub fn add_table(&mut self, name: &str, table: Table) -> Result<(), DashboardError> {
        table.validate(name)?;
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Table)> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }

    /// Distinct values, ascending, of every column named `column_name` in
    /// every table (or only in `table_name` when given).
    pub fn get_all_values(&self, column_name: &str, table_name: Option<&str>) -> Vec<Value> {
        let mut values = Vec::new();
        for (name, table) in &self.tables {
            if table_name.is_some_and(|wanted| wanted != name) {
                continue;
            }
            for (index, column) in table.columns.iter().enumerate() {
                if column.name == column_name {
                    values.extend(table.column_values(index));
                }
            }
        }
        sort_dedup(&mut values);
        values
    }

    pub fn all_columns(&self) -> Vec<ColumnRecord> {
        self.tables
            .iter()
            .flat_map(|(table_name, table)| {
                table
                    .columns
                    .iter()
                    .enumerate()
                    .map(move |(index, column)| ColumnRecord {
                        table_name: table_name.clone(),
                        index,
                        name: column.name.clone(),
                        column_type: column.column_type,
                    })
            })
            .collect()
    }

    pub fn all_columns_of_type(&self, types: &[ColumnType]) -> Vec<ColumnRecord> {
        self.all_columns()
            .into_iter()
            .filter(|c| types.contains(&c.column_type))
            .collect()
    }
}
