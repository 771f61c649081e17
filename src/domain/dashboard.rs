// Dashboard aggregate - owns the table, view, filter and chart stores
use super::chart::{Chart, ChartStore, DrawRequest, chart_title};
use super::descriptor::{ChartSpec, DashboardDescriptor, Fill, FilterSpec, RestoreTask};
use super::error::DashboardError;
use super::filter::{Filter, FilterChange, FilterRegistry, FilterTarget, FilterValue, NamedFilter};
use super::table::{Table, TableStore};
use super::view::{ResolvedData, View, ViewStore, resolve_table};
use serde::Serialize;
use serde_json::Value;

/// A visual element the host places on the dashboard canvas, in paint order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum VisualElement {
    FilterWidget {
        name: String,
        filter: Filter,
        widget: Option<Value>,
        morph_index: u64,
    },
    Chart {
        name: String,
        chart_type: String,
        morph_index: u64,
    },
    Free {
        spec: Value,
        morph_index: u64,
    },
}

impl VisualElement {
    pub fn morph_index(&self) -> u64 {
        match self {
            VisualElement::FilterWidget { morph_index, .. }
            | VisualElement::Chart { morph_index, .. }
            | VisualElement::Free { morph_index, .. } => *morph_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStatus {
    pub tables: usize,
    pub views: usize,
    pub filters: usize,
    pub charts: usize,
    pub morphs: usize,
    pub dirty: bool,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    tables: TableStore,
    views: ViewStore,
    filters: FilterRegistry,
    charts: ChartStore,
    fill: Option<Fill>,
    morphs: Vec<Value>,
    next_morph_index: u64,
    dirty: bool,
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            tables: TableStore::new(),
            views: ViewStore::new(),
            filters: FilterRegistry::new(),
            charts: ChartStore::new(),
            fill: None,
            morphs: Vec::new(),
            next_morph_index: 0,
            dirty: false,
        }
    }

    pub fn tables(&self) -> &TableStore {
        &self.tables
    }

    #[cfg(test)]
    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn charts(&self) -> &ChartStore {
        &self.charts
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn status(&self) -> DashboardStatus {
        DashboardStatus {
            tables: self.tables.len(),
            views: self.views.len(),
            filters: self.filters.len(),
            charts: self.charts.len(),
            morphs: self.morphs.len(),
            dirty: self.dirty,
        }
    }

    pub fn clear(&mut self) {
        self.tables.clear();
        self.views.clear();
        self.filters.clear();
        self.charts.clear();
        self.fill = None;
        self.morphs.clear();
        self.next_morph_index = 0;
    }

    /// Next free morph index, or the stored one when restoring.
    fn claim_morph_index(&mut self, stored: Option<u64>) -> u64 {
        let index = stored.unwrap_or(self.next_morph_index);
        self.next_morph_index = self.next_morph_index.max(index.saturating_add(1));
        index
    }

    pub fn add_table(&mut self, name: &str, table: Table) -> Result<(), DashboardError> {
        self.tables.add_table(name, table)?;
        self.dirty = true;
        Ok(())
    }

    pub fn add_view(&mut self, name: &str, view: View) -> Result<(), DashboardError> {
        let table = self
            .tables
            .get(&view.table)
            .ok_or_else(|| DashboardError::UnknownTable(view.table.clone()))?;
        view.check_projection(name, table)?;
        self.views.add_view(name, view);
        self.dirty = true;
        Ok(())
    }

    pub fn add_filter(&mut self, name: &str, filter: Filter, widget: Option<Value>) -> VisualElement {
        self.insert_filter(name, filter, widget, None)
    }

    fn insert_filter(
        &mut self,
        name: &str,
        filter: Filter,
        widget: Option<Value>,
        stored_index: Option<u64>,
    ) -> VisualElement {
        let morph_index = self.claim_morph_index(stored_index);
        self.filters.add_filter(
            name,
            NamedFilter {
                filter: filter.clone(),
                widget: widget.clone(),
                morph_index: Some(morph_index),
            },
        );
        self.dirty = true;
        VisualElement::FilterWidget {
            name: name.to_string(),
            filter,
            widget,
            morph_index,
        }
    }

    pub fn add_chart(&mut self, name: &str, chart: Chart) -> Result<VisualElement, DashboardError> {
        self.insert_chart(name, ChartSpec { chart, filter: None })
    }

    /// Stores a chart together with its click filter. A supplied filter is
    /// kept; otherwise a select filter over the category column is seeded
    /// with the column's first value.
    fn insert_chart(&mut self, name: &str, spec: ChartSpec) -> Result<VisualElement, DashboardError> {
        let ChartSpec { mut chart, filter } = spec;
        let click_filter = match filter {
            Some(filter) => filter,
            None => self.seed_click_filter(&chart.view_or_table)?,
        };

        let morph_index = self.claim_morph_index(chart.morph_index);
        chart.morph_index = Some(morph_index);
        let chart_type = chart.chart_type.clone();

        self.filters.set_chart_filter(name, click_filter);
        self.charts.add_chart(name, chart);
        self.dirty = true;

        Ok(VisualElement::Chart {
            name: name.to_string(),
            chart_type,
            morph_index,
        })
    }

    fn seed_click_filter(&self, view_or_table: &str) -> Result<Filter, DashboardError> {
        let (table_name, category) = if let Some(view) = self.views.get(view_or_table) {
            (view.table.as_str(), view.columns.first())
        } else if let Some(table) = self.tables.get(view_or_table) {
            (view_or_table, table.columns.first().map(|c| &c.name))
        } else {
            return Err(DashboardError::UnknownDataSource(view_or_table.to_string()));
        };

        let category = category.map(String::as_str).unwrap_or_default();
        let first = self
            .tables
            .get_all_values(category, Some(table_name))
            .into_iter()
            .next();
        Ok(Filter::select(category, first))
    }

    pub fn remove_chart(&mut self, name: &str) -> Result<(), DashboardError> {
        self.charts
            .remove(name)
            .ok_or_else(|| DashboardError::UnknownChart(name.to_string()))?;
        self.filters.remove_chart_filter(name);
        self.dirty = true;
        Ok(())
    }

    /// Adds a free visual element. A `morphIndex` already on the element is
    /// kept.
    pub fn add_morph(&mut self, mut spec: Value) -> VisualElement {
        let stored = spec.get("morphIndex").and_then(Value::as_u64);
        let morph_index = self.claim_morph_index(stored);
        if let Some(object) = spec.as_object_mut() {
            object.insert("morphIndex".to_string(), Value::from(morph_index));
        }
        self.morphs.push(spec.clone());
        self.dirty = true;
        VisualElement::Free { spec, morph_index }
    }

    pub fn set_fill(&mut self, fill: Option<Fill>) {
        self.fill = fill;
        self.dirty = true;
    }

    /// Resolves a view, or failing that a table, into chartable data.
    pub fn resolve(&self, view_or_table: &str) -> ResolvedData {
        if self.views.contains(view_or_table) {
            self.views.resolve(view_or_table, &self.tables, &self.filters)
        } else {
            resolve_table(view_or_table, &self.tables)
        }
    }

    /// Resolves a chart's data source and refreshes its generated title. The
    /// returned request owns its data, so rendering needs no access to the
    /// stores.
    pub fn prepare_draw(&mut self, name: &str) -> Result<DrawRequest, DashboardError> {
        let chart = self
            .charts
            .get(name)
            .ok_or_else(|| DashboardError::UnknownChart(name.to_string()))?;
        let data = self.resolve(&chart.view_or_table);
        let title = chart_title(&chart.chart_type, &data);

        let chart = self
            .charts
            .get_mut(name)
            .ok_or_else(|| DashboardError::UnknownChart(name.to_string()))?;
        if let Some(title) = title {
            chart.options.insert("title".to_string(), Value::String(title));
        }

        Ok(DrawRequest {
            chart_name: name.to_string(),
            chart_type: chart.chart_type.clone(),
            options: chart.options.clone(),
            data,
        })
    }

    pub fn apply_filter_change(&mut self, change: &FilterChange) -> Result<(), DashboardError> {
        self.filters.apply(change)?;
        self.dirty = true;
        Ok(())
    }

    /// The change a value sent to a named filter makes, read against that
    /// filter's kind.
    pub fn named_filter_change(&self, name: &str, raw: Value) -> Result<FilterChange, DashboardError> {
        let target = FilterTarget::Named(name.to_string());
        let filter = self
            .filters
            .target(&target)
            .ok_or_else(|| DashboardError::UnknownFilter(name.to_string()))?;
        let value = FilterValue::for_filter(name, filter, raw)?;
        Ok(FilterChange { target, value })
    }

    /// The change a click on `row` of a chart makes: its click filter takes
    /// the row's category value.
    pub fn chart_selection(&self, name: &str, row: usize) -> Result<FilterChange, DashboardError> {
        let chart = self
            .charts
            .get(name)
            .ok_or_else(|| DashboardError::UnknownChart(name.to_string()))?;
        let data = self.resolve(&chart.view_or_table);
        let cell = data
            .rows
            .get(row)
            .and_then(|r| r.first())
            .cloned()
            .ok_or_else(|| DashboardError::RowOutOfRange {
                chart: name.to_string(),
                row,
            })?;

        Ok(FilterChange {
            target: FilterTarget::Chart(name.to_string()),
            value: FilterValue::Select(cell),
        })
    }

    pub fn save(&self) -> DashboardDescriptor {
        let tables = self
            .tables
            .iter()
            .map(|(name, table)| (name.clone(), table.clone()))
            .collect();
        let views = self
            .views
            .iter()
            .map(|(name, view)| (name.clone(), view.clone()))
            .collect();
        let filters = self
            .filters
            .named()
            .map(|(name, named)| {
                let spec = FilterSpec {
                    filter: named.filter.clone(),
                    widget: named.widget.clone(),
                    morph_index: named.morph_index,
                };
                (name.clone(), spec)
            })
            .collect();
        let charts = self
            .charts
            .iter()
            .map(|(name, chart)| {
                let spec = ChartSpec {
                    chart: chart.clone(),
                    filter: self.filters.chart_filter(name).cloned(),
                };
                (name.clone(), spec)
            })
            .collect();

        let num_morphs = self.filters.len() + self.charts.len() + self.morphs.len();
        DashboardDescriptor {
            tables,
            views,
            filters,
            charts,
            fill: self.fill.clone(),
            morphs: self.morphs.clone(),
            num_morphs: num_morphs as u64,
        }
    }

    /// Loads restored tables and views as stored. Views are not checked
    /// against their tables; dangling references resolve to no data. Returns
    /// the tables that were rejected.
    pub fn load_data(
        &mut self,
        tables: Vec<(String, Table)>,
        views: Vec<(String, View)>,
        fill: Option<Fill>,
    ) -> Vec<DashboardError> {
        let mut rejected = Vec::new();
        for (name, table) in tables {
            if let Err(e) = self.tables.add_table(&name, table) {
                rejected.push(e);
            }
        }
        for (name, view) in views {
            self.views.add_view(&name, view);
        }
        self.fill = fill;
        rejected
    }

    /// Instantiates one restored visual element under its stored morph index.
    pub fn restore_element(&mut self, task: RestoreTask) -> Result<VisualElement, DashboardError> {
        match task {
            RestoreTask::Filter { name, spec } => {
                Ok(self.insert_filter(&name, spec.filter, spec.widget, spec.morph_index))
            }
            RestoreTask::Chart { name, spec } => self.insert_chart(&name, spec),
            RestoreTask::Morph(spec) => Ok(self.add_morph(spec)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::descriptor::{RestorePlan, validate_descriptor};
    use crate::domain::table::{Column, ColumnType};
    use serde_json::json;

    fn dashboard() -> Dashboard {
        let mut dashboard = Dashboard::new();
        dashboard
            .add_table(
                "sales",
                Table::new(
                    vec![
                        Column::new("state", ColumnType::String),
                        Column::new("year", ColumnType::Number),
                        Column::new("sales", ColumnType::Number),
                    ],
                    vec![
                        vec![json!("Ohio"), json!(2020), json!(3)],
                        vec![json!("Iowa"), json!(2020), json!(5)],
                        vec![json!("Utah"), json!(2021), json!(8)],
                    ],
                ),
            )
            .unwrap();
        dashboard
            .add_view("by_state", View::new("sales", &["state", "sales"], &["year_filter"]))
            .unwrap();
        dashboard
    }

    #[test]
    fn test_add_view_checks_references() {
        let mut dashboard = dashboard();
        assert_eq!(
            dashboard.add_view("v", View::new("nope", &["state"], &[])),
            Err(DashboardError::UnknownTable("nope".to_string()))
        );
        assert!(matches!(
            dashboard.add_view("v", View::new("sales", &["region"], &[])),
            Err(DashboardError::InvalidProjection { .. })
        ));
    }

    #[test]
    fn test_mutations_mark_dirty() {
        let mut dashboard = dashboard();
        assert!(dashboard.status().dirty);
        dashboard.mark_clean();
        assert!(!dashboard.status().dirty);

        dashboard.add_filter("year_filter", Filter::select("year", None), None);
        assert!(dashboard.status().dirty);
    }

    #[test]
    fn test_add_chart_seeds_click_filter() {
        let mut dashboard = dashboard();
        dashboard.add_chart("bars", Chart::new("ColumnChart", "by_state")).unwrap();

        let filter = dashboard.filters().chart_filter("bars").unwrap();
        assert_eq!(filter, &Filter::select("state", Some(json!("Iowa"))));

        assert_eq!(
            dashboard.add_chart("lost", Chart::new("PieChart", "missing")),
            Err(DashboardError::UnknownDataSource("missing".to_string()))
        );
    }

    #[test]
    fn test_morph_indices_follow_creation_order() {
        let mut dashboard = dashboard();
        let first = dashboard.add_filter("year_filter", Filter::select("year", None), None);
        let second = dashboard.add_chart("bars", Chart::new("ColumnChart", "sales")).unwrap();
        let third = dashboard.add_morph(json!({"kind": "label", "text": "Sales"}));

        assert_eq!(
            [first.morph_index(), second.morph_index(), third.morph_index()],
            [0, 1, 2]
        );
    }

    #[test]
    fn test_prepare_draw_sets_title() {
        let mut dashboard = dashboard();
        dashboard.add_filter("year_filter", Filter::select("year", Some(json!(2020))), None);
        dashboard.add_chart("bars", Chart::new("ColumnChart", "by_state")).unwrap();

        let request = dashboard.prepare_draw("bars").unwrap();
        assert_eq!(request.data.rows.len(), 2);
        assert_eq!(
            request.options.get("title"),
            Some(&json!("sales v state where year = 2020"))
        );
        assert_eq!(
            dashboard.charts().get("bars").unwrap().title(),
            Some("sales v state where year = 2020")
        );
    }

    #[test]
    fn test_chart_selection_reads_category_cell() {
        let mut dashboard = dashboard();
        dashboard.add_chart("bars", Chart::new("ColumnChart", "by_state")).unwrap();

        let change = dashboard.chart_selection("bars", 2).unwrap();
        assert_eq!(change.target, FilterTarget::Chart("bars".to_string()));
        assert_eq!(change.value, FilterValue::Select(json!("Utah")));

        assert!(matches!(
            dashboard.chart_selection("bars", 9),
            Err(DashboardError::RowOutOfRange { row: 9, .. })
        ));
    }

    #[test]
    fn test_chart_click_filter_drives_views() {
        let mut dashboard = dashboard();
        dashboard.add_chart("pie", Chart::new("PieChart", "sales")).unwrap();
        dashboard
            .add_view("picked", View::new("sales", &["state", "sales"], &["pie"]))
            .unwrap();

        let change = dashboard.chart_selection("pie", 0).unwrap();
        dashboard.apply_filter_change(&change).unwrap();

        let data = dashboard.resolve("picked");
        assert_eq!(data.rows, vec![vec![json!("Ohio"), json!(3)]]);

        dashboard.remove_chart("pie").unwrap();
        assert_eq!(dashboard.resolve("picked").rows.len(), 3);
    }

    #[test]
    fn test_save_is_a_valid_descriptor() {
        let mut dashboard = dashboard();
        dashboard.add_filter("year_filter", Filter::range("year", 2020.0, 2020.0), None);
        dashboard.add_chart("bars", Chart::new("ColumnChart", "by_state")).unwrap();
        dashboard.add_morph(json!({"kind": "label"}));
        dashboard.set_fill(Some(Fill::Rgba { r: 1.0, g: 1.0, b: 1.0, a: 1.0 }));

        let saved = serde_json::to_value(dashboard.save()).unwrap();
        assert!(validate_descriptor(&saved).valid);
        assert_eq!(saved["numMorphs"], json!(3));
        assert_eq!(saved["charts"]["bars"]["filter"]["kind"], json!("select"));
        assert_eq!(saved["filters"]["year_filter"]["morphIndex"], json!(0));
    }

    #[test]
    fn test_restore_elements_keep_indices() {
        let mut original = dashboard();
        original.add_filter("year_filter", Filter::select("year", Some(json!(2021))), None);
        original.add_chart("bars", Chart::new("ColumnChart", "by_state")).unwrap();
        let saved = serde_json::to_value(original.save()).unwrap();

        let plan = RestorePlan::from_descriptor(saved.as_object().unwrap());
        let mut restored = Dashboard::new();
        assert!(restored.load_data(plan.tables, plan.views, plan.fill).is_empty());
        for task in plan.tasks {
            restored.restore_element(task).unwrap();
        }

        assert_eq!(restored.save(), original.save());
        let late = restored.add_morph(json!({}));
        assert_eq!(late.morph_index(), 2);
    }
}
