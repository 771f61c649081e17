// Dashboard service - Use cases over the shared dashboard
use crate::application::dashboard_host::{DashboardHost, UpdateListener};
use crate::application::resource_fetcher::ResourceFetcher;
use crate::domain::chart::Chart;
use crate::domain::dashboard::{Dashboard, DashboardStatus, VisualElement};
use crate::domain::descriptor::{
    DashboardDescriptor, Fill, RestorePlan, Validation, validate_descriptor,
};
use crate::domain::error::DashboardError;
use crate::domain::filter::{Filter, FilterChange, RangeParameters, compute_range_parameters};
use crate::domain::table::{ColumnRecord, ColumnType, Table};
use crate::domain::view::{ResolvedData, View};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Counts of visual elements instantiated and skipped by a restore.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RestoreReport {
    pub restored: usize,
    pub failed: usize,
}

/// Clears the restore flag when a restore ends, however it ends.
struct RestoreGuard {
    flag: Arc<AtomicBool>,
}

impl RestoreGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, DashboardError> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(DashboardError::RestoreInProgress);
        }
        Ok(Self { flag: flag.clone() })
    }
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct DashboardService {
    dashboard: Arc<Mutex<Dashboard>>,
    host: Arc<dyn DashboardHost>,
    fetcher: Arc<dyn ResourceFetcher>,
    listener: Option<Arc<dyn UpdateListener>>,
    restoring: Arc<AtomicBool>,
}

impl DashboardService {
    pub fn new(host: Arc<dyn DashboardHost>, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            dashboard: Arc::new(Mutex::new(Dashboard::new())),
            host,
            fetcher,
            listener: None,
            restoring: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn UpdateListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    fn notify(&self) {
        if let Some(listener) = &self.listener {
            listener.update();
        }
    }

    async fn place(&self, element: &VisualElement) {
        if let Err(e) = self.host.place_element(element).await {
            tracing::error!("Error placing element {}: {:#}", element.morph_index(), e);
        }
    }

    pub async fn status(&self) -> DashboardStatus {
        self.dashboard.lock().await.status()
    }

    pub async fn add_table(&self, name: &str, table: Table) -> Result<(), DashboardError> {
        self.dashboard.lock().await.add_table(name, table)?;
        tracing::debug!("Added table {}", name);
        self.notify();
        Ok(())
    }

    pub async fn add_view(&self, name: &str, view: View) -> Result<(), DashboardError> {
        self.dashboard.lock().await.add_view(name, view)?;
        tracing::debug!("Added view {}", name);
        self.notify();
        Ok(())
    }

    /// Adds or replaces a named filter. Views may already reference the
    /// name, so every chart is redrawn.
    pub async fn add_filter(&self, name: &str, filter: Filter, widget: Option<Value>) {
        let element = self.dashboard.lock().await.add_filter(name, filter, widget);
        self.notify();
        self.place(&element).await;
        self.draw_all_charts().await;
    }

    /// Creates a chart, draws it, and optionally opens its editor.
    pub async fn add_chart(
        &self,
        name: &str,
        chart: Chart,
        edit_after_create: bool,
    ) -> Result<(), DashboardError> {
        let element = self.dashboard.lock().await.add_chart(name, chart)?;
        self.notify();
        self.place(&element).await;
        self.draw_chart(name).await?;

        if edit_after_create {
            if let Err(e) = self.host.edit_chart(name).await {
                tracing::error!("Error opening editor for chart {}: {:#}", name, e);
            }
        }
        Ok(())
    }

    /// Drops a chart and its click filter, then redraws the remaining charts
    /// since views may have referenced that filter.
    pub async fn remove_chart(&self, name: &str) -> Result<(), DashboardError> {
        self.dashboard.lock().await.remove_chart(name)?;
        self.notify();
        if let Err(e) = self.host.remove_element(name).await {
            tracing::error!("Error removing chart {}: {:#}", name, e);
        }
        self.draw_all_charts().await;
        Ok(())
    }

    pub async fn get_all_values(&self, column_name: &str, table_name: Option<&str>) -> Vec<Value> {
        self.dashboard
            .lock()
            .await
            .tables()
            .get_all_values(column_name, table_name)
    }

    pub async fn all_columns(&self) -> Vec<ColumnRecord> {
        self.dashboard.lock().await.tables().all_columns()
    }

    pub async fn all_columns_of_type(&self, types: &[ColumnType]) -> Vec<ColumnRecord> {
        self.dashboard.lock().await.tables().all_columns_of_type(types)
    }

    pub async fn range_parameters(
        &self,
        column_name: &str,
        table_name: Option<&str>,
    ) -> Option<RangeParameters> {
        let dashboard = self.dashboard.lock().await;
        compute_range_parameters(dashboard.tables(), column_name, table_name)
    }

    /// Adds a stepped numeric slider spanning the values of a column.
    pub async fn add_numeric_filter(
        &self,
        name: &str,
        column_name: &str,
        table_name: Option<&str>,
    ) -> Result<RangeParameters, DashboardError> {
        let parameters = self
            .range_parameters(column_name, table_name)
            .await
            .ok_or_else(|| DashboardError::NoNumericValues(column_name.to_string()))?;
        self.add_filter(name, Filter::numeric_select(column_name, &parameters), None)
            .await;
        Ok(parameters)
    }

    pub async fn set_fill(&self, fill: Option<Fill>) {
        self.dashboard.lock().await.set_fill(fill);
        self.notify();
    }

    pub async fn resolve(&self, view_or_table: &str) -> ResolvedData {
        self.dashboard.lock().await.resolve(view_or_table)
    }

    /// Re-resolves a chart's data and hands it to the renderer. The store
    /// lock is released before rendering; renderer failures are logged.
    pub async fn draw_chart(&self, name: &str) -> Result<(), DashboardError> {
        let request = self.dashboard.lock().await.prepare_draw(name)?;
        tracing::debug!(
            "Drawing chart {} with {} rows",
            name,
            request.data.rows.len()
        );

        if let Err(e) = self.host.draw_chart(request).await {
            tracing::error!("Error drawing chart {}: {:#}", name, e);
        }
        Ok(())
    }

    pub async fn draw_all_charts(&self) {
        let names = self.dashboard.lock().await.charts().names();
        for name in names {
            if let Err(e) = self.draw_chart(&name).await {
                tracing::warn!("Skipping redraw of chart {}: {}", name, e);
            }
        }
    }

    /// Applies a filter change and redraws every chart once before
    /// returning.
    pub async fn change_filter(&self, change: FilterChange) -> Result<(), DashboardError> {
        self.dashboard.lock().await.apply_filter_change(&change)?;
        self.notify();
        self.draw_all_charts().await;
        Ok(())
    }

    /// Sets a named filter from a client value: `{min, max}` for range
    /// filters, any JSON value for select filters.
    pub async fn set_filter_value(&self, name: &str, value: Value) -> Result<(), DashboardError> {
        let change = self.dashboard.lock().await.named_filter_change(name, value)?;
        self.change_filter(change).await
    }

    /// Handles a click on a chart row: the chart's click filter takes the
    /// row's category value.
    pub async fn select_chart_row(&self, name: &str, row: usize) -> Result<(), DashboardError> {
        let change = self.dashboard.lock().await.chart_selection(name, row)?;
        self.change_filter(change).await
    }

    pub async fn save(&self) -> DashboardDescriptor {
        self.dashboard.lock().await.save()
    }

    /// The persisted file contents. Clears the dirty flag.
    pub async fn save_to_string(&self) -> serde_json::Result<String> {
        let mut dashboard = self.dashboard.lock().await;
        let text = serde_json::to_string_pretty(&dashboard.save())?;
        dashboard.mark_clean();
        Ok(text)
    }

    /// Replaces the whole dashboard with a validated descriptor.
    ///
    /// Tables and views load first. Filters, charts and free elements are
    /// then instantiated one at a time in morph-index order, each placed
    /// before the next starts. Element failures are logged and skipped, and
    /// the container is refitted regardless.
    pub async fn restore(&self, descriptor: &Map<String, Value>) -> Result<RestoreReport, DashboardError> {
        let _guard = RestoreGuard::acquire(&self.restoring)?;
        let plan = RestorePlan::from_descriptor(descriptor);
        for problem in &plan.skipped {
            tracing::warn!("Skipping unreadable descriptor entry: {}", problem);
        }

        let tasks = {
            let mut dashboard = self.dashboard.lock().await;
            dashboard.clear();
            for e in dashboard.load_data(plan.tables, plan.views, plan.fill) {
                tracing::warn!("Skipping table: {}", e);
            }
            plan.tasks
        };
        if let Err(e) = self.host.clear_canvas().await {
            tracing::error!("Error clearing dashboard canvas: {:#}", e);
        }

        let mut report = RestoreReport::default();
        let mut charts = Vec::new();
        for task in tasks {
            let description = task.describe();
            let restored = self.dashboard.lock().await.restore_element(task);
            match restored {
                Ok(element) => {
                    tracing::debug!("Restoring {} at {}", description, element.morph_index());
                    if let VisualElement::Chart { name, .. } = &element {
                        charts.push(name.clone());
                    }
                    match self.host.place_element(&element).await {
                        Ok(()) => report.restored += 1,
                        Err(e) => {
                            tracing::error!("Error restoring {}: {:#}", description, e);
                            report.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Error restoring {}: {}", description, e);
                    report.failed += 1;
                }
            }
        }

        for name in charts {
            if let Err(e) = self.draw_chart(&name).await {
                tracing::warn!("Skipping draw of restored chart {}: {}", name, e);
            }
        }

        if let Err(e) = self.host.fit_to_contents().await {
            tracing::error!("Error fitting dashboard to its contents: {:#}", e);
        }

        self.dashboard.lock().await.mark_clean();
        self.notify();
        tracing::info!(
            "Restored dashboard: {} elements, {} failed",
            report.restored,
            report.failed
        );
        Ok(report)
    }

    /// Parses, validates and restores a descriptor. Never fails: problems
    /// come back as an invalid result.
    pub async fn load_from_str(&self, text: &str) -> Validation {
        match serde_json::from_str(text) {
            Ok(descriptor) => self.load_value(descriptor).await,
            Err(e) => Validation::invalid(format!("Invalid JSON: {}", e)),
        }
    }

    pub async fn load_from_url(&self, url: &str) -> Validation {
        tracing::debug!("Loading dashboard from {}", url);
        let validation = match self.fetcher.read_json(url).await {
            Ok(descriptor) => self.load_value(descriptor).await,
            Err(e) => match e.downcast_ref::<serde_json::Error>() {
                Some(parse_error) => Validation::invalid(format!("Invalid JSON: {}", parse_error)),
                None => Validation::invalid(format!("Could not fetch {}: {:#}", url, e)),
            },
        };

        if let Some(message) = &validation.message {
            tracing::warn!("Dashboard {} not loaded: {}", url, message);
        }
        validation
    }

    async fn load_value(&self, descriptor: Value) -> Validation {
        let validation = validate_descriptor(&descriptor);
        let Some(object) = descriptor.as_object().filter(|_| validation.valid) else {
            return validation;
        };

        match self.restore(object).await {
            Ok(_) => Validation::ok(),
            Err(e) => Validation::invalid(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::DrawRequest;
    use crate::domain::table::Column;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingHost {
        events: StdMutex<Vec<String>>,
        draws: StdMutex<Vec<DrawRequest>>,
        fail_charts: bool,
    }

    impl RecordingHost {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn draws_of(&self, chart: &str) -> Vec<DrawRequest> {
            self.draws
                .lock()
                .unwrap()
                .iter()
                .filter(|d| d.chart_name == chart)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl DashboardHost for RecordingHost {
        async fn draw_chart(&self, request: DrawRequest) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(format!("draw {}", request.chart_name));
            self.draws.lock().unwrap().push(request);
            Ok(())
        }

        async fn place_element(&self, element: &VisualElement) -> anyhow::Result<()> {
            // yield so a racing task could interleave if ordering were not enforced
            tokio::task::yield_now().await;
            let label = match element {
                VisualElement::FilterWidget { name, .. } => format!("place filter {}", name),
                VisualElement::Chart { name, .. } => {
                    if self.fail_charts {
                        anyhow::bail!("renderer not loaded");
                    }
                    format!("place chart {}", name)
                }
                VisualElement::Free { morph_index, .. } => format!("place free {}", morph_index),
            };
            self.events.lock().unwrap().push(label);
            Ok(())
        }

        async fn remove_element(&self, name: &str) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(format!("remove {}", name));
            Ok(())
        }

        async fn clear_canvas(&self) -> anyhow::Result<()> {
            self.events.lock().unwrap().push("clear".to_string());
            Ok(())
        }

        async fn edit_chart(&self, name: &str) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(format!("edit {}", name));
            Ok(())
        }

        async fn fit_to_contents(&self) -> anyhow::Result<()> {
            self.events.lock().unwrap().push("fit".to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MapFetcher {
        documents: HashMap<String, String>,
    }

    #[async_trait]
    impl ResourceFetcher for MapFetcher {
        async fn read_text(&self, url: &str) -> anyhow::Result<String> {
            self.documents
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("404 Not Found"))
        }
    }

    #[derive(Default)]
    struct CountingListener {
        updates: AtomicUsize,
    }

    impl UpdateListener for CountingListener {
        fn update(&self) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn service_with(host: Arc<RecordingHost>, fetcher: MapFetcher) -> DashboardService {
        DashboardService::new(host, Arc::new(fetcher))
    }

    fn sales() -> Table {
        Table::new(
            vec![
                Column::new("state", ColumnType::String),
                Column::new("year", ColumnType::Number),
                Column::new("sales", ColumnType::Number),
            ],
            vec![
                vec![json!("Ohio"), json!(2020), json!(3)],
                vec![json!("Iowa"), json!(2021), json!(5)],
                vec![json!("Utah"), json!(2021), json!(8)],
            ],
        )
    }

    async fn populated(host: Arc<RecordingHost>) -> DashboardService {
        let service = service_with(host, MapFetcher::default());
        service.add_table("sales", sales()).await.unwrap();
        service
            .add_view("by_state", View::new("sales", &["state", "sales"], &["year"]))
            .await
            .unwrap();
        service
            .add_filter("year", Filter::select("year", Some(json!(2021))), None)
            .await;
        service
    }

    #[tokio::test]
    async fn test_add_chart_draws_and_edits() {
        let host = Arc::new(RecordingHost::default());
        let service = populated(host.clone()).await;

        service
            .add_chart("bars", Chart::new("ColumnChart", "by_state"), true)
            .await
            .unwrap();

        assert_eq!(
            host.events(),
            vec!["place filter year", "place chart bars", "draw bars", "edit bars"]
        );
        let draw = &host.draws_of("bars")[0];
        assert_eq!(draw.data.rows.len(), 2);
        assert_eq!(
            draw.options.get("title"),
            Some(&json!("sales v state where year = 2021"))
        );
    }

    #[tokio::test]
    async fn test_filter_change_redraws_each_chart_once() {
        let host = Arc::new(RecordingHost::default());
        let service = populated(host.clone()).await;
        service
            .add_chart("bars", Chart::new("ColumnChart", "by_state"), false)
            .await
            .unwrap();
        service
            .add_chart("pie", Chart::new("PieChart", "by_state"), false)
            .await
            .unwrap();

        service
            .set_filter_value("year", json!(2020))
            .await
            .unwrap();

        for chart in ["bars", "pie"] {
            let draws = host.draws_of(chart);
            // one draw on creation, one for the change
            assert_eq!(draws.len(), 2, "chart {}", chart);
            assert_eq!(draws[1].data.rows, vec![vec![json!("Ohio"), json!(3)]]);
        }
    }

    #[tokio::test]
    async fn test_chart_click_filters_other_views() {
        let host = Arc::new(RecordingHost::default());
        let service = populated(host.clone()).await;
        service
            .add_chart("picker", Chart::new("PieChart", "sales"), false)
            .await
            .unwrap();
        service
            .add_view("picked", View::new("sales", &["state", "year"], &["picker"]))
            .await
            .unwrap();
        service
            .add_chart("detail", Chart::new("Table", "picked"), false)
            .await
            .unwrap();

        service.select_chart_row("picker", 2).await.unwrap();

        let last = host.draws_of("detail").pop().unwrap();
        assert_eq!(last.data.rows, vec![vec![json!("Utah"), json!(2021)]]);
        assert_eq!(last.options.get("title"), None);

        assert!(matches!(
            service.select_chart_row("picker", 7).await,
            Err(DashboardError::RowOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_mutations_notify_listener() {
        let listener = Arc::new(CountingListener::default());
        let service = service_with(Arc::new(RecordingHost::default()), MapFetcher::default())
            .with_listener(listener.clone());

        service.add_table("sales", sales()).await.unwrap();
        service
            .add_view("v", View::new("sales", &["state"], &[]))
            .await
            .unwrap();
        assert!(service.add_view("bad", View::new("gone", &["x"], &[])).await.is_err());

        assert_eq!(listener.updates.load(Ordering::SeqCst), 2);
        assert!(service.status().await.dirty);
    }

    #[tokio::test]
    async fn test_restore_follows_morph_index_order() {
        let host = Arc::new(RecordingHost::default());
        let service = service_with(host.clone(), MapFetcher::default());

        let descriptor = json!({
            "tables": {"sales": serde_json::to_value(sales()).unwrap()},
            "views": {},
            "filters": {
                "back": {"filter": {"kind": "select", "columnName": "state"}, "morphIndex": 2},
                "front": {"filter": {"kind": "select", "columnName": "state"}, "morphIndex": 0}
            },
            "charts": {
                "bars": {"chartType": "ColumnChart", "viewOrTable": "sales", "morphIndex": 1}
            },
            "morphs": [{"kind": "label", "morphIndex": 3}]
        });

        let report = service
            .restore(descriptor.as_object().unwrap())
            .await
            .unwrap();

        assert_eq!(report, RestoreReport { restored: 4, failed: 0 });
        assert_eq!(
            host.events(),
            vec![
                "clear",
                "place filter front",
                "place chart bars",
                "place filter back",
                "place free 3",
                "draw bars",
                "fit",
            ]
        );
        assert!(!service.status().await.dirty);
    }

    #[tokio::test]
    async fn test_restore_continues_past_failures() {
        let host = Arc::new(RecordingHost {
            fail_charts: true,
            ..Default::default()
        });
        let service = service_with(host.clone(), MapFetcher::default());

        let descriptor = json!({
            "tables": {"sales": serde_json::to_value(sales()).unwrap()},
            "views": {},
            "filters": {"f": {"filter": {"kind": "select", "columnName": "state"}, "morphIndex": 2}},
            "charts": {
                "ok": {"chartType": "PieChart", "viewOrTable": "sales", "morphIndex": 0},
                "lost": {"chartType": "PieChart", "viewOrTable": "missing", "morphIndex": 1}
            }
        });

        let report = service
            .restore(descriptor.as_object().unwrap())
            .await
            .unwrap();

        assert_eq!(report, RestoreReport { restored: 1, failed: 2 });
        assert_eq!(host.events().last().map(String::as_str), Some("fit"));
        assert_eq!(service.status().await.filters, 1);
    }

    #[tokio::test]
    async fn test_concurrent_restore_is_rejected() {
        let service = service_with(Arc::new(RecordingHost::default()), MapFetcher::default());
        let _held = RestoreGuard::acquire(&service.restoring).unwrap();

        let empty = json!({"tables": {}, "views": {}, "filters": {}, "charts": {}});
        assert_eq!(
            service.restore(empty.as_object().unwrap()).await,
            Err(DashboardError::RestoreInProgress)
        );
    }

    #[tokio::test]
    async fn test_save_restore_round_trip() {
        let host = Arc::new(RecordingHost::default());
        let service = populated(host.clone()).await;
        service
            .add_chart("bars", Chart::new("ColumnChart", "by_state"), false)
            .await
            .unwrap();
        let text = service.save_to_string().await.unwrap();

        let copy = service_with(Arc::new(RecordingHost::default()), MapFetcher::default());
        assert_eq!(copy.load_from_str(&text).await, Validation::ok());

        let saved = serde_json::to_value(copy.save().await).unwrap();
        assert!(validate_descriptor(&saved).valid);
        assert_eq!(copy.save().await, service.save().await);
    }

    #[tokio::test]
    async fn test_load_from_url_reports_failures() {
        let mut fetcher = MapFetcher::default();
        fetcher.documents.insert("broken.gd.json".to_string(), "{not json".to_string());
        fetcher.documents.insert(
            "odd.gd.json".to_string(),
            r#"{"tables": {}, "views": {}, "filters": {}, "charts": {}, "bogus": 1}"#.to_string(),
        );
        fetcher.documents.insert(
            "empty.gd.json".to_string(),
            r#"{"tables": {}, "views": {}, "filters": {}, "charts": {}}"#.to_string(),
        );
        let service = service_with(Arc::new(RecordingHost::default()), fetcher);

        let missing = service.load_from_url("nowhere.gd.json").await;
        assert!(!missing.valid);
        assert!(missing.message.unwrap().contains("Could not fetch nowhere.gd.json"));

        let broken = service.load_from_url("broken.gd.json").await;
        assert!(broken.message.unwrap().starts_with("Invalid JSON"));

        let odd = service.load_from_url("odd.gd.json").await;
        assert!(odd.message.unwrap().contains("bogus"));

        assert_eq!(service.load_from_url("empty.gd.json").await, Validation::ok());
    }

    #[tokio::test]
    async fn test_replacing_filter_redraws_charts() {
        let host = Arc::new(RecordingHost::default());
        let service = populated(host.clone()).await;
        service
            .add_chart("bars", Chart::new("ColumnChart", "by_state"), false)
            .await
            .unwrap();

        service
            .add_filter("year", Filter::select("year", Some(json!(2020))), None)
            .await;

        let draws = host.draws_of("bars");
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[1].data.rows, vec![vec![json!("Ohio"), json!(3)]]);
        assert_eq!(
            draws[1].options.get("title"),
            Some(&json!("sales v state where year = 2020"))
        );
    }

    #[tokio::test]
    async fn test_select_value_may_be_an_object() {
        let service = populated(Arc::new(RecordingHost::default())).await;
        service
            .set_filter_value("year", json!({"min": 2020, "max": 2021}))
            .await
            .unwrap();
        assert!(service.resolve("by_state").await.rows.is_empty());

        assert_eq!(
            service.set_filter_value("missing", json!(1)).await,
            Err(DashboardError::UnknownFilter("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_restore_reads_untagged_filters() {
        let service = service_with(Arc::new(RecordingHost::default()), MapFetcher::default());
        let descriptor = json!({
            "tables": {"sales": serde_json::to_value(sales()).unwrap()},
            "views": {
                "picked": {"table": "sales", "columns": ["state", "year"], "filterNames": ["state", "years"]}
            },
            "filters": {
                "state": {"filter": {"columnName": "state", "value": "Iowa"}, "morphIndex": 0},
                "years": {"filter": {"columnName": "year", "minValue": 2020, "maxValue": 2021}, "morphIndex": 1}
            },
            "charts": {
                "pie": {
                    "chartType": "PieChart",
                    "viewOrTable": "sales",
                    "filter": {"columnName": "state", "value": "Utah"},
                    "morphIndex": 2
                }
            }
        });

        assert_eq!(
            service.load_from_str(&descriptor.to_string()).await,
            Validation::ok()
        );
        assert_eq!(service.status().await.filters, 2);
        assert_eq!(
            service.resolve("picked").await.rows,
            vec![vec![json!("Iowa"), json!(2021)]]
        );

        let saved = serde_json::to_value(service.save().await).unwrap();
        assert_eq!(saved["filters"]["years"]["filter"]["kind"], json!("range"));
        assert_eq!(saved["charts"]["pie"]["filter"]["value"], json!("Utah"));
    }

    #[tokio::test]
    async fn test_restore_places_bad_indices_last() {
        let host = Arc::new(RecordingHost::default());
        let service = service_with(host.clone(), MapFetcher::default());
        let descriptor = json!({
            "tables": {"sales": serde_json::to_value(sales()).unwrap()},
            "views": {},
            "filters": {
                "negative": {"filter": {"kind": "select", "columnName": "state"}, "morphIndex": -1},
                "first": {"filter": {"kind": "select", "columnName": "state"}, "morphIndex": 0}
            },
            "charts": {
                "bars": {"chartType": "ColumnChart", "viewOrTable": "sales", "morphIndex": 2.5}
            }
        });

        let report = service
            .restore(descriptor.as_object().unwrap())
            .await
            .unwrap();

        assert_eq!(report, RestoreReport { restored: 3, failed: 0 });
        assert_eq!(
            host.events(),
            vec![
                "clear",
                "place filter first",
                "place filter negative",
                "place chart bars",
                "draw bars",
                "fit",
            ]
        );
    }

    #[tokio::test]
    async fn test_numeric_filter_spans_column() {
        let service = populated(Arc::new(RecordingHost::default())).await;
        let params = service
            .add_numeric_filter("amount", "sales", Some("sales"))
            .await
            .unwrap();
        assert_eq!(params, RangeParameters { min: 3.0, max: 8.0, increment: 1.0 });
        assert_eq!(service.status().await.filters, 2);

        service
            .add_view("amounts", View::new("sales", &["state", "sales"], &["amount"]))
            .await
            .unwrap();
        service
            .set_filter_value("amount", json!({"min": 4, "max": 8}))
            .await
            .unwrap();
        assert_eq!(service.resolve("amounts").await.rows.len(), 2);

        assert_eq!(
            service.add_numeric_filter("names", "state", None).await,
            Err(DashboardError::NoNumericValues("state".to_string()))
        );
    }
}
