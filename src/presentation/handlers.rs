// HTTP request handlers
use crate::domain::chart::Chart;
use crate::domain::dashboard::DashboardStatus;
use crate::domain::descriptor::{Fill, Validation};
use crate::domain::error::DashboardError;
use crate::domain::filter::Filter;
use crate::domain::table::{ColumnType, Table};
use crate::domain::view::View;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct LoadRequest {
    pub url: String,
}

#[derive(Deserialize)]
pub struct ColumnQuery {
    #[serde(rename = "type")]
    pub column_type: Option<ColumnType>,
}

#[derive(Deserialize)]
pub struct FilterRequest {
    pub filter: Filter,
    #[serde(default)]
    pub widget: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    #[serde(flatten)]
    pub chart: Chart,
    #[serde(default = "default_true")]
    pub edit_after_create: bool,
}

#[derive(Deserialize)]
pub struct SelectRequest {
    pub row: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliderRequest {
    pub column_name: String,
    pub table: Option<String>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: DashboardStatus,
    pub revision: u64,
}

fn error_response(e: DashboardError) -> Response {
    let status = match e {
        DashboardError::UnknownTable(_)
        | DashboardError::UnknownDataSource(_)
        | DashboardError::UnknownFilter(_)
        | DashboardError::UnknownChart(_) => StatusCode::NOT_FOUND,
        DashboardError::RestoreInProgress => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

fn empty_response(result: Result<(), DashboardError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

fn validation_response(validation: Validation) -> Response {
    let status = if validation.valid {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(validation)).into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusResponse {
        status: state.dashboard_service.status().await,
        revision: state.host.revision(),
    })
}

/// Current descriptor, without touching the dirty flag
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.dashboard_service.save().await)
}

/// Persisted file contents; clears the dirty flag
pub async fn save_dashboard(State(state): State<Arc<AppState>>) -> Response {
    match state.dashboard_service.save_to_string().await {
        Ok(text) => ([(header::CONTENT_TYPE, "application/json")], text).into_response(),
        Err(e) => {
            tracing::error!("Error serializing dashboard: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Restore from a descriptor in the request body
pub async fn put_dashboard(State(state): State<Arc<AppState>>, body: String) -> Response {
    validation_response(state.dashboard_service.load_from_str(&body).await)
}

pub async fn load_dashboard(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoadRequest>,
) -> Response {
    validation_response(state.dashboard_service.load_from_url(&request.url).await)
}

pub async fn put_fill(
    State(state): State<Arc<AppState>>,
    Json(fill): Json<Option<Fill>>,
) -> Response {
    state.dashboard_service.set_fill(fill).await;
    StatusCode::NO_CONTENT.into_response()
}

/// Placed visual elements, back to front
pub async fn list_elements(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.host.placed().await)
}

pub async fn list_columns(
    Query(query): Query<ColumnQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let columns = match query.column_type {
        Some(column_type) => {
            state
                .dashboard_service
                .all_columns_of_type(&[column_type])
                .await
        }
        None => state.dashboard_service.all_columns().await,
    };
    Json(columns)
}

pub async fn put_table(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(table): Json<Table>,
) -> Response {
    empty_response(state.dashboard_service.add_table(&name, table).await)
}

pub async fn column_values(
    Path((table, column)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(
        state
            .dashboard_service
            .get_all_values(&column, Some(&table))
            .await,
    )
}

pub async fn column_range(
    Path((table, column)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state
        .dashboard_service
        .range_parameters(&column, Some(&table))
        .await
    {
        Some(parameters) => Json(parameters).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn put_view(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(view): Json<View>,
) -> Response {
    empty_response(state.dashboard_service.add_view(&name, view).await)
}

/// Filtered, projected rows of a view or table
pub async fn view_data(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(state.dashboard_service.resolve(&name).await)
}

pub async fn put_filter(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<FilterRequest>,
) -> Response {
    state
        .dashboard_service
        .add_filter(&name, request.filter, request.widget)
        .await;
    StatusCode::NO_CONTENT.into_response()
}

/// Numeric slider over the full value range of a column
pub async fn post_numeric_filter(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SliderRequest>,
) -> Response {
    match state
        .dashboard_service
        .add_numeric_filter(&name, &request.column_name, request.table.as_deref())
        .await
    {
        Ok(parameters) => Json(parameters).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn put_filter_value(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(value): Json<Value>,
) -> Response {
    empty_response(state.dashboard_service.set_filter_value(&name, value).await)
}

pub async fn post_chart(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChartRequest>,
) -> Response {
    empty_response(
        state
            .dashboard_service
            .add_chart(&name, request.chart, request.edit_after_create)
            .await,
    )
}

pub async fn delete_chart(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    empty_response(state.dashboard_service.remove_chart(&name).await)
}

/// Chart click on a row
pub async fn select_chart_row(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> Response {
    empty_response(
        state
            .dashboard_service
            .select_chart_row(&name, request.row)
            .await,
    )
}

/// Last rendering of a chart
pub async fn get_chart(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.host.rendered(&name).await {
        Some(request) => Json(request).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
