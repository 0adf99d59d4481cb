use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::error::AppError;
use crate::export::{self, ExportOutcome};
use crate::presenter::{ColumnDef, GridPage, GridPresenter};
use crate::row::{Dataset, Row};
use crate::view::ViewState;

/// Shared, read-only server state. Nothing in here is mutated after startup.
pub struct AppState {
    presenter: GridPresenter,
}

impl AppState {
    pub fn new(dataset: Arc<Dataset>, page_size: usize) -> Self {
        AppState {
            presenter: GridPresenter::new(dataset, page_size),
        }
    }
}

/// Download button press together with the grid state at that instant.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportRequest {
    /// How many times the button has been pressed; `None`/0 means never.
    pub n_clicks: Option<u32>,
    pub view: ViewState,
}

impl ExportRequest {
    pub fn is_requested(&self) -> bool {
        self.n_clicks.is_some_and(|n| n > 0)
    }
}

/// Resolve the client's visible rows and export them.
///
/// No click or no visible rows is `ExportOutcome::Empty`, not an error.
pub fn handle_export_request(
    presenter: &GridPresenter,
    request: &ExportRequest,
) -> Result<ExportOutcome, AppError> {
    if !request.is_requested() {
        debug!("export skipped: button not pressed");
        return Ok(ExportOutcome::Empty);
    }

    let rows: Vec<Row> = presenter
        .visible_rows(&request.view)?
        .into_iter()
        .map(|visible| visible.row)
        .collect();

    Ok(export::export(&rows)?)
}

pub fn router(state: Arc<AppState>, static_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/columns", get(get_columns))
        .route("/api/rows", post(get_rows))
        .route("/api/export", post(export_rows))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

pub async fn run(config: &Config, dataset: Dataset) -> Result<(), Box<dyn std::error::Error>> {
    let app_state = Arc::new(AppState::new(Arc::new(dataset), config.page_size()));
    let app = router(app_state, &config.static_dir);

    let listener = TcpListener::bind(config.bind).await?;
    log::info!("Listening on http://{}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("./static/dashboard.html"))
}

async fn get_columns(State(state): State<Arc<AppState>>) -> Json<&'static [ColumnDef]> {
    Json(state.presenter.columns())
}

async fn get_rows(
    State(state): State<Arc<AppState>>,
    Json(view): Json<ViewState>,
) -> Result<Json<GridPage>, AppError> {
    match state.presenter.render(&view) {
        Ok(page) => Ok(Json(page)),
        Err(e) => {
            warn!("rejected view state: {}", e);
            Err(e.into())
        }
    }
}

async fn export_rows(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExportRequest>,
) -> Result<Response, AppError> {
    match handle_export_request(&state.presenter, &request) {
        Ok(ExportOutcome::File(file)) => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, file.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file.filename),
                ),
            ],
            Body::from(file.bytes),
        )
            .into_response()),
        Ok(ExportOutcome::Empty) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => {
            match &e {
                AppError::View(_) => warn!("export rejected: {}", e),
                AppError::Export(_) => error!("export failed: {}", e),
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::tests::sample_row;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let rows = vec![
            sample_row("CA-1", 2, 100.0, 50.0),
            sample_row("CA-2", 3, 20.5, -12.3),
            sample_row("CA-3", 1, 9.99, 5.0),
        ];
        let state = Arc::new(AppState::new(Arc::new(Dataset::new(rows)), 2));
        router(state, std::path::Path::new("static"))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[test]
    fn unclicked_export_is_a_no_op() {
        let presenter = GridPresenter::new(
            Arc::new(Dataset::new(vec![sample_row("CA-1", 1, 1.0, 1.0)])),
            20,
        );
        let outcome = handle_export_request(&presenter, &ExportRequest::default()).unwrap();
        assert_eq!(outcome, ExportOutcome::Empty);
    }

    #[tokio::test]
    async fn export_streams_the_workbook() {
        let response = app()
            .oneshot(post_json("/api/export", serde_json::json!({ "nClicks": 1 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            export::XLSX_CONTENT_TYPE
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"data.xlsx\""
        );
        assert_eq!(&body_bytes(response).await[..2], b"PK");
    }

    #[tokio::test]
    async fn export_of_nothing_returns_no_content() {
        let request = serde_json::json!({
            "nClicks": 3,
            "view": {
                "filters": [{
                    "field": "profit",
                    "condition": {"filterType": "number", "type": "greaterThan", "filter": 1000}
                }]
            }
        });
        let response = app().oneshot(post_json("/api/export", request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn bad_view_state_is_reported() {
        let request = serde_json::json!({
            "nClicks": 1,
            "view": {
                "filters": [{
                    "field": "state",
                    "condition": {"filterType": "number", "type": "equals", "filter": 1}
                }]
            }
        });
        let response = app().oneshot(post_json("/api/export", request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "number filter is not supported on state");
    }

    #[tokio::test]
    async fn rows_are_paginated() {
        let request = serde_json::json!({ "page": 1 });
        let response = app().oneshot(post_json("/api/rows", request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let page: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(page["page"], 1);
        assert_eq!(page["pageCount"], 2);
        assert_eq!(page["totalRows"], 3);
        assert_eq!(page["rows"].as_array().unwrap().len(), 1);
        assert_eq!(page["rows"][0]["order_id"], "CA-3");
    }

    #[tokio::test]
    async fn dashboard_page_is_served() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("Download"));
    }
}
