use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tablescope_api::{create_api_router, ApiConfig, AppState};
use tablescope_test_utils::fixtures::{northwind_catalog, northwind_dictionary};
use tablescope_test_utils::{browser_over, IdentQuoting, InMemoryCatalog, LabelStrategy};
use tower::ServiceExt;

/// Router over the Northwind in-memory catalog, plus the catalog for
/// inspecting calls.
pub fn northwind_app(
    strategy: LabelStrategy,
    quoting: IdentQuoting,
) -> Result<(Router, Arc<InMemoryCatalog>), String> {
    let catalog = Arc::new(northwind_catalog());
    let app = app_over(catalog.clone(), strategy, quoting)?;
    Ok((app, catalog))
}

pub fn app_over(
    catalog: Arc<InMemoryCatalog>,
    strategy: LabelStrategy,
    quoting: IdentQuoting,
) -> Result<Router, String> {
    let browser = browser_over(catalog, strategy, northwind_dictionary(), quoting)
        .map_err(|e| e.to_string())?;
    Ok(create_api_router(
        AppState::new(browser),
        &ApiConfig::default(),
    ))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Result<serde_json::Value, String> {
        serde_json::from_slice(&self.body).map_err(|e| format!("body is not JSON: {}", e))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issue a GET through the router without binding a socket.
pub async fn get(app: &Router, uri: &str) -> Result<TestResponse, String> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .map_err(|e| e.to_string())?;
    let response = app
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| e.to_string())?;

    Ok(TestResponse {
        status,
        content_type,
        body: body.to_vec(),
    })
}
