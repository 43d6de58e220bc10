//! REST API handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use weldmap_core::model::parse_mesh;
use weldmap_core::{ModelFormat, SectionError, SectionRequest, SectionResponse, SliceResult};

use crate::render::{render_locator, RenderSettings};
use crate::state::AppState;

/// Prefix under which generated images are served
pub const SLICES_ROUTE: &str = "/slices";

fn api_error(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Response {
    (
        status,
        Json(SectionError {
            error: error.into(),
            details,
        }),
    )
        .into_response()
}

/// Cut the requested model with every locator's plane and render the sections
pub async fn slice(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SectionRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected slice request");
            return api_error(StatusCode::BAD_REQUEST, "Invalid JSON payload", Some(rejection.body_text()));
        }
    };
    if request.obj_file_path.trim().is_empty() || request.locators.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "Missing obj_file_path or locators", None);
    }

    let model_path = match state.resolve_model(&request.obj_file_path) {
        Ok(path) => path,
        Err(tried) => {
            let tried: Vec<String> = tried.iter().map(|p| p.display().to_string()).collect();
            warn!(requested = %request.obj_file_path, "Model not found");
            return api_error(
                StatusCode::NOT_FOUND,
                format!("OBJ file not found: {}", request.obj_file_path),
                Some(format!("tried {}", tried.join(", "))),
            );
        }
    };

    let format = match ModelFormat::from_file_name(&request.obj_file_path) {
        Ok(format) => format,
        Err(e) => return api_error(StatusCode::BAD_REQUEST, e.to_string(), None),
    };

    info!(
        model = %model_path.display(),
        locators = request.locators.len(),
        "Processing slice request"
    );

    let settings = RenderSettings::from(&state.config.slicing);
    let output_dir = state.output_dir().to_path_buf();
    let locators = request.locators;
    let source = model_path.clone();
    let job = tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&source).map_err(|e| e.to_string())?;
        let mesh = parse_mesh(format, &bytes).map_err(|e| e.to_string())?;
        let results: Vec<SliceResult> = locators
            .iter()
            .map(|locator| match render_locator(&mesh, locator, settings, &output_dir) {
                Ok(path) => SliceResult::success(&locator.id, image_url(&path)),
                Err(e) => {
                    warn!(locator = %locator.id, error = %e, "Slice failed");
                    SliceResult::error(&locator.id, format!("Failed to create slice image for {}: {}", locator.id, e))
                }
            })
            .collect();
        Ok::<_, String>(results)
    });

    let slice_results = match job.await {
        Ok(Ok(results)) => results,
        Ok(Err(details)) => {
            error!(model = %model_path.display(), error = %details, "Failed to load model");
            return api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Slicing process encountered errors.",
                Some(details),
            );
        }
        Err(e) => {
            error!(error = %e, "Slicing task panicked");
            return api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected server error occurred.",
                Some(e.to_string()),
            );
        }
    };

    let file_name = display_name(&model_path);
    Json(SectionResponse {
        message: format!("Slicing process completed for {}.", file_name),
        obj_file_processed: model_path.display().to_string(),
        num_locators_processed: slice_results.len(),
        slice_results,
    })
    .into_response()
}

/// Where a written image can be fetched from this server
fn image_url(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}", SLICES_ROUTE.trim_start_matches('/'), name)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::router;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;
    use weldmap_core::SliceStatus;

    /// 100 mm cube centered on the origin
    const CUBE_OBJ: &str = "\
v -50 -50 -50
v 50 -50 -50
v 50 50 -50
v -50 50 -50
v -50 -50 50
v 50 -50 50
v 50 50 50
v -50 50 50
f 1 3 2
f 1 4 3
f 5 6 7
f 5 7 8
f 1 2 6
f 1 6 5
f 2 3 7
f 2 7 6
f 3 4 8
f 3 8 7
f 4 1 5
f 4 5 8
";

    fn test_state(dir: &Path) -> Arc<AppState> {
        let mut config = Config::default();
        config.slicing.data_dir = dir.display().to_string();
        config.slicing.output_dir = dir.join("out").display().to_string();
        config.slicing.image_width = 80;
        config.slicing.image_height = 60;
        AppState::new(config)
    }

    async fn post(state: Arc<AppState>, body: String) -> (StatusCode, serde_json::Value) {
        let response = router(state)
            .oneshot(
                Request::post("/slice")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_slice_writes_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("weldmap-cube.obj"), CUBE_OBJ).unwrap();
        let state = test_state(dir.path());

        let body = serde_json::json!({
            "obj_file_path": "weldmap-cube.obj",
            "locators": [
                {"id": "L1", "x": 0, "y": 0, "z": 0, "rx": 0, "ry": 0, "rz": 0},
                {"id": "L2", "x": 0, "y": 0, "z": 10, "rx": 90, "ry": 0, "rz": 0}
            ]
        });
        let (status, json) = post(state, body.to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let response: SectionResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.num_locators_processed, 2);
        assert!(response.message.contains("weldmap-cube.obj"));
        assert!(response.slice_results.iter().all(|r| r.status == SliceStatus::Success));
        assert_eq!(response.slice_results[0].image_path.as_deref(), Some("slices/L1.png"));

        let image = image::open(dir.path().join("out/L1.png")).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (80, 60));
        assert!(dir.path().join("out/L2.png").exists());
    }

    #[tokio::test]
    async fn test_bad_locator_id_fails_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("weldmap-cube.obj"), CUBE_OBJ).unwrap();
        let state = test_state(dir.path());

        let body = serde_json::json!({
            "obj_file_path": "weldmap-cube.obj",
            "locators": [{"id": ".."}, {"id": "ok"}]
        });
        let (status, json) = post(state, body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        let response: SectionResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.slice_results[0].status, SliceStatus::Error);
        assert_eq!(response.slice_results[1].status, SliceStatus::Success);
    }

    #[tokio::test]
    async fn test_missing_model_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let body = serde_json::json!({
            "obj_file_path": "missing.obj",
            "locators": [{"id": "L1"}]
        });
        let (status, json) = post(test_state(dir.path()), body.to_string()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("missing.obj"));
    }

    #[tokio::test]
    async fn test_empty_locators_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let body = serde_json::json!({"obj_file_path": "part.obj", "locators": []});
        let (status, _) = post(test_state(dir.path()), body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = post(test_state(dir.path()), "{not json".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid JSON payload");
    }

    #[tokio::test]
    async fn test_unreadable_mesh_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("weldmap-empty.obj"), "# nothing here\n").unwrap();
        let body = serde_json::json!({
            "obj_file_path": "weldmap-empty.obj",
            "locators": [{"id": "L1"}]
        });
        let (status, json) = post(test_state(dir.path()), body.to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["details"].is_string());
    }
}
