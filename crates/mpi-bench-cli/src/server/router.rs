//! HTTP API router for the benchmark dashboard.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, state::DashboardState};

/// Create the API router with all endpoints.
///
/// # Routes
///
/// - `GET /health` - Health check
///
/// ## Cluster
/// - `GET /api/cluster/status` - Node statuses and cluster health
/// - `POST /api/cluster/start?nodes=N` - Start head and workers
/// - `POST /api/cluster/stop` - Stop and remove every node
/// - `GET /api/cluster/logs/:node?tail=N` - Recent node output
///
/// ## Benchmarks and results
/// - `POST /api/benchmarks` - Run a benchmark; the result becomes current
/// - `GET /api/results/current` - Current result document
/// - `GET /api/results/current/report` - Table rows, summary, charts, insights
/// - `GET /api/results/current/csv` - CSV download
/// - `POST /api/results/current/save?name=NAME` - Save the current result
/// - `GET /api/results` - Saved result files
/// - `POST /api/results/:name/load` - Load a saved result as current
pub fn create_router(state: Arc<DashboardState>) -> Router {
    let api = Router::new()
        .route("/cluster/status", get(handlers::cluster_status_handler))
        .route("/cluster/start", post(handlers::start_cluster_handler))
        .route("/cluster/stop", post(handlers::stop_cluster_handler))
        .route("/cluster/logs/:node", get(handlers::logs_handler))
        .route("/benchmarks", post(handlers::run_benchmark_handler))
        .route("/results", get(handlers::list_results_handler))
        .route("/results/current", get(handlers::current_result_handler))
        .route(
            "/results/current/report",
            get(handlers::current_report_handler),
        )
        .route("/results/current/csv", get(handlers::current_csv_handler))
        .route(
            "/results/current/save",
            post(handlers::save_current_handler),
        )
        .route("/results/:name/load", post(handlers::load_result_handler))
        .with_state(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AppContext;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use mpi_bench::{BenchConfig, CommandResult, MockRuntime};
    use tower::util::ServiceExt;

    const NODES: [&str; 4] = ["hpchead", "node01", "node02", "node03"];

    fn create_test_state(runtime: MockRuntime, dir: &std::path::Path) -> Arc<DashboardState> {
        let mut config = BenchConfig::default();
        config.results.dir = dir.to_path_buf();
        let ctx = AppContext::new(config, Arc::new(runtime));
        Arc::new(DashboardState::from_context(&ctx))
    }

    fn benchmark_runtime() -> MockRuntime {
        MockRuntime::new()
            .with_running_nodes(NODES)
            .respond(
                "serial 500",
                CommandResult::new(0, "Total Time Elapsed is 2.0 seconds\n"),
            )
            .respond(
                "hpchead:1",
                CommandResult::new(0, "Total Time Elapsed is 0.55 seconds\n"),
            )
            .respond(
                "--host hpchead ",
                CommandResult::new(0, "Total Time Elapsed is 0.6 seconds\n"),
            )
    }

    async fn send(app: Router, method: &str, uri: &str, body: Body) -> Response {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn compare_request() -> Body {
        Body::from(
            serde_json::json!({
                "mode": "compare_all",
                "matrix_size": 500,
                "num_processes": 4
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(create_test_state(MockRuntime::new(), dir.path()));

        let response = send(app, "GET", "/health", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_cluster_status_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = MockRuntime::new()
            .with_running_nodes(["hpchead", "node01"])
            .with_container("node02", "exited");
        let app = create_router(create_test_state(runtime, dir.path()));

        let response = send(app, "GET", "/api/cluster/status", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["nodes"]["hpchead"], "running");
        assert_eq!(json["nodes"]["node02"], "exited");
        assert_eq!(json["nodes"]["node03"], "not_found");
        assert_eq!(json["running"], 2);
        assert_eq!(json["health"], "degraded");
    }

    #[tokio::test]
    async fn test_start_with_runtime_down_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(create_test_state(MockRuntime::unavailable(), dir.path()));

        let response = send(app, "POST", "/api/cluster/start?nodes=2", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["code"], "RUNTIME_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_start_and_stop_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let state = create_test_state(MockRuntime::new(), dir.path());

        let response = send(
            create_router(state.clone()),
            "POST",
            "/api/cluster/start?nodes=2",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["hpchead"], true);
        assert_eq!(json["node01"], true);
        assert!(json.get("node02").is_none());

        let response = send(create_router(state), "POST", "/api/cluster/stop", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json.as_object().unwrap().len(), 4);
        assert!(json.as_object().unwrap().values().all(|v| v == true));
    }

    #[tokio::test]
    async fn test_logs_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = MockRuntime::new()
            .with_running_nodes(["hpchead"])
            .with_logs("hpchead", "sshd started\n");
        let app = create_router(create_test_state(runtime, dir.path()));

        let response = send(app, "GET", "/api/cluster/logs/hpchead?tail=10", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["node"], "hpchead");
        assert!(json["logs"].as_str().unwrap().contains("sshd started"));
    }

    #[tokio::test]
    async fn test_current_result_missing() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(create_test_state(MockRuntime::new(), dir.path()));

        let response = send(app, "GET", "/api/results/current", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "NO_CURRENT_RESULT");
    }

    #[tokio::test]
    async fn test_invalid_benchmark_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(create_test_state(benchmark_runtime(), dir.path()));

        let body = Body::from(
            serde_json::json!({"mode": "serial", "matrix_size": 0}).to_string(),
        );
        let response = send(app, "POST", "/api/benchmarks", body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_benchmark_report_csv_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let state = create_test_state(benchmark_runtime(), dir.path());

        let response = send(
            create_router(state.clone()),
            "POST",
            "/api/benchmarks",
            compare_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["matrix_size"], 500);
        assert_eq!(json["tests"]["serial"]["outcome"], "success");

        let response = send(
            create_router(state.clone()),
            "GET",
            "/api/results/current/report",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let report = json_body(response).await;
        assert_eq!(report["rows"].as_array().unwrap().len(), 3);
        assert_eq!(report["charts"].as_array().unwrap().len(), 4);
        assert!(report["insights"].is_object());

        let response = send(
            create_router(state.clone()),
            "GET",
            "/api/results/current/csv",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("benchmark_results_500.csv"));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let csv = String::from_utf8(body.to_vec()).unwrap();
        assert!(csv.starts_with("Mode,Time (s),Speedup,Efficiency,Processes,GFLOPS,Memory (MB)"));
        assert!(csv.contains("Multi Node,0.5500,3.64x,90.91%"));

        let response = send(
            create_router(state.clone()),
            "POST",
            "/api/results/current/save?name=run1",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["file"], "run1.json");

        let response = send(create_router(state.clone()), "GET", "/api/results", Body::empty()).await;
        assert_eq!(json_body(response).await, serde_json::json!(["run1.json"]));

        let response = send(
            create_router(state),
            "POST",
            "/api/results/run1/load",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json);
    }

    #[tokio::test]
    async fn test_load_missing_and_invalid_names() {
        let dir = tempfile::tempdir().unwrap();
        let state = create_test_state(MockRuntime::new(), dir.path());

        let response = send(
            create_router(state.clone()),
            "POST",
            "/api/results/nothing/load",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(
            create_router(state),
            "POST",
            "/api/results/current/save?name=..%2Fescape",
            Body::empty(),
        )
        .await;
        // No current result yet
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_save_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = create_test_state(benchmark_runtime(), dir.path());
        state
            .set_current(mpi_bench::ComparisonRecord::new(500, 4).into())
            .await;

        let response = send(
            create_router(state),
            "POST",
            "/api/results/current/save?name=..%2Fescape",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_NAME");
    }
}
