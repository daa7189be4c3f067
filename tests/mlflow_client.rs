mod common;

use common::{FakeServer, Recorded};
use ml_monitor::domain::errors::TrackingError;
use ml_monitor::domain::ports::{ExperimentTracker, RunStatus};
use ml_monitor::infrastructure::MlflowClient;
use std::collections::BTreeMap;
use std::time::Duration;

fn mlflow_responder(request: &Recorded) -> (u16, String) {
    let path = request.path.split('?').next().unwrap_or_default();
    match (request.method.as_str(), path) {
        ("GET", "/api/2.0/mlflow/experiments/get-by-name") => (
            404,
            r#"{"error_code":"RESOURCE_DOES_NOT_EXIST","message":"Could not find experiment"}"#
                .to_string(),
        ),
        ("POST", "/api/2.0/mlflow/experiments/create") => {
            (200, r#"{"experiment_id":"7"}"#.to_string())
        }
        ("POST", "/api/2.0/mlflow/runs/create") => (
            200,
            r#"{"run":{"info":{"run_id":"r42","experiment_id":"7",
                "artifact_uri":"mlflow-artifacts:/7/r42/artifacts"}}}"#
                .to_string(),
        ),
        ("GET", "/api/2.0/mlflow/artifacts/list") => (
            200,
            r#"{"root_uri":"x","files":[
                {"path":"drift_report/data_drift_report.html","is_dir":false,"file_size":"2048"}
            ]}"#
            .to_string(),
        ),
        ("POST", _) | ("PUT", _) => (200, "{}".to_string()),
        _ => (404, r#"{"error_code":"ENDPOINT_NOT_FOUND","message":"no route"}"#.to_string()),
    }
}

#[test]
fn test_tracked_run_against_rest_api() {
    let server = FakeServer::start(mlflow_responder);
    let client = MlflowClient::new(&server.url(), Duration::from_secs(5)).unwrap();

    let run = client.start_run("lrgn_model").unwrap();
    assert_eq!(run.run_id, "r42");
    assert_eq!(run.experiment_id, "7");

    client.log_param(&run.run_id, "model_type", "LinearRegression").unwrap();
    let metrics = BTreeMap::from([("mse".to_string(), 1.5), ("r2_score".to_string(), 0.9)]);
    client.log_metrics(&run.run_id, &metrics).unwrap();

    let dir = std::env::temp_dir().join(format!("ml_monitor_upload_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let report = dir.join("data_drift_report.html");
    std::fs::write(&report, "<html>report</html>").unwrap();
    client.log_artifact(&run, &report, "drift_report").unwrap();

    let listed = client.list_artifacts(&run.run_id, "drift_report").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].file_size, Some(2048));

    client.end_run(&run.run_id, RunStatus::Finished).unwrap();

    let requests = server.requests();
    let create = requests
        .iter()
        .find(|r| r.path == "/api/2.0/mlflow/experiments/create")
        .unwrap();
    assert_eq!(create.json()["name"], "lrgn_model");

    let batch = requests
        .iter()
        .find(|r| r.path == "/api/2.0/mlflow/runs/log-batch")
        .unwrap();
    assert_eq!(batch.json()["metrics"].as_array().unwrap().len(), 2);

    let upload = requests.iter().find(|r| r.method == "PUT").unwrap();
    assert_eq!(
        upload.path,
        "/api/2.0/mlflow-artifacts/artifacts/7/r42/artifacts/drift_report/data_drift_report.html"
    );
    assert_eq!(upload.body_text(), "<html>report</html>");

    let update = requests.last().unwrap();
    assert_eq!(update.path, "/api/2.0/mlflow/runs/update");
    assert_eq!(update.json()["status"], "FINISHED");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_api_errors_carry_code() {
    let server = FakeServer::start(|_| {
        (
            400,
            r#"{"error_code":"INVALID_PARAMETER_VALUE","message":"bad run"}"#.to_string(),
        )
    });
    let client = MlflowClient::new(&server.url(), Duration::from_secs(5)).unwrap();

    let err = client.log_param("nope", "k", "v").unwrap_err();
    match err {
        TrackingError::Api { status, code, .. } => {
            assert_eq!(status, 400);
            assert_eq!(code, "INVALID_PARAMETER_VALUE");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unreachable_server_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = MlflowClient::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
    let err = client.start_run("lrgn_model").unwrap_err();
    assert!(matches!(err, TrackingError::Transport { .. }));
}
