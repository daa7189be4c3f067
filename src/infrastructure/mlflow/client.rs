use super::common::*;
use crate::config::TrackingEnvConfig;
use crate::domain::errors::TrackingError;
use crate::domain::ports::{ArtifactInfo, ExperimentTracker, RunInfo, RunStatus};
use crate::infrastructure::http_client_factory::HttpClientFactory;
use chrono::Utc;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Where a run's artifacts physically live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactDestination {
    /// Served by the tracking server's artifact proxy, under this
    /// percent-encoded path.
    Proxied(String),
    /// A directory on the local filesystem.
    Local(PathBuf),
}

impl ArtifactDestination {
    pub fn from_uri(artifact_uri: &str) -> Result<Self, TrackingError> {
        match Url::parse(artifact_uri) {
            Ok(url) => match url.scheme() {
                "mlflow-artifacts" => Ok(Self::Proxied(
                    url.path().trim_matches('/').to_string(),
                )),
                "file" => url.to_file_path().map(Self::Local).map_err(|_| {
                    TrackingError::InvalidUri {
                        uri: artifact_uri.to_string(),
                        reason: "not a local file path".to_string(),
                    }
                }),
                scheme => Err(TrackingError::UnsupportedArtifactStore(scheme.to_string())),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(Self::Local(PathBuf::from(artifact_uri)))
            }
            Err(e) => Err(TrackingError::InvalidUri {
                uri: artifact_uri.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// MLflow tracking server client (REST API 2.0)
pub struct MlflowClient {
    client: Client,
    base: Url,
}

impl MlflowClient {
    pub fn new(tracking_uri: &str, timeout: Duration) -> Result<Self, TrackingError> {
        let normalized = if tracking_uri.ends_with('/') {
            tracking_uri.to_string()
        } else {
            format!("{}/", tracking_uri)
        };
        let base = Url::parse(&normalized).map_err(|e| TrackingError::InvalidUri {
            uri: tracking_uri.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(TrackingError::InvalidUri {
                uri: tracking_uri.to_string(),
                reason: format!("unsupported scheme {}", base.scheme()),
            });
        }

        Ok(Self {
            client: HttpClientFactory::create_blocking_client(timeout),
            base,
        })
    }

    pub fn from_config(config: &TrackingEnvConfig) -> Result<Self, TrackingError> {
        Self::new(
            &config.tracking_uri,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, TrackingError> {
        self.base.join(path).map_err(|e| TrackingError::InvalidUri {
            uri: format!("{}{}", self.base, path),
            reason: e.to_string(),
        })
    }

    fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, TrackingError> {
        let url = self.endpoint(path)?;
        send(self.client.post(url.clone()).json(body), &url)
    }

    fn get<R: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<R, TrackingError> {
        let url = self.endpoint(path)?;
        send(self.client.get(url.clone()).query(query), &url)
    }

    /// Id of experiment `name`, creating it when the server does not know it.
    pub fn get_or_create_experiment(&self, name: &str) -> Result<String, TrackingError> {
        let found: Result<GetExperimentResponse, _> = self.get(
            "api/2.0/mlflow/experiments/get-by-name",
            &[("experiment_name", name)],
        );
        match found {
            Ok(resp) => Ok(resp.experiment.experiment_id),
            Err(TrackingError::Api { code, .. }) if code == RESOURCE_DOES_NOT_EXIST => {
                info!("Creating MLflow experiment {}", name);
                let created: CreateExperimentResponse = self.post(
                    "api/2.0/mlflow/experiments/create",
                    &CreateExperimentRequest { name },
                )?;
                Ok(created.experiment_id)
            }
            Err(e) => Err(e),
        }
    }

    /// Proxy URL for `file_name` under `artifact_path` in the run root.
    /// `root` is already percent-encoded and is kept verbatim; the artifact
    /// path and file name are encoded segment by segment.
    fn upload_url(&self, root: &str, artifact_path: &str, file_name: &str) -> Result<Url, TrackingError> {
        let mut url = self.endpoint(&format!("api/2.0/mlflow-artifacts/artifacts/{}", root))?;
        let uri = url.to_string();
        url.path_segments_mut()
            .map_err(|_| TrackingError::InvalidUri {
                uri,
                reason: "cannot append path segments".to_string(),
            })?
            .pop_if_empty()
            .extend(artifact_path.split('/').filter(|s| !s.is_empty()))
            .push(file_name);
        Ok(url)
    }

    fn upload(&self, root: &str, artifact_path: &str, local_path: &Path) -> Result<(), TrackingError> {
        let file_name = local_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .ok_or_else(|| TrackingError::Io {
                path: local_path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
            })?;
        let bytes = std::fs::read(local_path).map_err(|source| TrackingError::Io {
            path: local_path.display().to_string(),
            source,
        })?;

        let url = self.upload_url(root, artifact_path, &file_name)?;
        debug!("Uploading {} bytes to {}", bytes.len(), url);
        let _: serde::de::IgnoredAny = send(self.client.put(url.clone()).body(bytes), &url)?;
        Ok(())
    }
}

fn send<R: DeserializeOwned>(request: RequestBuilder, url: &Url) -> Result<R, TrackingError> {
    let response = request.send().map_err(|e| TrackingError::Transport {
        endpoint: url.to_string(),
        reason: e.to_string(),
    })?;
    let status = response.status();
    let text = response.text().map_err(|e| TrackingError::Transport {
        endpoint: url.to_string(),
        reason: e.to_string(),
    })?;

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &text));
    }
    let body = if text.trim().is_empty() { "{}" } else { text.as_str() };
    serde_json::from_str(body)
        .map_err(|e| TrackingError::UnexpectedResponse(format!("{} from {}: {}", e, url, text)))
}

fn api_error(status: u16, body: &str) -> TrackingError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    TrackingError::Api {
        status,
        code: if parsed.error_code.is_empty() {
            "UNKNOWN".to_string()
        } else {
            parsed.error_code
        },
        message: if parsed.message.is_empty() {
            body.to_string()
        } else {
            parsed.message
        },
    }
}

fn copy_local(root: &Path, artifact_path: &str, local_path: &Path) -> Result<(), TrackingError> {
    let io_error = |path: &Path| {
        let path = path.display().to_string();
        move |source| TrackingError::Io { path, source }
    };
    let dir = root.join(artifact_path);
    std::fs::create_dir_all(&dir).map_err(io_error(&dir))?;
    let file_name = local_path.file_name().ok_or_else(|| TrackingError::Io {
        path: local_path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
    })?;
    std::fs::copy(local_path, dir.join(file_name)).map_err(io_error(local_path))?;
    Ok(())
}

impl ExperimentTracker for MlflowClient {
    fn start_run(&self, experiment: &str) -> Result<RunInfo, TrackingError> {
        let experiment_id = self.get_or_create_experiment(experiment)?;
        let resp: RunResponse = self.post(
            "api/2.0/mlflow/runs/create",
            &CreateRunRequest {
                experiment_id: &experiment_id,
                start_time: Utc::now().timestamp_millis(),
                tags: vec![RunTag {
                    key: "mlflow.source.name",
                    value: env!("CARGO_PKG_NAME").to_string(),
                }],
            },
        )?;
        let info = resp.run.info;
        info!("Started MLflow run {} in experiment {}", info.run_id, info.experiment_id);
        Ok(RunInfo {
            run_id: info.run_id,
            experiment_id: info.experiment_id,
            artifact_uri: info.artifact_uri,
        })
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<(), TrackingError> {
        let _: serde::de::IgnoredAny = self.post(
            "api/2.0/mlflow/runs/log-parameter",
            &LogParamRequest { run_id, key, value },
        )?;
        Ok(())
    }

    fn log_metrics(&self, run_id: &str, metrics: &BTreeMap<String, f64>) -> Result<(), TrackingError> {
        if metrics.is_empty() {
            return Ok(());
        }
        let timestamp = Utc::now().timestamp_millis();
        let batch = LogBatchRequest {
            run_id,
            metrics: metrics
                .iter()
                .map(|(key, value)| MlflowMetric {
                    key,
                    value: *value,
                    timestamp,
                    step: 0,
                })
                .collect(),
        };
        let _: serde::de::IgnoredAny = self.post("api/2.0/mlflow/runs/log-batch", &batch)?;
        debug!("Logged {} metrics to run {}", metrics.len(), run_id);
        Ok(())
    }

    fn log_artifact(&self, run: &RunInfo, local_path: &Path, artifact_path: &str) -> Result<(), TrackingError> {
        match ArtifactDestination::from_uri(&run.artifact_uri)? {
            ArtifactDestination::Proxied(root) => self.upload(&root, artifact_path, local_path)?,
            ArtifactDestination::Local(root) => copy_local(&root, artifact_path, local_path)?,
        }
        info!("Logged artifact {:?} under {}", local_path, artifact_path);
        Ok(())
    }

    fn list_artifacts(&self, run_id: &str, path: &str) -> Result<Vec<ArtifactInfo>, TrackingError> {
        let resp: ListArtifactsResponse = self.get(
            "api/2.0/mlflow/artifacts/list",
            &[("run_id", run_id), ("path", path)],
        )?;
        Ok(resp
            .files
            .into_iter()
            .map(|f| ArtifactInfo {
                path: f.path,
                is_dir: f.is_dir,
                file_size: f.file_size,
            })
            .collect())
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<(), TrackingError> {
        let _: serde::de::IgnoredAny = self.post(
            "api/2.0/mlflow/runs/update",
            &UpdateRunRequest {
                run_id,
                status: status.as_str(),
                end_time: Utc::now().timestamp_millis(),
            },
        )?;
        info!("Ended MLflow run {} as {}", run_id, status.as_str());
        Ok(())
    }
}
