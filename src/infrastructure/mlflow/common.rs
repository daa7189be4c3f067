use serde::{Deserialize, Deserializer, Serialize};

// ===== Requests =====

#[derive(Debug, Serialize)]
pub(super) struct CreateExperimentRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateRunRequest<'a> {
    pub experiment_id: &'a str,
    pub start_time: i64,
    pub tags: Vec<RunTag<'a>>,
}

#[derive(Debug, Serialize)]
pub(super) struct RunTag<'a> {
    pub key: &'a str,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub(super) struct LogParamRequest<'a> {
    pub run_id: &'a str,
    pub key: &'a str,
    pub value: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct LogBatchRequest<'a> {
    pub run_id: &'a str,
    pub metrics: Vec<MlflowMetric<'a>>,
}

#[derive(Debug, Serialize)]
pub(super) struct MlflowMetric<'a> {
    pub key: &'a str,
    pub value: f64,
    pub timestamp: i64,
    pub step: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct UpdateRunRequest<'a> {
    pub run_id: &'a str,
    pub status: &'a str,
    pub end_time: i64,
}

// ===== Responses =====

#[derive(Debug, Deserialize)]
pub(super) struct GetExperimentResponse {
    pub experiment: MlflowExperiment,
}

#[derive(Debug, Deserialize)]
pub(super) struct MlflowExperiment {
    pub experiment_id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateExperimentResponse {
    pub experiment_id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct RunResponse {
    pub run: MlflowRun,
}

#[derive(Debug, Deserialize)]
pub(super) struct MlflowRun {
    pub info: MlflowRunInfo,
}

#[derive(Debug, Deserialize)]
pub(super) struct MlflowRunInfo {
    pub run_id: String,
    pub experiment_id: String,
    #[serde(default)]
    pub artifact_uri: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListArtifactsResponse {
    #[serde(default)]
    pub files: Vec<MlflowFileInfo>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MlflowFileInfo {
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default, deserialize_with = "number_or_string")]
    pub file_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApiErrorBody {
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub message: String,
}

/// Error code returned when a lookup finds nothing.
pub(super) const RESOURCE_DOES_NOT_EXIST: &str = "RESOURCE_DOES_NOT_EXIST";

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Number(u64),
    Text(String),
}

// Servers disagree on whether int64 fields are JSON numbers or strings.
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<SizeRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(SizeRepr::Number(n)) => Ok(Some(n)),
        Some(SizeRepr::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
