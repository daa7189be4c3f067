//! Data and target drift between a reference and a production dataset

mod extract;
mod html;
mod report;
pub mod stattests;

pub use extract::{extract_drift, extract_target_drift};
pub use report::{DataDriftReport, TargetDriftReport};

/// File name of the saved data drift report.
pub const DATA_DRIFT_REPORT_FILE: &str = "data_drift_report.html";

/// File name of the saved target drift report.
pub const TARGET_DRIFT_REPORT_FILE: &str = "target_drift_report.html";
