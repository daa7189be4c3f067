//! MLflow experiment tracking over the REST API

mod client;
mod common;

pub use client::{ArtifactDestination, MlflowClient};
