pub mod dataset;
pub mod drift;
pub mod errors;
pub mod metrics;
pub mod ports;
