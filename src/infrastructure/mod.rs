pub mod csv_loader;
pub mod http_client_factory;
pub mod mlflow;
pub mod observability;

pub use csv_loader::load_dataset;
pub use http_client_factory::HttpClientFactory;
pub use mlflow::MlflowClient;
