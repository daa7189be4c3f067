use crate::domain::errors::ModelError;
use crate::domain::metrics::Evaluation;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Row indices of a train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n` with a seeded RNG and holds out `ceil(test_size * n)` rows.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> Result<TrainTestSplit, ModelError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ModelError::InvalidTestSize(test_size));
    }
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(ModelError::InsufficientData { need: 2, got: n });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(TrainTestSplit {
        train,
        test: indices,
    })
}

/// Ordinary least squares regression (SVD solver)
#[derive(Debug, Serialize, Deserialize)]
pub struct RegressionModel {
    inner: LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>,
}

impl RegressionModel {
    pub const NAME: &'static str = "LinearRegression";

    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> Result<Self, ModelError> {
        if x.len() != y.len() || x.is_empty() {
            return Err(ModelError::InsufficientData {
                need: 1,
                got: x.len().min(y.len()),
            });
        }
        let x_matrix = to_matrix(x)?;
        let params =
            LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);

        info!(
            "Training {} on {} samples x {} features...",
            Self::NAME,
            x.len(),
            x.first().map(Vec::len).unwrap_or(0)
        );
        let inner = LinearRegression::fit(&x_matrix, &y.to_vec(), params)
            .map_err(|e| ModelError::Fit(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let x_matrix = to_matrix(x)?;
        self.inner
            .predict(&x_matrix)
            .map_err(|e| ModelError::Predict(e.to_string()))
    }

    /// Predicts `x` and scores the predictions against `y`.
    pub fn evaluate(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Evaluation, ModelError> {
        let predictions = self.predict(x)?;
        Ok(Evaluation::compute(y, &predictions))
    }

    /// Writes the model as JSON, creating parent directories.
    pub fn save_json(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        serde_json::to_writer(&mut file, self).map_err(std::io::Error::other)
    }
}

fn to_matrix(x: &[Vec<f64>]) -> Result<DenseMatrix<f64>, ModelError> {
    DenseMatrix::from_2d_vec(&x.to_vec()).map_err(|e| ModelError::Matrix(e.to_string()))
}
