//! Daily-cost regression model.
//!
//! Wraps a SmartCore random-forest regressor over two features, mean
//! temperature and month-of-year, with daily cost as the target. Parameters
//! mirror the analysis this service replaces: 100 trees, fixed seed, no
//! hyperparameter search.

use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use thiserror::Error;

/// Minimum number of training rows to fit on.
const MIN_TRAINING_ROWS: usize = 2;

/// Features per row: [mean temperature °C, month-of-year].
pub const FEATURE_COUNT: usize = 2;

/// Errors from model training or prediction.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("not enough training data: need at least {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("training failed: {0}")]
    Training(String),
    #[error("prediction failed: {0}")]
    Prediction(String),
}

/// A fitted daily-cost model.
pub struct CostModel {
    model: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    /// Number of rows the model was fitted on.
    pub training_samples: usize,
    /// Mean squared error over the training rows.
    pub training_mse: f64,
}

impl CostModel {
    /// Fit the forest on `(features, targets)` rows.
    pub fn train(features: &[[f64; FEATURE_COUNT]], targets: &[f64]) -> Result<Self, ModelError> {
        if features.len() < MIN_TRAINING_ROWS {
            return Err(ModelError::InsufficientData {
                required: MIN_TRAINING_ROWS,
                actual: features.len(),
            });
        }
        if features.len() != targets.len() {
            return Err(ModelError::Training(format!(
                "feature and target count mismatch: {} features, {} targets",
                features.len(),
                targets.len()
            )));
        }

        let x = to_dense_matrix(features);
        let y = targets.to_vec();

        // 100 trees, fixed seed, remaining parameters at their defaults —
        // retraining on the same bills must yield the same forecast.
        let params = RandomForestRegressorParameters {
            max_depth: None,
            min_samples_leaf: 1,
            min_samples_split: 2,
            n_trees: 100,
            m: None,
            keep_samples: false,
            seed: 42,
        };

        let model = RandomForestRegressor::fit(&x, &y, params)
            .map_err(|e| ModelError::Training(format!("{:?}", e)))?;

        // Training-set MSE, reported alongside the forecast so a wildly
        // underfit model is visible in the response.
        let fitted = model
            .predict(&x)
            .map_err(|e| ModelError::Prediction(format!("{:?}", e)))?;
        let training_mse = fitted
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| (p - t) * (p - t))
            .sum::<f64>()
            / targets.len() as f64;

        Ok(Self {
            model,
            training_samples: targets.len(),
            training_mse,
        })
    }

    /// Predict the daily cost for each feature row.
    pub fn predict(&self, features: &[[f64; FEATURE_COUNT]]) -> Result<Vec<f64>, ModelError> {
        if features.is_empty() {
            return Ok(vec![]);
        }
        let x = to_dense_matrix(features);
        self.model
            .predict(&x)
            .map_err(|e| ModelError::Prediction(format!("{:?}", e)))
    }
}

fn to_dense_matrix(features: &[[f64; FEATURE_COUNT]]) -> DenseMatrix<f64> {
    let mut flat = Vec::with_capacity(features.len() * FEATURE_COUNT);
    for row in features {
        flat.extend_from_slice(row);
    }
    DenseMatrix::new(features.len(), FEATURE_COUNT, flat, false)
}
