//! Outlier model over fixed-size images.
//!
//! Images are grayscaled and flattened into feature vectors, then scored
//! by an isolation forest. The decision threshold used by the binaries
//! lives here so trainer and scorer agree on it.

mod forest;

pub use forest::IsolationForest;

use crate::vision;
use image::RgbImage;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decision scores below this value classify an image as anomalous.
pub const DEFAULT_THRESHOLD: f64 = 0.005;

/// Fixed seed so repeated training runs on the same data agree.
const MODEL_SEED: u64 = 42;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("cannot fit a model on an empty training set")]
    EmptyTrainingSet,
    #[error("image dimensions {actual:?} do not match the expected {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Isolation forest plus the image dimensions it was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyModel {
    forest: IsolationForest,
    width: u32,
    height: u32,
}

impl AnomalyModel {
    /// Fit a model on equal-sized training images.
    pub fn fit(images: &[RgbImage]) -> Result<Self, ModelError> {
        let first = images.first().ok_or(ModelError::EmptyTrainingSet)?;
        let (width, height) = first.dimensions();

        let mut rows = Vec::with_capacity(images.len());
        for img in images {
            if img.dimensions() != (width, height) {
                return Err(ModelError::DimensionMismatch {
                    expected: (width, height),
                    actual: img.dimensions(),
                });
            }
            rows.push(vision::flatten(&vision::to_grayscale(img)));
        }

        let n_features = (width * height) as usize;
        let mut data = Array2::zeros((rows.len(), n_features));
        for (mut dst, src) in data.rows_mut().into_iter().zip(&rows) {
            for (cell, &v) in dst.iter_mut().zip(src) {
                *cell = v;
            }
        }

        tracing::info!(
            "Fitting isolation forest on {} images ({} features each)",
            rows.len(),
            n_features
        );
        let forest = IsolationForest::fit(&data, MODEL_SEED);

        Ok(Self {
            forest,
            width,
            height,
        })
    }

    /// Signed anomaly score for an image of the training dimensions.
    pub fn decision_function(&self, image: &RgbImage) -> Result<f64, ModelError> {
        if image.dimensions() != (self.width, self.height) {
            return Err(ModelError::DimensionMismatch {
                expected: (self.width, self.height),
                actual: image.dimensions(),
            });
        }
        let features = Array1::from_vec(vision::flatten(&vision::to_grayscale(image)));
        Ok(self.forest.decision_function(&features.view()))
    }

    /// Whether the image scores below `threshold`.
    pub fn is_anomaly(&self, image: &RgbImage, threshold: f64) -> Result<bool, ModelError> {
        Ok(self.decision_function(image)? < threshold)
    }

    /// Dimensions (width, height) the model expects for scoring.
    pub fn expected_dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
