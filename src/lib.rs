//! Image anomaly detection toolkit: model training, video region capture,
//! blob store retrieval and score inspection.

pub mod blobstore;
pub mod model;
pub mod plot;
pub mod selector;
pub mod source;
pub mod stats;
pub mod tracking;
pub mod vision;

pub use blobstore::{recording_label, ConnectionString, ContainerClient};
pub use model::AnomalyModel;
pub use selector::{SelectorConfig, SelectorSession};
pub use source::{FrameSource, VideoFileSource};
pub use tracking::{Experiment, Run};
