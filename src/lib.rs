//! exampass — serves pass/fail predictions for student exam results.
//!
//! A previously trained classifier and its per-column label encoders are
//! loaded from disk once at startup. Each form submission carries four
//! categorical fields (gender, race/ethnicity, lunch, test preparation
//! course), which are encoded to integer codes and scored by the model:
//!
//! - **PASS**: the model predicts the positive class (label `1`)
//! - **FAIL**: any other predicted class
//!
//! The pass probability shown alongside is always the model's probability
//! for class index 1.
//!
//! Uses structured logging via [`tracing`]. Set the `RUST_LOG` environment
//! variable to control log verbosity (e.g., `RUST_LOG=exampass=debug`).

pub mod artifacts;
pub mod encoder;
pub mod model;
pub mod predict;
pub mod server;
pub mod ui;

pub use artifacts::{Artifacts, LoadError, LoadState};
pub use encoder::{EncodeError, EncoderSet, LabelEncoder};
pub use model::{Classifier, Model, ModelError};
pub use predict::{predict, Outcome, Prediction, PredictError, PredictionForm};
