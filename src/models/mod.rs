//! Trained regressor loading and inference

pub mod inference;
pub mod loader;

pub use inference::{OnnxRegressor, PredictionExecutor, Regressor, Scored};
pub use loader::ModelLoader;
