//! patternkit - small supervised learning toolkit
//!
//! - [`data`] - classification and regression datasets, file loading,
//!   partitioning
//! - [`classification`] - adaptive naive Bayes classifier with null rejection
//! - [`regression`] - linear regression and per-target multi-output regression
//! - [`pipeline`] - single-module train/test/predict wrapper with metrics
//! - [`metrics`] - accuracy, confusion matrix, RMS error
//! - [`results`] - per-sample result files
//!
//! Models and pipelines persist as JSON through [`Persistent`].

pub mod classification;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod pipeline;
pub mod regression;
pub mod results;
pub mod scaling;

/// Label reported when a classifier rejects a sample. Never a valid
/// training label.
pub const NULL_CLASS_LABEL: u32 = 0;

pub use classification::{Anbc, Classifier};
pub use config::{AnbcSettings, ExperimentConfig, LinearRegressionSettings};
pub use data::{ClassificationData, ClassificationSample, RegressionData, RegressionSample};
pub use error::{Error, Result};
pub use persistence::Persistent;
pub use pipeline::Pipeline;
pub use regression::{LinearRegression, MultidimensionalRegression, Regressifier};
