//! Model settings and the experiment configuration read by the binary.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Options of the adaptive naive Bayes classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnbcSettings {
    /// Number of training-likelihood standard deviations below the mean at
    /// which a prediction is rejected.
    pub null_rejection_coeff: f64,
    /// Scale inputs into `[0, 1]` using the training ranges.
    pub use_scaling: bool,
    /// Report the null class when the best likelihood falls below its
    /// class threshold.
    pub use_null_rejection: bool,
}

impl Default for AnbcSettings {
    fn default() -> Self {
        Self {
            null_rejection_coeff: 10.0,
            use_scaling: false,
            use_null_rejection: false,
        }
    }
}

impl AnbcSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.null_rejection_coeff > 0.0) {
            return Err(Error::invalid_parameter(
                "null_rejection_coeff",
                self.null_rejection_coeff,
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Options of the gradient descent linear regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearRegressionSettings {
    pub learning_rate: f64,
    pub max_epochs: usize,
    /// Training stops once the epoch error changes by no more than this.
    pub min_change: f64,
    pub use_scaling: bool,
    /// Seed for weight initialisation and sample ordering.
    pub seed: Option<u64>,
}

impl Default for LinearRegressionSettings {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            max_epochs: 500,
            min_change: 1.0e-5,
            use_scaling: false,
            seed: None,
        }
    }
}

impl LinearRegressionSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0) || !self.learning_rate.is_finite() {
            return Err(Error::invalid_parameter(
                "learning_rate",
                self.learning_rate,
                "must be a positive finite number",
            ));
        }
        if self.max_epochs == 0 {
            return Err(Error::invalid_parameter(
                "max_epochs",
                self.max_epochs,
                "must be at least 1",
            ));
        }
        if !(self.min_change >= 0.0) {
            return Err(Error::invalid_parameter(
                "min_change",
                self.min_change,
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// Everything the command line drivers can take from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub classifier: AnbcSettings,
    pub regression: LinearRegressionSettings,
    /// Percentage of a single dataset kept for training when partitioning.
    pub training_percentage: f64,
    pub stratified: bool,
    /// Seed for dataset partitioning.
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            classifier: AnbcSettings {
                null_rejection_coeff: 10.0,
                use_scaling: true,
                use_null_rejection: true,
            },
            regression: LinearRegressionSettings::default(),
            training_percentage: 80.0,
            stratified: false,
            seed: None,
        }
    }
}

impl ExperimentConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()?;
        self.regression.validate()?;
        crate::data::check_percentage(self.training_percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AnbcSettings::default().validate().is_ok());
        assert!(LinearRegressionSettings::default().validate().is_ok());
        assert!(ExperimentConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let anbc = AnbcSettings {
            null_rejection_coeff: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            anbc.validate(),
            Err(Error::InvalidParameter { .. })
        ));

        let lr = LinearRegressionSettings {
            learning_rate: f64::NAN,
            ..Default::default()
        };
        assert!(lr.validate().is_err());

        let lr = LinearRegressionSettings {
            max_epochs: 0,
            ..Default::default()
        };
        assert!(lr.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "classifier": { "null_rejection_coeff": 2.5 }, "seed": 9 }"#;
        let config: ExperimentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.classifier.null_rejection_coeff, 2.5);
        assert!(!config.classifier.use_scaling);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.training_percentage, 80.0);
        assert_eq!(config.regression, LinearRegressionSettings::default());
    }
}
