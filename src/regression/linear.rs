//! Single-output linear regression fitted by stochastic gradient descent.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::Regressifier;
use crate::config::LinearRegressionSettings;
use crate::data::RegressionData;
use crate::error::{Error, Result};
use crate::persistence::Persistent;
use crate::scaling::{self, MinMax};

/// `y = w0 + w · x`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    settings: LinearRegressionSettings,
    num_input_dimensions: usize,
    w0: f64,
    w: Vec<f64>,
    input_ranges: Vec<MinMax>,
    target_range: Option<MinMax>,
    epochs_trained: usize,
    total_squared_training_error: f64,
    root_mean_squared_training_error: f64,
    trained: bool,
    #[serde(skip)]
    regression_data: Vec<f64>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: LinearRegressionSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::default()
        })
    }

    pub fn settings(&self) -> &LinearRegressionSettings {
        &self.settings
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> Result<()> {
        let settings = LinearRegressionSettings {
            learning_rate,
            ..self.settings.clone()
        };
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn set_max_epochs(&mut self, max_epochs: usize) -> Result<()> {
        let settings = LinearRegressionSettings {
            max_epochs,
            ..self.settings.clone()
        };
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn set_min_change(&mut self, min_change: f64) -> Result<()> {
        let settings = LinearRegressionSettings {
            min_change,
            ..self.settings.clone()
        };
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.settings.seed = seed;
    }

    /// Bias and weights, in scaled units when scaling is enabled.
    pub fn weights(&self) -> (f64, &[f64]) {
        (self.w0, &self.w)
    }

    pub fn epochs_trained(&self) -> usize {
        self.epochs_trained
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        self.w0 + self.w.iter().zip(x.iter()).map(|(w, x)| w * x).sum::<f64>()
    }
}

impl Regressifier for LinearRegression {
    fn train(&mut self, data: &RegressionData) -> Result<()> {
        self.clear();
        self.settings.validate()?;

        if data.is_empty() {
            return Err(Error::Training("training data is empty".to_string()));
        }
        if data.num_target_dimensions() != 1 {
            return Err(Error::InvalidData(format!(
                "linear regression needs exactly one target dimension, data has {}",
                data.num_target_dimensions()
            )));
        }

        let n = data.num_input_dimensions();
        let scaled;
        let training: &RegressionData = if self.settings.use_scaling {
            let input_ranges = data.input_ranges();
            let target_ranges = data.target_ranges();
            scaled = data.scaled(&input_ranges, &target_ranges);
            self.input_ranges = input_ranges;
            self.target_range = target_ranges.first().copied();
            &scaled
        } else {
            data
        };

        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.w0 = rng.gen_range(-0.1..0.1);
        self.w = (0..n).map(|_| rng.gen_range(-0.1..0.1)).collect();

        let learning_rate = self.settings.learning_rate;
        let mut order: Vec<usize> = (0..training.num_samples()).collect();
        let mut last_error = 0.0;
        let mut epoch = 0;
        while epoch < self.settings.max_epochs {
            order.shuffle(&mut rng);
            let mut epoch_error = 0.0;
            for &i in &order {
                let sample = &training[i];
                let error = sample.target()[0] - self.evaluate(sample.input());
                self.w0 += learning_rate * error;
                for (w, &x) in self.w.iter_mut().zip(sample.input().iter()) {
                    *w += learning_rate * error * x;
                }
                epoch_error += error * error;
            }
            epoch += 1;

            if !epoch_error.is_finite() {
                return Err(Error::Training(format!(
                    "training error diverged at epoch {}, try a lower learning rate or enable scaling",
                    epoch
                )));
            }

            let delta = (epoch_error - last_error).abs();
            tracing::debug!(epoch, error = epoch_error, delta, "linear regression epoch");
            if delta <= self.settings.min_change {
                break;
            }
            last_error = epoch_error;
        }

        self.num_input_dimensions = n;
        self.epochs_trained = epoch;
        self.trained = true;

        let (total, rms) = super::training_error(self, data)?;
        self.total_squared_training_error = total;
        self.root_mean_squared_training_error = rms;
        tracing::info!(
            samples = data.num_samples(),
            epochs = epoch,
            rms_error = rms,
            "linear regression trained"
        );
        Ok(())
    }

    fn predict(&mut self, input: &[f64]) -> Result<()> {
        if !self.trained {
            return Err(Error::NotTrained);
        }
        if input.len() != self.num_input_dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.num_input_dimensions,
                actual: input.len(),
            });
        }

        let y = match self.target_range {
            Some(target_range) if self.settings.use_scaling => {
                let x = scaling::scale_vector(input, &self.input_ranges);
                target_range.unscale(self.evaluate(&x), 0.0, 1.0)
            }
            _ => self.evaluate(input),
        };
        self.regression_data = vec![y];
        Ok(())
    }

    fn regression_data(&self) -> &[f64] {
        &self.regression_data
    }

    fn is_trained(&self) -> bool {
        self.trained
    }

    fn num_input_dimensions(&self) -> usize {
        self.num_input_dimensions
    }

    fn num_output_dimensions(&self) -> usize {
        if self.trained {
            1
        } else {
            0
        }
    }

    fn total_squared_training_error(&self) -> f64 {
        self.total_squared_training_error
    }

    fn root_mean_squared_training_error(&self) -> f64 {
        self.root_mean_squared_training_error
    }

    fn use_scaling(&self) -> bool {
        self.settings.use_scaling
    }

    fn enable_scaling(&mut self, use_scaling: bool) {
        self.settings.use_scaling = use_scaling;
    }

    fn clear(&mut self) {
        self.num_input_dimensions = 0;
        self.w0 = 0.0;
        self.w.clear();
        self.input_ranges.clear();
        self.target_range = None;
        self.epochs_trained = 0;
        self.total_squared_training_error = 0.0;
        self.root_mean_squared_training_error = 0.0;
        self.trained = false;
        self.regression_data.clear();
    }
}

impl Persistent for LinearRegression {
    const FORMAT: &'static str = "patternkit.linear_regression";
}
