//! Multi-output regression built from one single-output model per target.

use serde::{Deserialize, Serialize};

use super::{LinearRegression, Regressifier};
use crate::data::RegressionData;
use crate::error::{Error, Result};
use crate::persistence::Persistent;
use crate::scaling::{self, MinMax};

/// Trains an independent copy of `template` for every target dimension.
///
/// When scaling is enabled it is applied here, once, and the per-target
/// models are trained with their own scaling turned off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultidimensionalRegression<R = LinearRegression> {
    template: R,
    use_scaling: bool,
    regressifiers: Vec<R>,
    num_input_dimensions: usize,
    input_ranges: Vec<MinMax>,
    target_ranges: Vec<MinMax>,
    total_squared_training_error: f64,
    root_mean_squared_training_error: f64,
    trained: bool,
    #[serde(skip)]
    regression_data: Vec<f64>,
}

impl<R> MultidimensionalRegression<R>
where
    R: Regressifier + Clone,
{
    pub fn new(template: R, use_scaling: bool) -> Self {
        Self {
            template,
            use_scaling,
            regressifiers: Vec::new(),
            num_input_dimensions: 0,
            input_ranges: Vec::new(),
            target_ranges: Vec::new(),
            total_squared_training_error: 0.0,
            root_mean_squared_training_error: 0.0,
            trained: false,
            regression_data: Vec::new(),
        }
    }

    pub fn template(&self) -> &R {
        &self.template
    }

    /// Replaces the model cloned for each target. Drops any trained state.
    pub fn set_template(&mut self, template: R) {
        self.template = template;
        self.clear();
    }

    pub fn num_regressifiers(&self) -> usize {
        self.regressifiers.len()
    }

    pub fn regressifier(&self, index: usize) -> Option<&R> {
        self.regressifiers.get(index)
    }
}

impl<R> Regressifier for MultidimensionalRegression<R>
where
    R: Regressifier + Clone,
{
    fn train(&mut self, data: &RegressionData) -> Result<()> {
        self.clear();

        if data.is_empty() {
            return Err(Error::Training("training data is empty".to_string()));
        }
        let num_targets = data.num_target_dimensions();
        if num_targets == 0 {
            return Err(Error::InvalidData(
                "training data has no target dimensions".to_string(),
            ));
        }

        let scaled;
        let training: &RegressionData = if self.use_scaling {
            let input_ranges = data.input_ranges();
            let target_ranges = data.target_ranges();
            scaled = data.scaled(&input_ranges, &target_ranges);
            self.input_ranges = input_ranges;
            self.target_ranges = target_ranges;
            &scaled
        } else {
            data
        };

        let mut regressifiers = Vec::with_capacity(num_targets);
        for t in 0..num_targets {
            tracing::info!(target_index = t, num_targets, "training regressifier");
            let projection = training.target_projection(t)?;
            let mut model = self.template.clone();
            model.clear();
            model.enable_scaling(false);
            model
                .train(&projection)
                .map_err(|err| Error::Training(format!("target {}: {}", t, err)))?;
            if model.num_output_dimensions() != 1 {
                return Err(Error::Training(format!(
                    "target {}: regressifier produced {} outputs, expected 1",
                    t,
                    model.num_output_dimensions()
                )));
            }
            regressifiers.push(model);
        }

        self.num_input_dimensions = data.num_input_dimensions();
        self.regressifiers = regressifiers;
        self.trained = true;

        let (total, rms) = super::training_error(self, data)?;
        self.total_squared_training_error = total;
        self.root_mean_squared_training_error = rms;
        tracing::info!(
            samples = data.num_samples(),
            targets = num_targets,
            rms_error = rms,
            "multidimensional regression trained"
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

        let scaled;
        let x: &[f64] = if self.use_scaling {
            scaled = scaling::scale_vector(input, &self.input_ranges);
            &scaled
        } else {
            input
        };

        let mut output = Vec::with_capacity(self.regressifiers.len());
        for (t, model) in self.regressifiers.iter_mut().enumerate() {
            model.predict(x)?;
            let y = model.regression_data().first().copied().ok_or_else(|| {
                Error::Prediction(format!("regressifier {} returned no output", t))
            })?;
            output.push(match self.target_ranges.get(t) {
                Some(range) if self.use_scaling => range.unscale(y, 0.0, 1.0),
                _ => y,
            });
        }
        self.regression_data = output;
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
        self.regressifiers.len()
    }

    fn total_squared_training_error(&self) -> f64 {
        self.total_squared_training_error
    }

    fn root_mean_squared_training_error(&self) -> f64 {
        self.root_mean_squared_training_error
    }

    fn use_scaling(&self) -> bool {
        self.use_scaling
    }

    fn enable_scaling(&mut self, use_scaling: bool) {
        self.use_scaling = use_scaling;
    }

    fn clear(&mut self) {
        self.regressifiers.clear();
        self.num_input_dimensions = 0;
        self.input_ranges.clear();
        self.target_ranges.clear();
        self.total_squared_training_error = 0.0;
        self.root_mean_squared_training_error = 0.0;
        self.trained = false;
        self.regression_data.clear();
    }
}

impl Persistent for MultidimensionalRegression<LinearRegression> {
    const FORMAT: &'static str = "patternkit.multidimensional_regression";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinearRegressionSettings;

    fn template() -> LinearRegression {
        LinearRegression::with_settings(LinearRegressionSettings {
            learning_rate: 0.1,
            max_epochs: 2000,
            min_change: 1.0e-12,
            use_scaling: false,
            seed: Some(17),
        })
        .unwrap()
    }

    /// Three targets, each a different plane over two inputs.
    fn planes() -> RegressionData {
        let mut data = RegressionData::new(2, 3);
        for i in 0..10 {
            for j in 0..5 {
                let (a, b) = (i as f64 * 0.5, j as f64 * 3.0);
                data.add_sample(
                    vec![a, b],
                    vec![a + b, 10.0 - 2.0 * a, 0.5 * b - 4.0],
                )
                .unwrap();
            }
        }
        data
    }

    #[test]
    fn test_one_model_per_target() {
        let data = planes();
        let mut mdr = MultidimensionalRegression::new(template(), true);
        mdr.train(&data).unwrap();

        assert_eq!(mdr.num_regressifiers(), 3);
        assert_eq!(mdr.num_output_dimensions(), 3);
        for t in 0..3 {
            assert!(!mdr.regressifier(t).unwrap().use_scaling());
        }

        mdr.predict(&[2.0, 6.0]).unwrap();
        let expected = [8.0, 6.0, -1.0];
        for (y, e) in mdr.regression_data().iter().zip(expected.iter()) {
            assert!((y - e).abs() < 0.25, "predicted {} expected {}", y, e);
        }
        assert!(mdr.root_mean_squared_training_error() < 0.1);
        // Inner models report errors against the scaled projections.
        let inner_total: f64 = (0..3)
            .map(|t| mdr.regressifier(t).unwrap().total_squared_training_error())
            .sum();
        assert!(inner_total <= mdr.total_squared_training_error());
    }

    #[test]
    fn test_without_scaling_uses_raw_units() {
        let mut data = RegressionData::new(1, 2);
        for i in 0..20 {
            let x = i as f64 / 20.0;
            data.add_sample(vec![x], vec![2.0 * x, 1.0 - x]).unwrap();
        }
        let mut mdr = MultidimensionalRegression::new(template(), false);
        mdr.train(&data).unwrap();
        let y = mdr.predict_vector(&[0.5]).unwrap();
        assert!((y[0] - 1.0).abs() < 0.05);
        assert!((y[1] - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_errors() {
        let mut mdr = MultidimensionalRegression::new(template(), true);
        assert!(matches!(mdr.predict(&[1.0, 2.0]), Err(Error::NotTrained)));
        assert!(mdr.train(&RegressionData::new(2, 3)).is_err());

        mdr.train(&planes()).unwrap();
        assert!(matches!(
            mdr.predict(&[1.0]),
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdr.json");
        let mut mdr = MultidimensionalRegression::new(template(), true);
        mdr.train(&planes()).unwrap();
        mdr.save_model_to_file(&path).unwrap();

        let mut loaded = MultidimensionalRegression::<LinearRegression>::default();
        loaded.load_model_from_file(&path).unwrap();
        assert_eq!(loaded.num_regressifiers(), 3);
        assert_eq!(
            mdr.predict_vector(&[1.5, 4.0]).unwrap(),
            loaded.predict_vector(&[1.5, 4.0]).unwrap()
        );
    }
}
