//! Adaptive naive Bayes classifier.
//!
//! Each class is modelled by one independent Gaussian per input dimension.
//! The log-likelihood of a sample under its class model doubles as a
//! distance: the training samples of each class give a mean and standard
//! deviation of that likelihood, and anything more than
//! `null_rejection_coeff` standard deviations below the mean can be
//! rejected as belonging to no class at all.

use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap};
use std::f64::consts::PI;

use super::Classifier;
use crate::config::AnbcSettings;
use crate::data::ClassificationData;
use crate::error::{Error, Result};
use crate::persistence::Persistent;
use crate::scaling::{self, MinMax};
use crate::NULL_CLASS_LABEL;

/// Floor applied to each per-dimension log-likelihood term.
const MIN_LOG_LIKELIHOOD: f64 = -1000.0;
/// Replacement for a zero standard deviation.
const MIN_SIGMA: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ClassModel {
    class_label: u32,
    mu: Vec<f64>,
    sigma: Vec<f64>,
    weights: Vec<f64>,
    training_mu: f64,
    training_sigma: f64,
    threshold: f64,
}

impl ClassModel {
    fn fit(
        class_label: u32,
        samples: &[Vec<f64>],
        weights: Vec<f64>,
        gamma: f64,
    ) -> Result<Self> {
        let m = samples.len() as f64;
        let n = weights.len();

        let mut mu = vec![0.0; n];
        for sample in samples {
            for (mu_j, &x) in mu.iter_mut().zip(sample.iter()) {
                *mu_j += x;
            }
        }
        mu.iter_mut().for_each(|mu_j| *mu_j /= m);

        let mut sigma = vec![0.0; n];
        for sample in samples {
            for ((sigma_j, &mu_j), &x) in sigma.iter_mut().zip(mu.iter()).zip(sample.iter()) {
                *sigma_j += (x - mu_j).powi(2);
            }
        }
        let divisor = if samples.len() > 1 { m - 1.0 } else { m };
        for (j, sigma_j) in sigma.iter_mut().enumerate() {
            *sigma_j = (*sigma_j / divisor).sqrt();
            if *sigma_j == 0.0 {
                tracing::warn!(
                    class_label,
                    dimension = j,
                    "standard deviation is zero, using {}",
                    MIN_SIGMA
                );
                *sigma_j = MIN_SIGMA;
            }
        }

        let mut model = Self {
            class_label,
            mu,
            sigma,
            weights,
            training_mu: 0.0,
            training_sigma: 0.0,
            threshold: 0.0,
        };

        let likelihoods: Vec<f64> = samples.iter().map(|x| model.log_likelihood(x)).collect();
        model.training_mu = likelihoods.iter().sum::<f64>() / m;
        model.training_sigma = if samples.len() > 1 {
            (likelihoods
                .iter()
                .map(|l| (l - model.training_mu).powi(2))
                .sum::<f64>()
                / (m - 1.0))
                .sqrt()
        } else {
            0.0
        };
        model.recompute_threshold(gamma);
        model.check_finite()?;
        Ok(model)
    }

    /// Statistics must stay finite to be usable and persistable.
    fn check_finite(&self) -> Result<()> {
        let finite = self
            .mu
            .iter()
            .chain(self.sigma.iter())
            .chain([self.training_mu, self.training_sigma, self.threshold].iter())
            .all(|v| v.is_finite());
        if finite {
            Ok(())
        } else {
            Err(Error::Training(format!(
                "class {} model is not finite, the feature values are too large",
                self.class_label
            )))
        }
    }

    fn log_likelihood(&self, x: &[f64]) -> f64 {
        x.iter()
            .zip(self.mu.iter())
            .zip(self.sigma.iter())
            .zip(self.weights.iter())
            .filter(|(_, w)| **w > 0.0)
            .map(|(((&x, &mu), &sigma), &w)| {
                // ln(w * N(x; mu, sigma))
                let term = w.ln()
                    - (2.0 * PI).sqrt().ln()
                    - sigma.ln()
                    - (x - mu).powi(2) / (2.0 * sigma * sigma);
                term.max(MIN_LOG_LIKELIHOOD)
            })
            .sum()
    }

    fn recompute_threshold(&mut self, gamma: f64) {
        self.threshold = self.training_mu - self.training_sigma * gamma;
    }
}

/// Output of the most recent prediction. Not persisted.
#[derive(Debug, Clone, Default, PartialEq)]
struct Prediction {
    class_label: u32,
    max_likelihood: f64,
    best_distance: f64,
    class_likelihoods: Vec<f64>,
    class_distances: Vec<f64>,
}

/// Adaptive naive Bayes classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Anbc {
    settings: AnbcSettings,
    /// Optional per-class dimension weights, keyed by class label.
    weights: BTreeMap<u32, Vec<f64>>,
    num_input_dimensions: usize,
    ranges: Vec<MinMax>,
    class_labels: Vec<u32>,
    models: Vec<ClassModel>,
    trained: bool,
    #[serde(skip)]
    prediction: Prediction,
}

impl Anbc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: AnbcSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::default()
        })
    }

    pub fn settings(&self) -> &AnbcSettings {
        &self.settings
    }

    /// Sets the rejection coefficient, updating the thresholds of a trained
    /// model in place.
    pub fn set_null_rejection_coeff(&mut self, coeff: f64) -> Result<()> {
        if !(coeff > 0.0) {
            return Err(Error::invalid_parameter(
                "null_rejection_coeff",
                coeff,
                "must be greater than zero",
            ));
        }
        self.settings.null_rejection_coeff = coeff;
        for model in &mut self.models {
            model.recompute_threshold(coeff);
        }
        Ok(())
    }

    pub fn null_rejection_coeff(&self) -> f64 {
        self.settings.null_rejection_coeff
    }

    /// Takes effect at the next call to `train`.
    pub fn enable_scaling(&mut self, use_scaling: bool) {
        self.settings.use_scaling = use_scaling;
    }

    pub fn use_scaling(&self) -> bool {
        self.settings.use_scaling
    }

    pub fn enable_null_rejection(&mut self, use_null_rejection: bool) {
        self.settings.use_null_rejection = use_null_rejection;
    }

    /// Per-dimension weights for `class_label`, applied at the next `train`.
    /// A weight of zero or below removes the dimension from that class model.
    pub fn set_weights(&mut self, class_label: u32, weights: Vec<f64>) -> Result<()> {
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(Error::invalid_parameter(
                "weights",
                format!("{:?}", weights),
                "must be finite",
            ));
        }
        self.weights.insert(class_label, weights);
        Ok(())
    }

    pub fn clear_weights(&mut self) {
        self.weights.clear();
    }

    /// Rejection threshold of each class, in `class_labels` order.
    pub fn null_rejection_thresholds(&self) -> Vec<f64> {
        self.models.iter().map(|m| m.threshold).collect()
    }

    pub fn set_null_rejection_thresholds(&mut self, thresholds: &[f64]) -> Result<()> {
        if thresholds.len() != self.models.len() {
            return Err(Error::DimensionMismatch {
                expected: self.models.len(),
                actual: thresholds.len(),
            });
        }
        for (model, &threshold) in self.models.iter_mut().zip(thresholds.iter()) {
            model.threshold = threshold;
        }
        Ok(())
    }

    /// Log-likelihood of the best class in the most recent prediction.
    pub fn best_distance(&self) -> f64 {
        self.prediction.best_distance
    }

    pub fn ranges(&self) -> &[MinMax] {
        &self.ranges
    }
}

impl Classifier for Anbc {
    fn train(&mut self, data: &ClassificationData) -> Result<()> {
        self.clear();

        if data.is_empty() {
            return Err(Error::Training("training data is empty".to_string()));
        }
        let n = data.num_dimensions();
        if n == 0 {
            return Err(Error::Training("training data has no dimensions".to_string()));
        }
        for (label, weights) in &self.weights {
            if weights.len() != n {
                return Err(Error::Training(format!(
                    "weights for class {} have {} dimensions, data has {}",
                    label,
                    weights.len(),
                    n
                )));
            }
        }

        let ranges = if self.settings.use_scaling {
            data.ranges()
        } else {
            Vec::new()
        };

        // Group (optionally scaled) samples by class.
        let mut by_class: BTreeMap<u32, Vec<Vec<f64>>> = BTreeMap::new();
        for sample in data {
            let x = if self.settings.use_scaling {
                scaling::scale_vector(sample.sample(), &ranges)
            } else {
                sample.sample().to_vec()
            };
            match by_class.entry(sample.class_label()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(Vec::new()),
            }
            .push(x);
        }

        let gamma = self.settings.null_rejection_coeff;
        let models: Vec<ClassModel> = by_class
            .iter()
            .map(|(&label, samples)| {
                let weights = self
                    .weights
                    .get(&label)
                    .cloned()
                    .unwrap_or_else(|| vec![1.0; n]);
                ClassModel::fit(label, samples, weights, gamma)
            })
            .collect::<Result<_>>()?;

        for model in &models {
            tracing::debug!(
                class_label = model.class_label,
                training_mu = model.training_mu,
                training_sigma = model.training_sigma,
                threshold = model.threshold,
                "fitted class model"
            );
        }
        tracing::info!(
            samples = data.num_samples(),
            classes = models.len(),
            dimensions = n,
            "ANBC model trained"
        );

        self.num_input_dimensions = n;
        self.ranges = ranges;
        self.class_labels = models.iter().map(|m| m.class_label).collect();
        self.models = models;
        self.trained = true;
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
        let x: &[f64] = if self.settings.use_scaling {
            scaled = scaling::scale_vector(input, &self.ranges);
            &scaled
        } else {
            input
        };

        let distances: Vec<f64> = self.models.iter().map(|m| m.log_likelihood(x)).collect();
        let (best_index, best_distance) = distances.iter().enumerate().fold(
            (0, f64::NEG_INFINITY),
            |(best_index, best_distance), (k, &d)| {
                if d > best_distance {
                    (k, d)
                } else {
                    (best_index, best_distance)
                }
            },
        );
        if !best_distance.is_finite() {
            return Err(Error::Prediction(format!(
                "non-finite class likelihood for input {:?}",
                input
            )));
        }

        let mut likelihoods: Vec<f64> = distances
            .iter()
            .map(|&d| (d - best_distance).exp())
            .collect();
        let sum: f64 = likelihoods.iter().sum();
        likelihoods.iter_mut().for_each(|l| *l /= sum);

        let best = &self.models[best_index];
        let class_label =
            if self.settings.use_null_rejection && best_distance < best.threshold {
                NULL_CLASS_LABEL
            } else {
                best.class_label
            };

        self.prediction = Prediction {
            class_label,
            max_likelihood: likelihoods[best_index],
            best_distance,
            class_likelihoods: likelihoods,
            class_distances: distances,
        };
        Ok(())
    }

    fn is_trained(&self) -> bool {
        self.trained
    }

    fn num_input_dimensions(&self) -> usize {
        self.num_input_dimensions
    }

    fn class_labels(&self) -> &[u32] {
        &self.class_labels
    }

    fn predicted_class_label(&self) -> u32 {
        self.prediction.class_label
    }

    fn max_likelihood(&self) -> f64 {
        self.prediction.max_likelihood
    }

    fn class_likelihoods(&self) -> &[f64] {
        &self.prediction.class_likelihoods
    }

    fn class_distances(&self) -> &[f64] {
        &self.prediction.class_distances
    }

    fn null_rejection_enabled(&self) -> bool {
        self.settings.use_null_rejection
    }

    fn clear(&mut self) {
        self.num_input_dimensions = 0;
        self.ranges.clear();
        self.class_labels.clear();
        self.models.clear();
        self.trained = false;
        self.prediction = Prediction::default();
    }
}

impl Persistent for Anbc {
    const FORMAT: &'static str = "patternkit.anbc";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cluster_data() -> ClassificationData {
        let mut data = ClassificationData::new(2);
        let offsets = [
            (-0.4, 0.3),
            (0.2, -0.1),
            (0.0, 0.0),
            (0.5, 0.4),
            (-0.2, -0.5),
            (0.3, -0.3),
            (-0.1, 0.2),
            (0.1, 0.5),
        ];
        for &(dx, dy) in &offsets {
            data.add_sample(1, vec![1.0 + dx, 1.0 + dy]).unwrap();
            data.add_sample(2, vec![6.0 + dx, 4.0 - dy]).unwrap();
        }
        data
    }

    #[test]
    fn test_predicts_training_clusters() {
        let data = two_cluster_data();
        let mut anbc = Anbc::new();
        anbc.train(&data).unwrap();

        assert!(anbc.is_trained());
        assert_eq!(anbc.class_labels(), &[1, 2]);
        assert_eq!(anbc.predict_label(&[1.1, 0.9]).unwrap(), 1);
        assert_eq!(anbc.predict_label(&[5.8, 4.2]).unwrap(), 2);
    }

    #[test]
    fn test_likelihoods_are_normalised() {
        let data = two_cluster_data();
        let mut anbc = Anbc::new();
        anbc.train(&data).unwrap();
        anbc.predict(&[3.5, 2.5]).unwrap();

        let sum: f64 = anbc.class_likelihoods().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(anbc.class_distances().len(), 2);
        assert!(anbc.max_likelihood() >= 0.5);
    }

    #[test]
    fn test_scaling_gives_same_labels() {
        let data = two_cluster_data();
        let mut anbc = Anbc::new();
        anbc.enable_scaling(true);
        anbc.train(&data).unwrap();
        assert_eq!(anbc.ranges().len(), 2);
        assert_eq!(anbc.predict_label(&[0.8, 1.2]).unwrap(), 1);
        assert_eq!(anbc.predict_label(&[6.2, 3.9]).unwrap(), 2);
    }

    #[test]
    fn test_null_rejection() {
        let data = two_cluster_data();
        let mut anbc = Anbc::new();
        anbc.enable_null_rejection(true);
        anbc.set_null_rejection_coeff(1.0).unwrap();
        anbc.train(&data).unwrap();

        assert_eq!(anbc.predict_label(&[1.0, 1.0]).unwrap(), 1);
        assert_eq!(anbc.predict_label(&[100.0, -50.0]).unwrap(), NULL_CLASS_LABEL);

        anbc.enable_null_rejection(false);
        assert_ne!(anbc.predict_label(&[100.0, -50.0]).unwrap(), NULL_CLASS_LABEL);
    }

    #[test]
    fn test_coeff_updates_thresholds() {
        let data = two_cluster_data();
        let mut anbc = Anbc::new();
        anbc.train(&data).unwrap();
        let before = anbc.null_rejection_thresholds();
        anbc.set_null_rejection_coeff(2.0).unwrap();
        let after = anbc.null_rejection_thresholds();
        for (b, a) in before.iter().zip(after.iter()) {
            assert!(a > b, "lower coefficient should raise the threshold");
        }
        assert!(anbc.set_null_rejection_coeff(-1.0).is_err());
    }

    #[test]
    fn test_weights_disable_dimension() {
        let data = two_cluster_data();
        let mut anbc = Anbc::new();
        anbc.set_weights(1, vec![1.0, 0.0]).unwrap();
        anbc.set_weights(2, vec![1.0, 0.0]).unwrap();
        anbc.train(&data).unwrap();
        // Only x matters now, so a sample at class 1's x is class 1 whatever y is.
        assert_eq!(anbc.predict_label(&[1.0, 4.0]).unwrap(), 1);

        anbc.set_weights(1, vec![1.0]).unwrap();
        assert!(matches!(anbc.train(&data), Err(Error::Training(_))));
    }

    #[test]
    fn test_constant_dimension_does_not_break_training() {
        let mut data = ClassificationData::new(2);
        for i in 0..5 {
            data.add_sample(1, vec![i as f64, 3.0]).unwrap();
            data.add_sample(2, vec![10.0 + i as f64, 3.0]).unwrap();
        }
        let mut anbc = Anbc::new();
        anbc.train(&data).unwrap();
        assert_eq!(anbc.predict_label(&[2.0, 3.0]).unwrap(), 1);
        assert_eq!(anbc.predict_label(&[12.0, 3.0]).unwrap(), 2);
    }

    #[test]
    fn test_overflowing_features_fail_training() {
        let mut data = ClassificationData::new(1);
        data.add_sample(1, vec![-1.0e160]).unwrap();
        data.add_sample(1, vec![1.0e160]).unwrap();
        data.add_sample(2, vec![0.0]).unwrap();
        data.add_sample(2, vec![1.0]).unwrap();

        let mut anbc = Anbc::new();
        assert!(matches!(anbc.train(&data), Err(Error::Training(_))));
        assert!(!anbc.is_trained());
    }

    #[test]
    fn test_set_null_rejection_thresholds() {
        let mut anbc = Anbc::new();
        anbc.enable_null_rejection(true);
        anbc.train(&two_cluster_data()).unwrap();

        assert!(matches!(
            anbc.set_null_rejection_thresholds(&[0.0]),
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));

        anbc.set_null_rejection_thresholds(&[-1.0e6, -1.0e6]).unwrap();
        assert_eq!(anbc.null_rejection_thresholds(), vec![-1.0e6, -1.0e6]);
        assert_eq!(anbc.predict_label(&[1.0, 1.0]).unwrap(), 1);
        assert_ne!(anbc.predict_label(&[100.0, -50.0]).unwrap(), NULL_CLASS_LABEL);

        anbc.set_null_rejection_thresholds(&[f64::MAX, f64::MAX]).unwrap();
        assert_eq!(anbc.predict_label(&[1.0, 1.0]).unwrap(), NULL_CLASS_LABEL);
    }

    #[test]
    fn test_untrained_model_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("untrained.json");

        let anbc = Anbc::new();
        anbc.save_model_to_file(&path).unwrap();
        let mut loaded = Anbc::read_from_file(&path).unwrap();
        assert!(!loaded.is_trained());
        assert!(matches!(loaded.predict(&[0.0]), Err(Error::NotTrained)));
    }

    #[test]
    fn test_predict_errors() {
        let mut anbc = Anbc::new();
        assert!(matches!(anbc.predict(&[1.0, 1.0]), Err(Error::NotTrained)));

        anbc.train(&two_cluster_data()).unwrap();
        assert!(matches!(
            anbc.predict(&[1.0]),
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(anbc.train(&ClassificationData::new(2)).is_err());
        assert!(!anbc.is_trained());
    }

    #[test]
    fn test_save_load_gives_identical_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anbc.json");

        let mut anbc = Anbc::with_settings(AnbcSettings {
            null_rejection_coeff: 3.0,
            use_scaling: true,
            use_null_rejection: true,
        })
        .unwrap();
        anbc.train(&two_cluster_data()).unwrap();
        anbc.save_model_to_file(&path).unwrap();

        let mut loaded = Anbc::new();
        loaded.load_model_from_file(&path).unwrap();
        assert_eq!(loaded.settings(), anbc.settings());

        for input in [[1.0, 1.0], [6.0, 4.0], [3.5, 2.5], [40.0, 40.0]] {
            anbc.predict(&input).unwrap();
            loaded.predict(&input).unwrap();
            assert_eq!(anbc.predicted_class_label(), loaded.predicted_class_label());
            assert_eq!(anbc.class_distances(), loaded.class_distances());
        }
    }
}
