//! Classifiers: models that map a feature vector to a class label.

mod anbc;

pub use anbc::Anbc;

use crate::data::ClassificationData;
use crate::error::Result;

/// Common contract of every classifier.
///
/// A prediction is a two step affair: [`Classifier::predict`] runs the
/// model and the accessors then report on the most recent prediction.
pub trait Classifier {
    fn train(&mut self, data: &ClassificationData) -> Result<()>;

    fn predict(&mut self, input: &[f64]) -> Result<()>;

    fn is_trained(&self) -> bool;

    fn num_input_dimensions(&self) -> usize;

    /// Labels the model was trained on, ascending.
    fn class_labels(&self) -> &[u32];

    fn predicted_class_label(&self) -> u32;

    fn max_likelihood(&self) -> f64;

    fn class_likelihoods(&self) -> &[f64];

    fn class_distances(&self) -> &[f64];

    fn null_rejection_enabled(&self) -> bool;

    /// Drops the trained state but keeps the settings.
    fn clear(&mut self);

    fn num_classes(&self) -> usize {
        self.class_labels().len()
    }

    /// Runs a prediction and returns the predicted label.
    fn predict_label(&mut self, input: &[f64]) -> Result<u32> {
        self.predict(input)?;
        Ok(self.predicted_class_label())
    }
}
