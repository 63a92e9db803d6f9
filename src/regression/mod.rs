//! Regressifiers: models that map an input vector to a real-valued output
//! vector.

mod linear;
mod multidimensional;

pub use linear::LinearRegression;
pub use multidimensional::MultidimensionalRegression;

use crate::data::RegressionData;
use crate::error::Result;

/// Common contract of every regressifier.
///
/// As with classifiers, [`Regressifier::predict`] runs the model and
/// [`Regressifier::regression_data`] returns the resulting output vector.
pub trait Regressifier {
    fn train(&mut self, data: &RegressionData) -> Result<()>;

    fn predict(&mut self, input: &[f64]) -> Result<()>;

    /// Output vector of the most recent prediction.
    fn regression_data(&self) -> &[f64];

    fn is_trained(&self) -> bool;

    fn num_input_dimensions(&self) -> usize;

    fn num_output_dimensions(&self) -> usize;

    /// Sum over the training set of the squared error, in the units of the
    /// targets the model was trained on. The per-target models inside a
    /// scaling [`MultidimensionalRegression`] see targets scaled to [0, 1],
    /// so their errors are in scaled units.
    fn total_squared_training_error(&self) -> f64;

    fn root_mean_squared_training_error(&self) -> f64;

    fn use_scaling(&self) -> bool;

    /// Takes effect at the next call to `train`.
    fn enable_scaling(&mut self, use_scaling: bool);

    /// Drops the trained state but keeps the settings.
    fn clear(&mut self);

    fn predict_vector(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.predict(input)?;
        Ok(self.regression_data().to_vec())
    }
}

/// Squared error totals of `model` over `data`, in target units.
pub(crate) fn training_error<R: Regressifier + ?Sized>(
    model: &mut R,
    data: &RegressionData,
) -> Result<(f64, f64)> {
    let mut total = 0.0;
    for sample in data {
        model.predict(sample.input())?;
        total += model
            .regression_data()
            .iter()
            .zip(sample.target().iter())
            .map(|(y_hat, y)| (y - y_hat).powi(2))
            .sum::<f64>();
    }
    Ok((total, crate::metrics::rms_error(total, data.num_samples())))
}
