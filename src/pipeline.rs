//! A pipeline wraps one classifier or regressifier behind a uniform
//! train / test / predict interface and keeps the results of the last test.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::classification::{Anbc, Classifier};
use crate::data::{ClassificationData, RegressionData};
use crate::error::{Error, Result};
use crate::metrics::{self, ConfusionMatrix};
use crate::persistence::Persistent;
use crate::regression::{LinearRegression, MultidimensionalRegression, Regressifier};

/// Classifiers a pipeline can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "model")]
pub enum ClassifierModule {
    Anbc(Anbc),
}

/// Regressifiers a pipeline can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "model")]
pub enum RegressifierModule {
    LinearRegression(LinearRegression),
    Multidimensional(MultidimensionalRegression<LinearRegression>),
}

impl From<Anbc> for ClassifierModule {
    fn from(model: Anbc) -> Self {
        ClassifierModule::Anbc(model)
    }
}

impl From<LinearRegression> for RegressifierModule {
    fn from(model: LinearRegression) -> Self {
        RegressifierModule::LinearRegression(model)
    }
}

impl From<MultidimensionalRegression<LinearRegression>> for RegressifierModule {
    fn from(model: MultidimensionalRegression<LinearRegression>) -> Self {
        RegressifierModule::Multidimensional(model)
    }
}

impl ClassifierModule {
    fn inner(&self) -> &dyn Classifier {
        match self {
            ClassifierModule::Anbc(model) => model,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            ClassifierModule::Anbc(model) => model,
        }
    }
}

impl RegressifierModule {
    fn inner(&self) -> &dyn Regressifier {
        match self {
            RegressifierModule::LinearRegression(model) => model,
            RegressifierModule::Multidimensional(model) => model,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Regressifier {
        match self {
            RegressifierModule::LinearRegression(model) => model,
            RegressifierModule::Multidimensional(model) => model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "module")]
pub enum PipelineModule {
    Classifier(ClassifierModule),
    Regressifier(RegressifierModule),
}

/// Outcome of [`Pipeline::test_classification`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationTestResult {
    pub num_samples: usize,
    pub accuracy: f64,
    pub confusion_matrix: ConfusionMatrix,
    /// Precision, recall and F-measure for each trained class label.
    pub class_scores: Vec<ClassScores>,
    pub test_time: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassScores {
    pub class_label: u32,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f_measure: Option<f64>,
}

/// Outcome of [`Pipeline::test_regression`].
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTestResult {
    pub num_samples: usize,
    pub total_squared_error: f64,
    pub rms_error: f64,
    pub test_time: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    module: Option<PipelineModule>,
    trained: bool,
    num_input_dimensions: usize,
    num_output_dimensions: usize,
    training_time: Duration,
    #[serde(skip)]
    classification_test: Option<ClassificationTestResult>,
    #[serde(skip)]
    regression_test: Option<RegressionTestResult>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `classifier`, replacing any existing module.
    pub fn set_classifier(&mut self, classifier: impl Into<ClassifierModule>) {
        self.install(PipelineModule::Classifier(classifier.into()));
    }

    /// Installs `regressifier`, replacing any existing module.
    pub fn set_regressifier(&mut self, regressifier: impl Into<RegressifierModule>) {
        self.install(PipelineModule::Regressifier(regressifier.into()));
    }

    pub fn remove_module(&mut self) -> Option<PipelineModule> {
        let module = self.module.take();
        self.reset_state();
        module
    }

    fn install(&mut self, module: PipelineModule) {
        self.module = Some(module);
        self.reset_state();
    }

    fn reset_state(&mut self) {
        self.trained = false;
        self.num_input_dimensions = 0;
        self.num_output_dimensions = 0;
        self.training_time = Duration::ZERO;
        self.classification_test = None;
        self.regression_test = None;
    }

    pub fn module(&self) -> Option<&PipelineModule> {
        self.module.as_ref()
    }

    pub fn has_classifier(&self) -> bool {
        matches!(self.module, Some(PipelineModule::Classifier(_)))
    }

    pub fn has_regressifier(&self) -> bool {
        matches!(self.module, Some(PipelineModule::Regressifier(_)))
    }

    pub fn classifier(&self) -> Option<&dyn Classifier> {
        match &self.module {
            Some(PipelineModule::Classifier(module)) => Some(module.inner()),
            _ => None,
        }
    }

    pub fn regressifier(&self) -> Option<&dyn Regressifier> {
        match &self.module {
            Some(PipelineModule::Regressifier(module)) => Some(module.inner()),
            _ => None,
        }
    }

    fn classifier_mut(&mut self) -> Result<&mut dyn Classifier> {
        match &mut self.module {
            Some(PipelineModule::Classifier(module)) => Ok(module.inner_mut()),
            _ => Err(Error::NoModule("classifier")),
        }
    }

    fn regressifier_mut(&mut self) -> Result<&mut dyn Regressifier> {
        match &mut self.module {
            Some(PipelineModule::Regressifier(module)) => Ok(module.inner_mut()),
            _ => Err(Error::NoModule("regressifier")),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn num_input_dimensions(&self) -> usize {
        self.num_input_dimensions
    }

    pub fn num_output_dimensions(&self) -> usize {
        self.num_output_dimensions
    }

    pub fn training_time(&self) -> Duration {
        self.training_time
    }

    pub fn train_classification(&mut self, data: &ClassificationData) -> Result<()> {
        self.trained = false;
        let start = Instant::now();
        let classifier = self.classifier_mut()?;
        classifier.train(data)?;
        let num_classes = classifier.num_classes();

        self.num_input_dimensions = data.num_dimensions();
        self.num_output_dimensions = num_classes;
        self.training_time = start.elapsed();
        self.trained = true;
        self.classification_test = None;
        tracing::info!(
            samples = data.num_samples(),
            time_ms = self.training_time.as_millis() as u64,
            "pipeline trained"
        );
        Ok(())
    }

    pub fn train_regression(&mut self, data: &RegressionData) -> Result<()> {
        self.trained = false;
        let start = Instant::now();
        let regressifier = self.regressifier_mut()?;
        regressifier.train(data)?;
        let num_outputs = regressifier.num_output_dimensions();

        self.num_input_dimensions = data.num_input_dimensions();
        self.num_output_dimensions = num_outputs;
        self.training_time = start.elapsed();
        self.trained = true;
        self.regression_test = None;
        tracing::info!(
            samples = data.num_samples(),
            time_ms = self.training_time.as_millis() as u64,
            "pipeline trained"
        );
        Ok(())
    }

    fn check_input(&self, num_dimensions: usize) -> Result<()> {
        if !self.trained {
            return Err(Error::NotTrained);
        }
        if num_dimensions != self.num_input_dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.num_input_dimensions,
                actual: num_dimensions,
            });
        }
        Ok(())
    }

    /// Predicts every sample of `data` and records accuracy and the
    /// confusion matrix. The dimensionality is checked before any
    /// prediction is made.
    pub fn test_classification(
        &mut self,
        data: &ClassificationData,
    ) -> Result<&ClassificationTestResult> {
        self.classifier_mut()?;
        self.check_input(data.num_dimensions())?;
        if data.is_empty() {
            return Err(Error::InvalidData("test data is empty".to_string()));
        }

        let start = Instant::now();
        let classifier = self.classifier_mut()?;
        let class_labels = classifier.class_labels().to_vec();
        let mut confusion_matrix = ConfusionMatrix::with_labels(class_labels.iter().copied());
        if classifier.null_rejection_enabled() {
            confusion_matrix.add_label(crate::NULL_CLASS_LABEL);
        }
        for (i, sample) in data.iter().enumerate() {
            let predicted = classifier
                .predict_label(sample.sample())
                .map_err(|err| Error::Prediction(format!("test sample {}: {}", i, err)))?;
            confusion_matrix.record(sample.class_label(), predicted);
        }

        let class_scores = class_labels
            .iter()
            .map(|&class_label| ClassScores {
                class_label,
                precision: confusion_matrix.precision(class_label),
                recall: confusion_matrix.recall(class_label),
                f_measure: confusion_matrix.f_measure(class_label),
            })
            .collect();
        let result = ClassificationTestResult {
            num_samples: data.num_samples(),
            accuracy: confusion_matrix.accuracy(),
            confusion_matrix,
            class_scores,
            test_time: start.elapsed(),
        };
        tracing::info!(
            samples = result.num_samples,
            accuracy = result.accuracy,
            "classification test complete"
        );
        let result: &ClassificationTestResult = self.classification_test.insert(result);
        Ok(result)
    }

    /// Predicts every sample of `data` and records the squared and RMS error.
    /// Input and target dimensionality are checked before any prediction.
    pub fn test_regression(&mut self, data: &RegressionData) -> Result<&RegressionTestResult> {
        self.regressifier_mut()?;
        self.check_input(data.num_input_dimensions())?;
        if data.num_target_dimensions() != self.num_output_dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.num_output_dimensions,
                actual: data.num_target_dimensions(),
            });
        }
        if data.is_empty() {
            return Err(Error::InvalidData("test data is empty".to_string()));
        }

        let start = Instant::now();
        let regressifier = self.regressifier_mut()?;
        let mut total_squared_error = 0.0;
        for (i, sample) in data.iter().enumerate() {
            regressifier
                .predict(sample.input())
                .map_err(|err| Error::Prediction(format!("test sample {}: {}", i, err)))?;
            total_squared_error += regressifier
                .regression_data()
                .iter()
                .zip(sample.target().iter())
                .map(|(y_hat, y)| (y - y_hat).powi(2))
                .sum::<f64>();
        }

        let result = RegressionTestResult {
            num_samples: data.num_samples(),
            total_squared_error,
            rms_error: metrics::rms_error(total_squared_error, data.num_samples()),
            test_time: start.elapsed(),
        };
        tracing::info!(
            samples = result.num_samples,
            rms_error = result.rms_error,
            "regression test complete"
        );
        let result: &RegressionTestResult = self.regression_test.insert(result);
        Ok(result)
    }

    /// Runs the module on `input`; read the result with
    /// [`Pipeline::predicted_class_label`] or [`Pipeline::regression_data`].
    pub fn predict(&mut self, input: &[f64]) -> Result<()> {
        if self.module.is_none() {
            return Err(Error::NoModule("prediction"));
        }
        self.check_input(input.len())?;
        match &mut self.module {
            Some(PipelineModule::Classifier(module)) => module.inner_mut().predict(input),
            Some(PipelineModule::Regressifier(module)) => module.inner_mut().predict(input),
            None => Err(Error::NoModule("prediction")),
        }
    }

    /// Label of the last prediction; 0 without a classifier.
    pub fn predicted_class_label(&self) -> u32 {
        self.classifier()
            .map(|c| c.predicted_class_label())
            .unwrap_or(crate::NULL_CLASS_LABEL)
    }

    pub fn max_likelihood(&self) -> f64 {
        self.classifier().map(|c| c.max_likelihood()).unwrap_or(0.0)
    }

    pub fn class_likelihoods(&self) -> &[f64] {
        self.classifier().map(|c| c.class_likelihoods()).unwrap_or(&[])
    }

    pub fn class_distances(&self) -> &[f64] {
        self.classifier().map(|c| c.class_distances()).unwrap_or(&[])
    }

    /// Output vector of the last prediction; empty without a regressifier.
    pub fn regression_data(&self) -> &[f64] {
        self.regressifier()
            .map(|r| r.regression_data())
            .unwrap_or(&[])
    }

    pub fn classification_test_result(&self) -> Option<&ClassificationTestResult> {
        self.classification_test.as_ref()
    }

    pub fn regression_test_result(&self) -> Option<&RegressionTestResult> {
        self.regression_test.as_ref()
    }

    pub fn test_accuracy(&self) -> Option<f64> {
        self.classification_test.as_ref().map(|r| r.accuracy)
    }

    pub fn test_rms_error(&self) -> Option<f64> {
        self.regression_test.as_ref().map(|r| r.rms_error)
    }

    pub fn test_squared_error(&self) -> Option<f64> {
        self.regression_test.as_ref().map(|r| r.total_squared_error)
    }

    pub fn save_pipeline_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_model_to_file(path)
    }

    pub fn load_pipeline_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.load_model_from_file(path)
    }
}

impl Persistent for Pipeline {
    const FORMAT: &'static str = "patternkit.pipeline";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinearRegressionSettings;

    fn classification_data() -> ClassificationData {
        let mut data = ClassificationData::new(2);
        for i in 0..10 {
            let d = (i as f64 - 4.5) * 0.1;
            data.add_sample(1, vec![d, -d]).unwrap();
            data.add_sample(2, vec![5.0 + d, 5.0 + d]).unwrap();
            data.add_sample(3, vec![-5.0 - d, 5.0 - d]).unwrap();
        }
        data
    }

    fn regression_data() -> RegressionData {
        let mut data = RegressionData::new(1, 2);
        for i in 0..30 {
            let x = i as f64;
            data.add_sample(vec![x], vec![0.5 * x + 1.0, 10.0 - x]).unwrap();
        }
        data
    }

    fn mdr() -> MultidimensionalRegression {
        let template = LinearRegression::with_settings(LinearRegressionSettings {
            learning_rate: 0.1,
            max_epochs: 2000,
            min_change: 1.0e-12,
            seed: Some(3),
            ..Default::default()
        })
        .unwrap();
        MultidimensionalRegression::new(template, true)
    }

    #[test]
    fn test_classification_pipeline() {
        let data = classification_data();
        let mut pipeline = Pipeline::new();
        pipeline.set_classifier(Anbc::new());
        assert!(pipeline.has_classifier());

        pipeline.train_classification(&data).unwrap();
        assert_eq!(pipeline.num_input_dimensions(), 2);
        assert_eq!(pipeline.num_output_dimensions(), 3);

        let result = pipeline.test_classification(&data).unwrap();
        assert!(result.accuracy >= 0.0 && result.accuracy <= 1.0);
        assert_eq!(result.accuracy, 1.0);
        assert_eq!(result.class_scores.len(), 3);
        assert_eq!(pipeline.test_accuracy(), Some(1.0));

        pipeline.predict(&[5.1, 4.9]).unwrap();
        assert_eq!(pipeline.predicted_class_label(), 2);
        assert_eq!(pipeline.class_likelihoods().len(), 3);
        assert!(pipeline.regression_data().is_empty());
    }

    #[test]
    fn test_regression_pipeline() {
        let data = regression_data();
        let mut pipeline = Pipeline::new();
        pipeline.set_regressifier(mdr());
        pipeline.train_regression(&data).unwrap();
        assert_eq!(pipeline.num_output_dimensions(), 2);

        let result = pipeline.test_regression(&data).unwrap();
        assert_eq!(result.num_samples, 30);
        let rms_error = result.rms_error;
        assert!(rms_error < 0.1, "rms error {}", rms_error);
        assert_eq!(pipeline.test_rms_error(), Some(rms_error));

        pipeline.predict(&[10.0]).unwrap();
        let output = pipeline.regression_data();
        assert_eq!(output.len(), 2);
        assert!((output[0] - 6.0).abs() < 0.1);
        assert!((output[1] - 0.0).abs() < 0.1);
    }

    #[test]
    fn test_null_class_in_confusion_matrix() {
        let data = classification_data();
        let mut anbc = Anbc::new();
        anbc.enable_null_rejection(true);
        let mut pipeline = Pipeline::new();
        pipeline.set_classifier(anbc);
        pipeline.train_classification(&data).unwrap();

        let result = pipeline.test_classification(&data).unwrap();
        assert_eq!(
            result.confusion_matrix.labels(),
            vec![crate::NULL_CLASS_LABEL, 1, 2, 3]
        );
        assert_eq!(result.confusion_matrix.to_rows().len(), 4);

        let mut pipeline = Pipeline::new();
        pipeline.set_classifier(Anbc::new());
        pipeline.train_classification(&data).unwrap();
        let result = pipeline.test_classification(&data).unwrap();
        assert_eq!(result.confusion_matrix.labels(), vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_module() {
        let mut pipeline = Pipeline::new();
        assert!(matches!(
            pipeline.train_classification(&classification_data()),
            Err(Error::NoModule("classifier"))
        ));
        pipeline.set_classifier(Anbc::new());
        assert!(matches!(
            pipeline.train_regression(&regression_data()),
            Err(Error::NoModule("regressifier"))
        ));
        assert!(matches!(pipeline.predict(&[0.0, 0.0]), Err(Error::NotTrained)));
    }

    #[test]
    fn test_dimension_mismatch_rejected_before_prediction() {
        let mut pipeline = Pipeline::new();
        pipeline.set_regressifier(mdr());
        pipeline.train_regression(&regression_data()).unwrap();

        let mut wrong_inputs = RegressionData::new(2, 2);
        wrong_inputs.add_sample(vec![1.0, 2.0], vec![0.0, 0.0]).unwrap();
        assert!(matches!(
            pipeline.test_regression(&wrong_inputs),
            Err(Error::DimensionMismatch {
                expected: 1,
                actual: 2
            })
        ));

        let mut wrong_targets = RegressionData::new(1, 3);
        wrong_targets.add_sample(vec![1.0], vec![0.0; 3]).unwrap();
        assert!(pipeline.test_regression(&wrong_targets).is_err());

        assert!(pipeline.test_rms_error().is_none());
    }

    #[test]
    fn test_setting_module_resets_training() {
        let mut pipeline = Pipeline::new();
        pipeline.set_classifier(Anbc::new());
        pipeline.train_classification(&classification_data()).unwrap();
        assert!(pipeline.is_trained());

        pipeline.set_regressifier(mdr());
        assert!(!pipeline.is_trained());
        assert!(pipeline.has_regressifier());
        assert!(pipeline.remove_module().is_some());
        assert!(pipeline.module().is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let data = regression_data();

        let mut pipeline = Pipeline::new();
        pipeline.set_regressifier(mdr());
        pipeline.train_regression(&data).unwrap();
        pipeline.save_pipeline_to_file(&path).unwrap();

        let mut loaded = Pipeline::new();
        loaded.load_pipeline_from_file(&path).unwrap();
        assert!(loaded.is_trained());
        assert!(loaded.has_regressifier());

        for sample in &data {
            pipeline.predict(sample.input()).unwrap();
            loaded.predict(sample.input()).unwrap();
            assert_eq!(pipeline.regression_data(), loaded.regression_data());
        }
    }
}
