//! Per-sample result files.

use std::path::Path;

use crate::classification::Classifier;
use crate::data::{ClassificationData, RegressionData};
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;

fn tsv_writer<P: AsRef<Path>>(path: P) -> Result<csv::Writer<std::fs::File>> {
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)?)
}

/// Predicts every sample of `data` and writes one line per sample: the
/// predicted vector followed by the target vector, tab separated.
///
/// Returns the number of lines written.
pub fn write_regression_results<P: AsRef<Path>>(
    path: P,
    pipeline: &mut Pipeline,
    data: &RegressionData,
) -> Result<usize> {
    let mut writer = tsv_writer(path)?;
    for (i, sample) in data.iter().enumerate() {
        pipeline
            .predict(sample.input())
            .map_err(|err| Error::Prediction(format!("sample {}: {}", i, err)))?;
        let record: Vec<String> = pipeline
            .regression_data()
            .iter()
            .chain(sample.target().iter())
            .map(|v| v.to_string())
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(data.num_samples())
}

/// Predicts every sample of `data` and writes `index, label, predicted`
/// per line, tab separated. Returns the number of correct predictions.
pub fn write_classification_results<P: AsRef<Path>>(
    path: P,
    classifier: &mut dyn Classifier,
    data: &ClassificationData,
) -> Result<usize> {
    let mut writer = tsv_writer(path)?;
    let mut correct = 0;
    for (i, sample) in data.iter().enumerate() {
        let predicted = classifier
            .predict_label(sample.sample())
            .map_err(|err| Error::Prediction(format!("sample {}: {}", i, err)))?;
        if predicted == sample.class_label() {
            correct += 1;
        }
        writer.write_record(&[
            i.to_string(),
            sample.class_label().to_string(),
            predicted.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(correct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::Anbc;
    use crate::config::LinearRegressionSettings;
    use crate::regression::{LinearRegression, MultidimensionalRegression};
    use std::fs;

    #[test]
    fn test_regression_results_layout() {
        let mut data = RegressionData::new(1, 2);
        for i in 0..10 {
            let x = i as f64;
            data.add_sample(vec![x], vec![x, 2.0 * x]).unwrap();
        }
        let template = LinearRegression::with_settings(LinearRegressionSettings {
            learning_rate: 0.1,
            max_epochs: 1000,
            seed: Some(1),
            ..Default::default()
        })
        .unwrap();
        let mut pipeline = Pipeline::new();
        pipeline.set_regressifier(MultidimensionalRegression::new(template, true));
        pipeline.train_regression(&data).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.tsv");
        let written = write_regression_results(&path, &mut pipeline, &data).unwrap();
        assert_eq!(written, 10);

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        for (line, sample) in lines.iter().zip(data.iter()) {
            let columns: Vec<f64> = line.split('\t').map(|c| c.parse().unwrap()).collect();
            assert_eq!(columns.len(), 4);
            assert_eq!(&columns[2..], sample.target());
        }
    }

    #[test]
    fn test_classification_results() {
        let mut data = ClassificationData::new(1);
        for i in 0..6 {
            data.add_sample(1, vec![i as f64 * 0.1]).unwrap();
            data.add_sample(2, vec![10.0 + i as f64 * 0.1]).unwrap();
        }
        let mut anbc = Anbc::new();
        anbc.train(&data).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.tsv");
        let correct = write_classification_results(&path, &mut anbc, &data).unwrap();
        assert_eq!(correct, 12);

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("0\t1\t1"));
    }

    #[test]
    fn test_untrained_classifier_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut anbc = Anbc::new();
        let mut data = ClassificationData::new(1);
        data.add_sample(1, vec![0.0]).unwrap();
        let err = write_classification_results(dir.path().join("x.tsv"), &mut anbc, &data)
            .unwrap_err();
        assert!(matches!(err, Error::Prediction(_)));
    }
}
