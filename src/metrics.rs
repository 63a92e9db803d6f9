//! Evaluation metrics for classification and regression tests.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Fraction of correct predictions, in `[0, 1]`. An empty test is 0.
pub fn accuracy(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    }
}

/// `sqrt(total_squared_error / num_samples)`, 0 for an empty set.
pub fn rms_error(total_squared_error: f64, num_samples: usize) -> f64 {
    if num_samples == 0 {
        0.0
    } else {
        (total_squared_error / num_samples as f64).sqrt()
    }
}

/// Counts of (actual, predicted) label pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfusionMatrix {
    labels: BTreeSet<u32>,
    counts: BTreeMap<(u32, u32), usize>,
    total: usize,
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matrix that always lists `labels`, even if none are recorded.
    pub fn with_labels<I: IntoIterator<Item = u32>>(labels: I) -> Self {
        Self {
            labels: labels.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Lists `label` even before anything is recorded against it.
    pub fn add_label(&mut self, label: u32) {
        self.labels.insert(label);
    }

    pub fn record(&mut self, actual: u32, predicted: u32) {
        self.labels.insert(actual);
        self.labels.insert(predicted);
        *self.counts.entry((actual, predicted)).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn labels(&self) -> Vec<u32> {
        self.labels.iter().copied().collect()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn count(&self, actual: u32, predicted: u32) -> usize {
        self.counts.get(&(actual, predicted)).copied().unwrap_or(0)
    }

    pub fn correct(&self) -> usize {
        self.counts
            .iter()
            .filter(|((actual, predicted), _)| actual == predicted)
            .map(|(_, &count)| count)
            .sum()
    }

    pub fn accuracy(&self) -> f64 {
        accuracy(self.correct(), self.total)
    }

    fn actual_count(&self, label: u32) -> usize {
        self.counts
            .iter()
            .filter(|((actual, _), _)| *actual == label)
            .map(|(_, &count)| count)
            .sum()
    }

    fn predicted_count(&self, label: u32) -> usize {
        self.counts
            .iter()
            .filter(|((_, predicted), _)| *predicted == label)
            .map(|(_, &count)| count)
            .sum()
    }

    /// Share of predictions of `label` that were right. `None` if `label`
    /// was never predicted.
    pub fn precision(&self, label: u32) -> Option<f64> {
        match self.predicted_count(label) {
            0 => None,
            n => Some(self.count(label, label) as f64 / n as f64),
        }
    }

    /// Share of samples of `label` that were found. `None` if `label` never
    /// occurs in the test set.
    pub fn recall(&self, label: u32) -> Option<f64> {
        match self.actual_count(label) {
            0 => None,
            n => Some(self.count(label, label) as f64 / n as f64),
        }
    }

    /// Harmonic mean of precision and recall.
    pub fn f_measure(&self, label: u32) -> Option<f64> {
        let p = self.precision(label)?;
        let r = self.recall(label)?;
        if p + r == 0.0 {
            Some(0.0)
        } else {
            Some(2.0 * p * r / (p + r))
        }
    }

    /// Rows are actual labels, columns predicted labels, both in
    /// [`ConfusionMatrix::labels`] order.
    pub fn to_rows(&self) -> Vec<Vec<usize>> {
        self.labels
            .iter()
            .map(|&actual| {
                self.labels
                    .iter()
                    .map(|&predicted| self.count(actual, predicted))
                    .collect()
            })
            .collect()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actual\\predicted")?;
        for label in &self.labels {
            write!(f, "\t{}", label)?;
        }
        writeln!(f)?;
        for (label, row) in self.labels.iter().zip(self.to_rows()) {
            write!(f, "{}", label)?;
            for count in row {
                write!(f, "\t{}", count)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
