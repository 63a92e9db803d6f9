//! Labelled datasets for classification and regression.
//!
//! Both containers load from either the native text format or a headerless
//! CSV file (picked by the `.csv` extension), and both can be partitioned
//! into a training part (kept in place) and a test part (returned).

mod classification;
mod format;
mod regression;

pub use classification::{ClassificationData, ClassificationSample, ClassificationStats};
pub use regression::{RegressionData, RegressionSample, RegressionStats};

pub(crate) use format::csv_writer;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Error, Result};

pub(crate) fn check_percentage(training_percentage: f64) -> Result<()> {
    if !(training_percentage > 0.0 && training_percentage <= 100.0) {
        return Err(Error::invalid_parameter(
            "training_percentage",
            training_percentage,
            "must be in (0, 100]",
        ));
    }
    Ok(())
}

/// Number of samples that go to the training side of a partition.
pub(crate) fn training_size(count: usize, training_percentage: f64) -> usize {
    ((count as f64 * training_percentage / 100.0).floor() as usize).min(count)
}

/// Shuffles `indices` and splits them into (training, test).
pub(crate) fn split_indices<R: Rng + ?Sized>(
    mut indices: Vec<usize>,
    training_percentage: f64,
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    indices.shuffle(rng);
    let n_train = training_size(indices.len(), training_percentage);
    let test = indices.split_off(n_train);
    (indices, test)
}

/// Moves the samples at `train` and `test` out of `samples`, in index order.
pub(crate) fn take_partition<T>(
    samples: Vec<T>,
    train: &[usize],
    test: &[usize],
) -> (Vec<T>, Vec<T>) {
    let mut slots: Vec<Option<T>> = samples.into_iter().map(Some).collect();
    let train = train.iter().filter_map(|&i| slots[i].take()).collect();
    let test = test.iter().filter_map(|&i| slots[i].take()).collect();
    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_training_size() {
        assert_eq!(training_size(10, 80.0), 8);
        assert_eq!(training_size(7, 50.0), 3);
        assert_eq!(training_size(5, 100.0), 5);
    }

    #[test]
    fn test_check_percentage() {
        assert!(check_percentage(80.0).is_ok());
        assert!(check_percentage(100.0).is_ok());
        assert!(check_percentage(0.0).is_err());
        assert!(check_percentage(120.0).is_err());
        assert!(check_percentage(f64::NAN).is_err());
    }

    #[test]
    fn test_split_indices_is_disjoint_and_complete() {
        let mut rng = StdRng::seed_from_u64(7);
        let (train, test) = split_indices((0..25).collect(), 60.0, &mut rng);
        assert_eq!(train.len(), 15);
        assert_eq!(test.len(), 10);

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_take_partition() {
        let (a, b) = take_partition(vec!['a', 'b', 'c', 'd'], &[3, 0], &[1, 2]);
        assert_eq!(a, vec!['d', 'a']);
        assert_eq!(b, vec!['b', 'c']);
    }
}
