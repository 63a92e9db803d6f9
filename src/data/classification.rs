use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::ops::Index;
use std::path::Path;

use super::format::{self, HeaderReader};
use crate::error::{Error, Result};
use crate::scaling::{self, MinMax};
use crate::NULL_CLASS_LABEL;

const FILE_HEADER: &str = "PATTERNKIT_CLASSIFICATION_DATA_V1";

/// A class label paired with its feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSample {
    class_label: u32,
    sample: Vec<f64>,
}

impl ClassificationSample {
    pub fn new(class_label: u32, sample: Vec<f64>) -> Self {
        Self {
            class_label,
            sample,
        }
    }

    pub fn class_label(&self) -> u32 {
        self.class_label
    }

    pub fn sample(&self) -> &[f64] {
        &self.sample
    }

    pub fn num_dimensions(&self) -> usize {
        self.sample.len()
    }
}

/// Labelled classification samples sharing one dimensionality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationData {
    dataset_name: String,
    info_text: String,
    num_dimensions: usize,
    samples: Vec<ClassificationSample>,
    class_tracker: BTreeMap<u32, usize>,
}

impl ClassificationData {
    /// Empty dataset. A zero dimensionality is fixed by the first sample added.
    pub fn new(num_dimensions: usize) -> Self {
        Self {
            dataset_name: "NOT_SET".to_string(),
            num_dimensions,
            ..Default::default()
        }
    }

    pub fn set_num_dimensions(&mut self, num_dimensions: usize) -> Result<()> {
        if !self.samples.is_empty() {
            return Err(Error::InvalidData(
                "cannot change the dimensionality of a non-empty dataset".to_string(),
            ));
        }
        self.num_dimensions = num_dimensions;
        Ok(())
    }

    pub fn set_dataset_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.chars().any(char::is_whitespace) {
            return Err(Error::invalid_parameter(
                "dataset_name",
                &name,
                "must not contain whitespace",
            ));
        }
        self.dataset_name = name;
        Ok(())
    }

    pub fn set_info_text(&mut self, text: impl Into<String>) {
        self.info_text = text.into().replace('\n', " ");
    }

    pub fn add_sample(&mut self, class_label: u32, sample: Vec<f64>) -> Result<()> {
        if class_label == NULL_CLASS_LABEL {
            return Err(Error::InvalidData(format!(
                "class label {} is reserved for the null class",
                NULL_CLASS_LABEL
            )));
        }
        if self.samples.is_empty() && self.num_dimensions == 0 {
            self.num_dimensions = sample.len();
        }
        if sample.len() != self.num_dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.num_dimensions,
                actual: sample.len(),
            });
        }
        *self.class_tracker.entry(class_label).or_insert(0) += 1;
        self.samples
            .push(ClassificationSample::new(class_label, sample));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.class_tracker.clear();
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn info_text(&self) -> &str {
        &self.info_text
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn num_dimensions(&self) -> usize {
        self.num_dimensions
    }

    pub fn num_classes(&self) -> usize {
        self.class_tracker.len()
    }

    /// Class labels in ascending order.
    pub fn class_labels(&self) -> Vec<u32> {
        self.class_tracker.keys().copied().collect()
    }

    /// Number of samples per class label.
    pub fn class_tracker(&self) -> &BTreeMap<u32, usize> {
        &self.class_tracker
    }

    pub fn samples(&self) -> &[ClassificationSample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClassificationSample> {
        self.samples.iter()
    }

    /// Samples belonging to `class_label`.
    pub fn class_samples(&self, class_label: u32) -> impl Iterator<Item = &[f64]> + '_ {
        self.samples
            .iter()
            .filter(move |s| s.class_label == class_label)
            .map(|s| s.sample())
    }

    pub fn ranges(&self) -> Vec<MinMax> {
        scaling::ranges(self.samples.iter().map(|s| s.sample()), self.num_dimensions)
    }

    /// Splits off a test set, keeping `training_percentage` percent of the
    /// samples in `self`.
    pub fn partition(&mut self, training_percentage: f64, stratified: bool) -> Result<Self> {
        self.partition_with_rng(training_percentage, stratified, &mut rand::thread_rng())
    }

    pub fn partition_with_rng<R: Rng + ?Sized>(
        &mut self,
        training_percentage: f64,
        stratified: bool,
        rng: &mut R,
    ) -> Result<Self> {
        super::check_percentage(training_percentage)?;

        let (train_idx, test_idx) = if stratified {
            let mut by_class: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
            for (i, sample) in self.samples.iter().enumerate() {
                by_class.entry(sample.class_label).or_default().push(i);
            }
            let mut train_idx = Vec::with_capacity(self.samples.len());
            let mut test_idx = Vec::new();
            for (_, indices) in by_class {
                let (train, test) = super::split_indices(indices, training_percentage, rng);
                train_idx.extend(train);
                test_idx.extend(test);
            }
            (train_idx, test_idx)
        } else {
            super::split_indices((0..self.samples.len()).collect(), training_percentage, rng)
        };

        let samples = std::mem::take(&mut self.samples);
        let (train, test) = super::take_partition(samples, &train_idx, &test_idx);

        let mut test_data = Self::new(self.num_dimensions);
        test_data.dataset_name = self.dataset_name.clone();
        test_data.info_text = self.info_text.clone();
        test_data.set_samples(test);
        self.set_samples(train);

        Ok(test_data)
    }

    /// Appends every sample of `other`.
    pub fn merge(&mut self, other: &ClassificationData) -> Result<()> {
        if !other.is_empty() && !self.is_empty() && other.num_dimensions != self.num_dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.num_dimensions,
                actual: other.num_dimensions,
            });
        }
        for sample in &other.samples {
            self.add_sample(sample.class_label, sample.sample.clone())?;
        }
        Ok(())
    }

    pub fn stats(&self) -> ClassificationStats {
        ClassificationStats {
            dataset_name: self.dataset_name.clone(),
            info_text: self.info_text.clone(),
            num_samples: self.num_samples(),
            num_dimensions: self.num_dimensions,
            class_tracker: self.class_tracker.clone(),
            ranges: self.ranges(),
        }
    }

    fn set_samples(&mut self, samples: Vec<ClassificationSample>) {
        self.class_tracker.clear();
        for sample in &samples {
            *self.class_tracker.entry(sample.class_label).or_insert(0) += 1;
        }
        self.samples = samples;
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = if format::is_csv(path) {
            Self::load_from_csv(path)?
        } else {
            Self::parse(&fs::read_to_string(path)?)?
        };
        tracing::debug!(
            path = %path.display(),
            samples = data.num_samples(),
            classes = data.num_classes(),
            "loaded classification data"
        );
        Ok(data)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if format::is_csv(path) {
            self.save_to_csv(path)
        } else {
            let mut writer = BufWriter::new(fs::File::create(path)?);
            self.write_native(&mut writer)?;
            writer.flush()?;
            Ok(())
        }
    }

    /// First column is the class label, remaining columns are features.
    pub fn load_from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut data = Self::new(0);
        for (i, row) in format::read_csv_rows(path)?.into_iter().enumerate() {
            let (label, features) = row
                .split_first()
                .ok_or_else(|| Error::parse(i + 1, "empty row"))?;
            data.add_sample(parse_label(i + 1, *label)?, features.to_vec())
                .map_err(|err| Error::parse(i + 1, err.to_string()))?;
        }
        Ok(data)
    }

    pub fn save_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = super::csv_writer(path)?;
        for sample in &self.samples {
            let mut record = Vec::with_capacity(sample.sample.len() + 1);
            record.push(sample.class_label.to_string());
            record.extend(sample.sample.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_native<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "{}", FILE_HEADER)?;
        writeln!(w, "DatasetName: {}", self.dataset_name)?;
        writeln!(w, "InfoText: {}", self.info_text)?;
        writeln!(w, "NumDimensions: {}", self.num_dimensions)?;
        writeln!(w, "TotalNumExamples: {}", self.samples.len())?;
        writeln!(w, "NumberOfClasses: {}", self.class_tracker.len())?;
        writeln!(w, "ClassIDsAndCounters:")?;
        for (label, count) in &self.class_tracker {
            writeln!(w, "{}\t{}", label, count)?;
        }
        writeln!(w, "Data:")?;
        for sample in &self.samples {
            write!(w, "{}", sample.class_label)?;
            for value in &sample.sample {
                write!(w, "\t{}", value)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    fn parse(text: &str) -> Result<Self> {
        let mut header = HeaderReader::new(text);
        header.expect_format(FILE_HEADER)?;

        let mut data = Self::new(0);
        data.dataset_name = header.field("DatasetName")?;
        data.info_text = header.field("InfoText")?;
        data.num_dimensions = header.parsed("NumDimensions")?;
        let total: usize = header.parsed("TotalNumExamples")?;
        let num_classes: usize = header.parsed("NumberOfClasses")?;
        header.field("ClassIDsAndCounters")?;
        let mut expected_tracker = BTreeMap::new();
        for _ in 0..num_classes {
            let (line_no, line) = header.next_line()?;
            match format::parse_row(line_no, line)?.as_slice() {
                [label, count] => {
                    expected_tracker.insert(parse_label(line_no, *label)?, *count as usize);
                }
                _ => return Err(Error::parse(line_no, "expected `<label> <count>`")),
            }
        }
        header.field("Data")?;

        for (line_no, line) in header.rows() {
            let row = format::parse_row(line_no, line)?;
            let (label, features) = row
                .split_first()
                .ok_or_else(|| Error::parse(line_no, "empty row"))?;
            data.add_sample(parse_label(line_no, *label)?, features.to_vec())
                .map_err(|err| Error::parse(line_no, err.to_string()))?;
        }

        if data.num_samples() != total {
            return Err(Error::InvalidData(format!(
                "header declares {} examples but {} were read",
                total,
                data.num_samples()
            )));
        }
        if data.class_tracker != expected_tracker {
            return Err(Error::InvalidData(
                "class counters in the header do not match the data".to_string(),
            ));
        }
        Ok(data)
    }
}

fn parse_label(line_no: usize, value: f64) -> Result<u32> {
    if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return Err(Error::parse(line_no, format!("invalid class label `{}`", value)));
    }
    Ok(value as u32)
}

impl Index<usize> for ClassificationData {
    type Output = ClassificationSample;

    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl<'a> IntoIterator for &'a ClassificationData {
    type Item = &'a ClassificationSample;
    type IntoIter = std::slice::Iter<'a, ClassificationSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// Summary of a classification dataset, printable with `{}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationStats {
    pub dataset_name: String,
    pub info_text: String,
    pub num_samples: usize,
    pub num_dimensions: usize,
    pub class_tracker: BTreeMap<u32, usize>,
    pub ranges: Vec<MinMax>,
}

impl fmt::Display for ClassificationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DatasetName:\t{}", self.dataset_name)?;
        writeln!(f, "DatasetInfo:\t{}", self.info_text)?;
        writeln!(f, "Number of Dimensions:\t{}", self.num_dimensions)?;
        writeln!(f, "Number of Samples:\t{}", self.num_samples)?;
        writeln!(f, "Number of Classes:\t{}", self.class_tracker.len())?;
        writeln!(f, "ClassStats:")?;
        for (label, count) in &self.class_tracker {
            writeln!(f, "ClassLabel:\t{}\tNumber of Samples:\t{}", label, count)?;
        }
        writeln!(f, "Dataset Ranges:")?;
        for (j, range) in self.ranges.iter().enumerate() {
            writeln!(f, "[{}] Min:\t{}\tMax:\t{}", j + 1, range.min, range.max)?;
        }
        Ok(())
    }
}
