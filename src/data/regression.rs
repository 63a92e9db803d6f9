use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::ops::Index;
use std::path::Path;

use super::format::{self, HeaderReader};
use crate::error::{Error, Result};
use crate::scaling::{self, MinMax};

const FILE_HEADER: &str = "PATTERNKIT_REGRESSION_DATA_V1";

/// An input vector paired with the target vector it should map to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSample {
    input: Vec<f64>,
    target: Vec<f64>,
}

impl RegressionSample {
    pub fn new(input: Vec<f64>, target: Vec<f64>) -> Self {
        Self { input, target }
    }

    pub fn input(&self) -> &[f64] {
        &self.input
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }
}

/// Input/target pairs sharing one input and one target dimensionality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionData {
    dataset_name: String,
    info_text: String,
    num_input_dimensions: usize,
    num_target_dimensions: usize,
    samples: Vec<RegressionSample>,
}

impl RegressionData {
    pub fn new(num_input_dimensions: usize, num_target_dimensions: usize) -> Self {
        Self {
            dataset_name: "NOT_SET".to_string(),
            num_input_dimensions,
            num_target_dimensions,
            ..Default::default()
        }
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

    pub fn add_sample(&mut self, input: Vec<f64>, target: Vec<f64>) -> Result<()> {
        if input.len() != self.num_input_dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.num_input_dimensions,
                actual: input.len(),
            });
        }
        if target.len() != self.num_target_dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.num_target_dimensions,
                actual: target.len(),
            });
        }
        self.samples.push(RegressionSample::new(input, target));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.samples.clear();
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

    pub fn num_input_dimensions(&self) -> usize {
        self.num_input_dimensions
    }

    pub fn num_target_dimensions(&self) -> usize {
        self.num_target_dimensions
    }

    pub fn samples(&self) -> &[RegressionSample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegressionSample> {
        self.samples.iter()
    }

    pub fn input_ranges(&self) -> Vec<MinMax> {
        scaling::ranges(
            self.samples.iter().map(|s| s.input()),
            self.num_input_dimensions,
        )
    }

    pub fn target_ranges(&self) -> Vec<MinMax> {
        scaling::ranges(
            self.samples.iter().map(|s| s.target()),
            self.num_target_dimensions,
        )
    }

    /// Copy of this dataset with inputs and targets scaled into `[0, 1]`.
    pub fn scaled(&self, input_ranges: &[MinMax], target_ranges: &[MinMax]) -> Self {
        let samples = self
            .samples
            .iter()
            .map(|s| {
                RegressionSample::new(
                    scaling::scale_vector(&s.input, input_ranges),
                    scaling::scale_vector(&s.target, target_ranges),
                )
            })
            .collect();
        Self {
            samples,
            ..self.clone_header()
        }
    }

    /// Single-target view of this dataset keeping only target `index`.
    pub fn target_projection(&self, index: usize) -> Result<Self> {
        if index >= self.num_target_dimensions {
            return Err(Error::invalid_parameter(
                "target_index",
                index,
                format!("dataset has {} targets", self.num_target_dimensions),
            ));
        }
        let samples = self
            .samples
            .iter()
            .map(|s| RegressionSample::new(s.input.clone(), vec![s.target[index]]))
            .collect();
        Ok(Self {
            num_target_dimensions: 1,
            samples,
            ..self.clone_header()
        })
    }

    /// Splits off a test set, keeping `training_percentage` percent of the
    /// samples in `self`.
    pub fn partition(&mut self, training_percentage: f64) -> Result<Self> {
        self.partition_with_rng(training_percentage, &mut rand::thread_rng())
    }

    pub fn partition_with_rng<R: Rng + ?Sized>(
        &mut self,
        training_percentage: f64,
        rng: &mut R,
    ) -> Result<Self> {
        super::check_percentage(training_percentage)?;
        let (train_idx, test_idx) =
            super::split_indices((0..self.samples.len()).collect(), training_percentage, rng);

        let samples = std::mem::take(&mut self.samples);
        let (train, test) = super::take_partition(samples, &train_idx, &test_idx);
        self.samples = train;

        Ok(Self {
            samples: test,
            ..self.clone_header()
        })
    }

    pub fn merge(&mut self, other: &RegressionData) -> Result<()> {
        if other.num_input_dimensions != self.num_input_dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.num_input_dimensions,
                actual: other.num_input_dimensions,
            });
        }
        if other.num_target_dimensions != self.num_target_dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.num_target_dimensions,
                actual: other.num_target_dimensions,
            });
        }
        self.samples.extend(other.samples.iter().cloned());
        Ok(())
    }

    pub fn stats(&self) -> RegressionStats {
        RegressionStats {
            dataset_name: self.dataset_name.clone(),
            info_text: self.info_text.clone(),
            num_samples: self.num_samples(),
            num_input_dimensions: self.num_input_dimensions,
            num_target_dimensions: self.num_target_dimensions,
            input_ranges: self.input_ranges(),
            target_ranges: self.target_ranges(),
        }
    }

    fn clone_header(&self) -> Self {
        Self {
            dataset_name: self.dataset_name.clone(),
            info_text: self.info_text.clone(),
            num_input_dimensions: self.num_input_dimensions,
            num_target_dimensions: self.num_target_dimensions,
            samples: Vec::new(),
        }
    }

    /// Loads a native file, or a `.csv` file whose last column is the target.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = if format::is_csv(path) {
            let rows = format::read_csv_rows(path)?;
            let width = rows.first().map(|r| r.len()).unwrap_or(0);
            if width < 2 {
                return Err(Error::InvalidData(
                    "a regression CSV file needs at least one input and one target column"
                        .to_string(),
                ));
            }
            Self::from_rows(rows, width - 1, 1)?
        } else {
            Self::parse(&fs::read_to_string(path)?)?
        };
        tracing::debug!(
            path = %path.display(),
            samples = data.num_samples(),
            inputs = data.num_input_dimensions(),
            targets = data.num_target_dimensions(),
            "loaded regression data"
        );
        Ok(data)
    }

    /// Loads a headerless CSV file of `num_input` input columns followed by
    /// `num_target` target columns.
    pub fn load_from_csv<P: AsRef<Path>>(
        path: P,
        num_input_dimensions: usize,
        num_target_dimensions: usize,
    ) -> Result<Self> {
        Self::from_rows(
            format::read_csv_rows(path)?,
            num_input_dimensions,
            num_target_dimensions,
        )
    }

    fn from_rows(
        rows: Vec<Vec<f64>>,
        num_input_dimensions: usize,
        num_target_dimensions: usize,
    ) -> Result<Self> {
        let mut data = Self::new(num_input_dimensions, num_target_dimensions);
        for (i, mut row) in rows.into_iter().enumerate() {
            data.push_row(i + 1, &mut row)?;
        }
        Ok(data)
    }

    fn push_row(&mut self, line_no: usize, row: &mut Vec<f64>) -> Result<()> {
        let width = self.num_input_dimensions + self.num_target_dimensions;
        if row.len() != width {
            return Err(Error::parse(
                line_no,
                format!("expected {} columns, found {}", width, row.len()),
            ));
        }
        let target = row.split_off(self.num_input_dimensions);
        self.add_sample(std::mem::take(row), target)
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

    pub fn save_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = super::csv_writer(path)?;
        for sample in &self.samples {
            let record: Vec<String> = sample
                .input
                .iter()
                .chain(sample.target.iter())
                .map(|v| v.to_string())
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_native<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "{}", FILE_HEADER)?;
        writeln!(w, "DatasetName: {}", self.dataset_name)?;
        writeln!(w, "InfoText: {}", self.info_text)?;
        writeln!(w, "NumInputDimensions: {}", self.num_input_dimensions)?;
        writeln!(w, "NumTargetDimensions: {}", self.num_target_dimensions)?;
        writeln!(w, "TotalNumExamples: {}", self.samples.len())?;
        writeln!(w, "Data:")?;
        for sample in &self.samples {
            let line: Vec<String> = sample
                .input
                .iter()
                .chain(sample.target.iter())
                .map(|v| v.to_string())
                .collect();
            writeln!(w, "{}", line.join("\t"))?;
        }
        Ok(())
    }

    fn parse(text: &str) -> Result<Self> {
        let mut header = HeaderReader::new(text);
        header.expect_format(FILE_HEADER)?;

        let dataset_name = header.field("DatasetName")?;
        let info_text = header.field("InfoText")?;
        let num_input: usize = header.parsed("NumInputDimensions")?;
        let num_target: usize = header.parsed("NumTargetDimensions")?;
        let total: usize = header.parsed("TotalNumExamples")?;
        header.field("Data")?;

        let mut data = Self::new(num_input, num_target);
        data.dataset_name = dataset_name;
        data.info_text = info_text;
        for (line_no, line) in header.rows() {
            let mut row = format::parse_row(line_no, line)?;
            data.push_row(line_no, &mut row)?;
        }

        if data.num_samples() != total {
            return Err(Error::InvalidData(format!(
                "header declares {} examples but {} were read",
                total,
                data.num_samples()
            )));
        }
        Ok(data)
    }
}

impl Index<usize> for RegressionData {
    type Output = RegressionSample;

    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl<'a> IntoIterator for &'a RegressionData {
    type Item = &'a RegressionSample;
    type IntoIter = std::slice::Iter<'a, RegressionSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// Summary of a regression dataset, printable with `{}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionStats {
    pub dataset_name: String,
    pub info_text: String,
    pub num_samples: usize,
    pub num_input_dimensions: usize,
    pub num_target_dimensions: usize,
    pub input_ranges: Vec<MinMax>,
    pub target_ranges: Vec<MinMax>,
}

impl fmt::Display for RegressionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DatasetName:\t{}", self.dataset_name)?;
        writeln!(f, "DatasetInfo:\t{}", self.info_text)?;
        writeln!(f, "Number of Samples:\t{}", self.num_samples)?;
        writeln!(f, "Number of Input Dimensions:\t{}", self.num_input_dimensions)?;
        writeln!(f, "Number of Target Dimensions:\t{}", self.num_target_dimensions)?;
        writeln!(f, "Input Ranges:")?;
        for (j, range) in self.input_ranges.iter().enumerate() {
            writeln!(f, "[{}] Min:\t{}\tMax:\t{}", j + 1, range.min, range.max)?;
        }
        writeln!(f, "Target Ranges:")?;
        for (j, range) in self.target_ranges.iter().enumerate() {
            writeln!(f, "[{}] Min:\t{}\tMax:\t{}", j + 1, range.min, range.max)?;
        }
        Ok(())
    }
}
