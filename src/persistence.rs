//! JSON model files.
//!
//! Every file is an envelope `{ "format": .., "version": .., "model": .. }`
//! so that loading, say, a pipeline file into a classifier fails cleanly
//! instead of producing a half-initialised model.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format: &'a str,
    version: u32,
    model: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    format: String,
    version: u32,
    model: serde_json::Value,
}

/// Types that can be written to and restored from a model file.
pub trait Persistent: Serialize + DeserializeOwned {
    /// Identifier stored in the `format` field.
    const FORMAT: &'static str;

    fn save_model_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(
            &mut writer,
            &EnvelopeRef {
                format: Self::FORMAT,
                version: FORMAT_VERSION,
                model: self,
            },
        )?;
        writer.flush()?;
        tracing::debug!(path = %path.display(), format = Self::FORMAT, "saved model");
        Ok(())
    }

    /// Replaces `self` with the model stored at `path`.
    fn load_model_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        *self = Self::read_from_file(path)?;
        Ok(())
    }

    fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let envelope: Envelope = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        if envelope.format != Self::FORMAT {
            return Err(Error::UnknownFormat {
                expected: Self::FORMAT.to_string(),
                found: envelope.format,
            });
        }
        if envelope.version != FORMAT_VERSION {
            return Err(Error::UnknownFormat {
                expected: format!("{} v{}", Self::FORMAT, FORMAT_VERSION),
                found: format!("{} v{}", envelope.format, envelope.version),
            });
        }
        let model = serde_json::from_value(envelope.model)?;
        tracing::debug!(path = %path.display(), format = Self::FORMAT, "loaded model");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Weights {
        values: Vec<f64>,
    }

    impl Persistent for Weights {
        const FORMAT: &'static str = "test.weights";
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Other {
        values: Vec<f64>,
    }

    impl Persistent for Other {
        const FORMAT: &'static str = "test.other";
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        let weights = Weights {
            values: vec![0.1, -2.5, 1e-12],
        };
        weights.save_model_to_file(&path).unwrap();

        let mut loaded = Weights { values: vec![] };
        loaded.load_model_from_file(&path).unwrap();
        assert_eq!(loaded, weights);
    }

    #[test]
    fn test_wrong_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        Weights { values: vec![1.0] }.save_model_to_file(&path).unwrap();

        let err = Other::read_from_file(&path).unwrap_err();
        assert!(matches!(err, Error::UnknownFormat { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = Weights::read_from_file("/nonexistent/weights.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
