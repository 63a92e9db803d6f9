//! Helpers shared by the native text dataset formats and the CSV loaders.

use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

pub(crate) fn is_csv<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Walks the `Key: value` header of a native dataset file.
pub(crate) struct HeaderReader<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> HeaderReader<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
        }
    }

    /// Next non-empty line along with its 1-based line number.
    pub(crate) fn next_line(&mut self) -> Result<(usize, &'a str)> {
        for (i, line) in self.lines.by_ref() {
            let line = line.trim_end_matches('\r');
            if !line.trim().is_empty() {
                return Ok((i + 1, line));
            }
        }
        Err(Error::parse(0, "unexpected end of file"))
    }

    pub(crate) fn expect_format(&mut self, expected: &str) -> Result<()> {
        let (_, line) = self.next_line()?;
        let found = line.trim();
        if found != expected {
            return Err(Error::UnknownFormat {
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    /// Reads a `key:` line and returns the (trimmed, possibly empty) value.
    pub(crate) fn field(&mut self, key: &str) -> Result<String> {
        self.field_at(key).map(|(_, value)| value)
    }

    fn field_at(&mut self, key: &str) -> Result<(usize, String)> {
        let (line_no, line) = self.next_line()?;
        let (found_key, value) = line
            .split_once(':')
            .ok_or_else(|| Error::parse(line_no, format!("expected `{}:`", key)))?;
        if found_key.trim() != key {
            return Err(Error::parse(
                line_no,
                format!("expected `{}:`, found `{}`", key, found_key.trim()),
            ));
        }
        Ok((line_no, value.trim().to_string()))
    }

    pub(crate) fn parsed<T: FromStr>(&mut self, key: &str) -> Result<T> {
        let (line_no, value) = self.field_at(key)?;
        value
            .parse()
            .map_err(|_| Error::parse(line_no, format!("invalid value `{}` for {}", value, key)))
    }

    /// Remaining non-empty lines.
    pub(crate) fn rows(self) -> impl Iterator<Item = (usize, &'a str)> {
        self.lines
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty())
    }
}

/// Parses a whitespace separated row of numbers.
pub(crate) fn parse_row(line_no: usize, line: &str) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| Error::parse(line_no, format!("invalid number `{}`", token)))
        })
        .collect()
}

/// Reads a headerless CSV file into numeric rows.
pub(crate) fn read_csv_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<f64>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line_no = record.position().map(|p| p.line() as usize).unwrap_or(0);
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let row = record
            .iter()
            .enumerate()
            .map(|(column, field)| {
                if field.is_empty() {
                    return Err(Error::parse(
                        line_no,
                        format!("empty field in column {}", column + 1),
                    ));
                }
                field
                    .parse::<f64>()
                    .map_err(|_| Error::parse(line_no, format!("invalid number `{}`", field)))
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

pub(crate) fn csv_writer<P: AsRef<Path>>(path: P) -> Result<csv::Writer<std::fs::File>> {
    Ok(csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_csv() {
        assert!(is_csv("data/train.csv"));
        assert!(is_csv("TRAIN.CSV"));
        assert!(!is_csv("train.txt"));
        assert!(!is_csv("train"));
    }

    #[test]
    fn test_header_reader() {
        let text = "FORMAT_V1\nName: demo\n\nInfoText:\nCount: 3\n1 2\n\n3 4\n";
        let mut header = HeaderReader::new(text);
        header.expect_format("FORMAT_V1").unwrap();
        assert_eq!(header.field("Name").unwrap(), "demo");
        assert_eq!(header.field("InfoText").unwrap(), "");
        assert_eq!(header.parsed::<usize>("Count").unwrap(), 3);
        let rows: Vec<_> = header.rows().collect();
        assert_eq!(rows, vec![(6, "1 2"), (8, "3 4")]);
    }

    #[test]
    fn test_wrong_format_is_rejected() {
        let mut header = HeaderReader::new("SOMETHING_ELSE\n");
        assert!(matches!(
            header.expect_format("FORMAT_V1"),
            Err(Error::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_parse_row() {
        assert_eq!(parse_row(1, "1\t2.5  -3").unwrap(), vec![1.0, 2.5, -3.0]);
        assert!(matches!(parse_row(4, "1 x"), Err(Error::Parse { line: 4, .. })));
    }

    #[test]
    fn test_csv_empty_field_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "1, 0.5, 2\n\n3, 4, 5\n").unwrap();
        assert_eq!(read_csv_rows(&path).unwrap().len(), 2);

        std::fs::write(&path, "1,,0.5\n2,1,1\n").unwrap();
        assert!(matches!(
            read_csv_rows(&path),
            Err(Error::Parse { line: 1, .. })
        ));
    }
}
