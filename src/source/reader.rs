use crate::source::record::{LogRecord, RecordBatch};
use crate::source::timestamp::{TimestampError, TimestampParser};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input format: {0}")]
    InvalidFormat(String),

    #[error("timestamp field '{field}' not found in record at {position}")]
    MissingField { field: String, position: Position },

    #[error("bad timestamp in record at {position}: {source}")]
    Timestamp {
        position: Position,
        #[source]
        source: TimestampError,
    },
}

/// Location of a record in the source file, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Line(usize),
    ArrayIndex(usize),
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Position::Line(n) => write!(f, "line {}", n),
            Position::ArrayIndex(i) => write!(f, "array index {}", i),
        }
    }
}

/// On-disk layout detected when the file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    JsonLines,
    JsonArray,
    Empty,
}

enum RecordSource {
    Lines {
        file: BufReader<File>,
        line_no: usize,
        // First object, already parsed during shape detection
        pending: Option<(Map<String, Value>, usize)>,
    },
    Array {
        items: std::vec::IntoIter<Value>,
        index: usize,
    },
    Empty,
}

/// Streams a structured log file as ordered batches of records.
///
/// Line-delimited JSON is read incrementally. A top-level JSON array has to be
/// parsed as a whole, after which its elements are handed out batch by batch.
pub struct RecordReader {
    path: PathBuf,
    timestamp_field: String,
    parser: TimestampParser,
    batch_size: usize,

    // Internal state
    source: RecordSource,
    shape: InputShape,
    batches_emitted: usize,
    records_read: usize,
    finished: bool,
}

impl RecordReader {
    /// Open the file and detect whether it holds JSON lines or one JSON array.
    pub fn open(
        path: &Path,
        timestamp_field: &str,
        parser: TimestampParser,
        batch_size: usize,
    ) -> Result<Self, ReaderError> {
        if batch_size == 0 {
            return Err(ReaderError::InvalidFormat(
                "batch size must be at least 1".to_string(),
            ));
        }

        let (source, shape) = detect_source(path)?;
        info!(path = %path.display(), shape = ?shape, batch_size, "Opened log file");

        Ok(Self {
            path: path.to_path_buf(),
            timestamp_field: timestamp_field.to_string(),
            parser,
            batch_size,
            source,
            shape,
            batches_emitted: 0,
            records_read: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shape(&self) -> InputShape {
        self.shape
    }

    /// Total records handed out so far
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Read the next batch, or `None` once the file is exhausted
    pub fn next_batch(&mut self) -> Result<Option<RecordBatch>, ReaderError> {
        if self.finished {
            return Ok(None);
        }

        let mut records = Vec::with_capacity(self.batch_size.min(1024));
        while records.len() < self.batch_size {
            match self.next_raw()? {
                Some((fields, position)) => records.push(self.to_record(fields, position)?),
                None => {
                    self.finished = true;
                    break;
                }
            }
        }

        if records.is_empty() {
            return Ok(None);
        }

        let batch = RecordBatch {
            index: self.batches_emitted,
            records,
        };
        self.batches_emitted += 1;
        self.records_read += batch.len();
        debug!(batch = batch.index, records = batch.len(), "Read record batch");
        Ok(Some(batch))
    }

    fn next_raw(&mut self) -> Result<Option<(Map<String, Value>, Position)>, ReaderError> {
        match &mut self.source {
            RecordSource::Empty => Ok(None),
            RecordSource::Array { items, index } => {
                let Some(value) = items.next() else {
                    return Ok(None);
                };
                let position = Position::ArrayIndex(*index);
                *index += 1;
                match value {
                    Value::Object(fields) => Ok(Some((fields, position))),
                    other => Err(ReaderError::InvalidFormat(format!(
                        "expected a JSON object at {}, found {}",
                        position,
                        json_kind(&other)
                    ))),
                }
            }
            RecordSource::Lines {
                file,
                line_no,
                pending,
            } => {
                if let Some((fields, line)) = pending.take() {
                    return Ok(Some((fields, Position::Line(line))));
                }

                let mut line = String::new();
                loop {
                    line.clear();
                    if file.read_line(&mut line)? == 0 {
                        return Ok(None);
                    }
                    *line_no += 1;

                    let text = line.trim();
                    if text.is_empty() {
                        continue;
                    }

                    let position = Position::Line(*line_no);
                    return match serde_json::from_str::<Value>(text) {
                        Ok(Value::Object(fields)) => Ok(Some((fields, position))),
                        Ok(other) => Err(ReaderError::InvalidFormat(format!(
                            "expected a JSON object at {}, found {}",
                            position,
                            json_kind(&other)
                        ))),
                        Err(e) => Err(ReaderError::InvalidFormat(format!(
                            "malformed JSON at {}: {}",
                            position, e
                        ))),
                    };
                }
            }
        }
    }

    fn to_record(
        &self,
        fields: Map<String, Value>,
        position: Position,
    ) -> Result<LogRecord, ReaderError> {
        let raw = fields
            .get(&self.timestamp_field)
            .ok_or_else(|| ReaderError::MissingField {
                field: self.timestamp_field.clone(),
                position,
            })?;

        let timestamp = self
            .parser
            .parse(raw)
            .map_err(|source| ReaderError::Timestamp { position, source })?;

        Ok(LogRecord {
            timestamp,
            timestamp_field: self.timestamp_field.clone(),
            fields,
        })
    }
}

impl Iterator for RecordReader {
    type Item = Result<RecordBatch, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => None,
            Err(e) => {
                // A fatal input error ends the stream
                self.finished = true;
                self.source = RecordSource::Empty;
                Some(Err(e))
            }
        }
    }
}

/// Try line-delimited JSON first; fall back to a single top-level array when
/// the first non-blank line is not a complete JSON object.
fn detect_source(path: &Path) -> Result<(RecordSource, InputShape), ReaderError> {
    let mut file = BufReader::new(File::open(path)?);
    let mut line = String::new();
    let mut line_no = 0usize;

    loop {
        line.clear();
        if file.read_line(&mut line)? == 0 {
            return Ok((RecordSource::Empty, InputShape::Empty));
        }
        line_no += 1;
        if !line.trim().is_empty() {
            break;
        }
    }

    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(line.trim()) {
        let source = RecordSource::Lines {
            file,
            line_no,
            pending: Some((fields, line_no)),
        };
        return Ok((source, InputShape::JsonLines));
    }

    debug!(path = %path.display(), "First line is not a JSON object, parsing as JSON array");
    let whole = BufReader::new(File::open(path)?);
    match serde_json::from_reader::<_, Value>(whole) {
        Ok(Value::Array(items)) => Ok((
            RecordSource::Array {
                items: items.into_iter(),
                index: 0,
            },
            InputShape::JsonArray,
        )),
        Ok(other) => Err(ReaderError::InvalidFormat(format!(
            "expected JSON lines or a top-level JSON array, found a single {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ReaderError::InvalidFormat(format!(
            "file is neither line-delimited JSON nor a JSON array: {}",
            e
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Walk the whole file once and check that every record is an object with a
/// parseable timestamp, holding one record at a time. Returns the record count.
pub fn validate_file(
    path: &Path,
    timestamp_field: &str,
    parser: TimestampParser,
) -> Result<usize, ReaderError> {
    let mut reader = RecordReader::open(path, timestamp_field, parser, 1)?;
    let mut count = 0usize;
    while let Some((fields, position)) = reader.next_raw()? {
        reader.to_record(fields, position)?;
        count += 1;
    }
    debug!(path = %path.display(), records = count, "Validated log file");
    Ok(count)
}
