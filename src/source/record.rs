use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// A single structured log entry.
///
/// `fields` keeps the keys in the order they appeared in the source document.
/// The designated timestamp field is always present; its normalized value is
/// held in `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub timestamp_field: String,
    pub fields: Map<String, Value>,
}

impl LogRecord {
    /// Serialize the record as one line of JSON.
    ///
    /// Field order follows the source document and the timestamp field is
    /// rendered as ISO-8601 UTC with millisecond precision, so identical input
    /// always produces identical text.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut out = Map::with_capacity(self.fields.len());
        for (key, value) in &self.fields {
            if *key == self.timestamp_field {
                out.insert(key.clone(), Value::String(render_timestamp(&self.timestamp)));
            } else {
                out.insert(key.clone(), value.clone());
            }
        }
        serde_json::to_string(&Value::Object(out))
    }
}

pub fn render_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A contiguous run of records read from the source, at most
/// `dataframe_chunk_size` long.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub index: usize,
    pub records: Vec<LogRecord>,
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stable sort by timestamp; records with equal timestamps keep file order.
    pub fn sort_by_timestamp(&mut self) {
        self.records.sort_by_key(|r| r.timestamp);
    }
}
