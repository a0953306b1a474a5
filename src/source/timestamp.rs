use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("failed to parse timestamp '{value}' with format '{format}': {source}")]
    ParseError {
        value: String,
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("timestamp value {value} has unsupported JSON type for format '{format}'")]
    UnsupportedType { value: String, format: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampFormat {
    Iso8601,
    Epoch,
    Strptime(String),
}

impl TimestampFormat {
    /// One of: 'iso8601', 'epoch', or any other string taken as a strptime pattern
    pub fn from_config(format: &str) -> Self {
        match format {
            "iso8601" => TimestampFormat::Iso8601,
            "epoch" => TimestampFormat::Epoch,
            other => TimestampFormat::Strptime(other.to_string()),
        }
    }

    fn name(&self) -> &str {
        match self {
            TimestampFormat::Iso8601 => "iso8601",
            TimestampFormat::Epoch => "epoch",
            TimestampFormat::Strptime(fmt) => fmt,
        }
    }
}

// Offset forms RFC 3339 rejects, such as the basic `+0000` offset.
const OFFSET_ISO_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

// Naive forms accepted in iso8601 mode, interpreted as UTC.
const NAIVE_ISO_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Converts the timestamp field of a record into a UTC instant.
#[derive(Debug, Clone)]
pub struct TimestampParser {
    format: TimestampFormat,
}

impl TimestampParser {
    pub fn new(format: &str) -> Self {
        Self {
            format: TimestampFormat::from_config(format),
        }
    }

    pub fn format(&self) -> &TimestampFormat {
        &self.format
    }

    pub fn parse(&self, value: &Value) -> Result<DateTime<Utc>, TimestampError> {
        match (&self.format, value) {
            (TimestampFormat::Epoch, Value::Number(n)) => {
                let seconds = n.as_f64().ok_or_else(|| self.unsupported(value))?;
                self.epoch_to_utc(seconds, &n.to_string())
            }
            (TimestampFormat::Epoch, Value::String(s)) => {
                let seconds: f64 = s.trim().parse().map_err(|e: std::num::ParseFloatError| {
                    TimestampError::ParseError {
                        value: s.clone(),
                        format: "epoch".to_string(),
                        source: Box::new(e),
                    }
                })?;
                self.epoch_to_utc(seconds, s)
            }
            (TimestampFormat::Iso8601, Value::String(s)) => self.parse_iso8601(s),
            (TimestampFormat::Strptime(fmt), Value::String(s)) => self.parse_strptime(s, fmt),
            _ => Err(self.unsupported(value)),
        }
    }

    fn unsupported(&self, value: &Value) -> TimestampError {
        TimestampError::UnsupportedType {
            value: value.to_string(),
            format: self.format.name().to_string(),
        }
    }

    fn parse_iso8601(&self, value: &str) -> Result<DateTime<Utc>, TimestampError> {
        let value = value.trim();
        let rfc3339_err = match DateTime::parse_from_rfc3339(value) {
            Ok(dt) => return Ok(dt.with_timezone(&Utc)),
            Err(e) => e,
        };

        let with_offset = OFFSET_ISO_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(value, fmt).ok())
            .map(|dt| dt.with_timezone(&Utc));
        if let Some(dt) = with_offset {
            return Ok(dt);
        }

        NAIVE_ISO_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            // Date only: midnight UTC
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(|ndt| Utc.from_utc_datetime(&ndt))
            .ok_or_else(|| TimestampError::ParseError {
                value: value.to_string(),
                format: "iso8601".to_string(),
                source: Box::new(rfc3339_err),
            })
    }

    fn epoch_to_utc(&self, seconds: f64, raw: &str) -> Result<DateTime<Utc>, TimestampError> {
        let out_of_range = || TimestampError::ParseError {
            value: raw.to_string(),
            format: "epoch".to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "timestamp out of range",
            )),
        };

        if !seconds.is_finite() {
            return Err(out_of_range());
        }

        let whole = seconds.floor();
        let nanos = ((seconds - whole) * 1_000_000_000.0).round() as u32;
        Utc.timestamp_opt(whole as i64, nanos.min(999_999_999))
            .single()
            .ok_or_else(out_of_range)
    }

    fn parse_strptime(&self, value: &str, format: &str) -> Result<DateTime<Utc>, TimestampError> {
        // Check if format contains timezone information
        if format.contains("%z") || format.contains("%Z") || format.contains("%:z") {
            DateTime::parse_from_str(value, format)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| TimestampError::ParseError {
                    value: value.to_string(),
                    format: format.to_string(),
                    source: Box::new(e),
                })
        } else {
            // Parse as naive datetime and assume UTC
            NaiveDateTime::parse_from_str(value, format)
                .map(|ndt| Utc.from_utc_datetime(&ndt))
                .map_err(|e| TimestampError::ParseError {
                    value: value.to_string(),
                    format: format.to_string(),
                    source: Box::new(e),
                })
        }
    }
}
