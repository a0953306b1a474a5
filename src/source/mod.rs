pub mod reader;
pub mod record;
pub mod timestamp;

pub use reader::{validate_file, InputShape, Position, ReaderError, RecordReader};
pub use record::{LogRecord, RecordBatch};
pub use timestamp::{TimestampError, TimestampFormat, TimestampParser};
