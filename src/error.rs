//! Error types shared across the emulator
//!
//! End of stream is an expected outcome, not a failure: it is reported as
//! [`StreamError::EndOfStream`] so the emulator loop can finish cleanly.

use thiserror::Error;

/// Errors produced by a [`DataStream`](crate::stream::DataStream)
#[derive(Debug, Error)]
pub enum StreamError {
    /// The source was closed and all buffered data has been consumed
    #[error("end of stream")]
    EndOfStream,
    /// The transport failed while reading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// Whether this is the clean end-of-stream condition
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, StreamError::EndOfStream)
    }
}

/// Errors produced while reading a control sequence body
#[derive(Debug, Error)]
pub enum SequenceError {
    /// The stream ended before the sequence terminator
    #[error("unterminated sequence")]
    Unterminated,
    /// The sequence exceeded its length limit
    #[error("sequence longer than {limit} characters")]
    TooLong { limit: usize },
    /// A NUL character appeared inside an OSC string
    #[error("NUL character inside OSC string")]
    NulInOsc,
    /// A character that can never appear in this sequence
    #[error("invalid character {0:?} in sequence")]
    InvalidByte(char),
    /// The sequence was cancelled by CAN or SUB
    #[error("sequence cancelled")]
    Cancelled,
    /// Underlying stream failure other than end of stream
    #[error(transparent)]
    Stream(StreamError),
}

impl From<StreamError> for SequenceError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::EndOfStream => SequenceError::Unterminated,
            other => SequenceError::Stream(other),
        }
    }
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config error in '{field}': {message}")]
    Invalid { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_of_stream_maps_to_unterminated() {
        let err: SequenceError = StreamError::EndOfStream.into();
        assert!(matches!(err, SequenceError::Unterminated));
    }

    #[test]
    fn test_io_error_is_not_end_of_stream() {
        let err = StreamError::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(!err.is_end_of_stream());
        let seq: SequenceError = err.into();
        assert!(matches!(seq, SequenceError::Stream(_)));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            field: "rows".to_string(),
            message: "must be at least 1".to_string(),
        };
        assert_eq!(err.to_string(), "config error in 'rows': must be at least 1");
    }
}
