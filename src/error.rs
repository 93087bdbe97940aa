use std::fmt;

/// Error types for the HopeTurtle logger
#[derive(Debug)]
pub enum HopeTurtleError {
    /// I/O errors
    Io(std::io::Error),
    /// CSV decoding errors
    Csv(csv::Error),
    /// Parse errors with context (configuration values, log fields)
    Parse(String),
    /// Display backend failures
    Display(String),
    /// GPIO line acquisition or read failures
    Gpio(String),
    /// GPS sampler subprocess failures
    Sampler(String),
}

impl fmt::Display for HopeTurtleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HopeTurtleError::Io(err) => write!(f, "I/O error: {}", err),
            HopeTurtleError::Csv(err) => write!(f, "CSV error: {}", err),
            HopeTurtleError::Parse(msg) => write!(f, "Parse error: {}", msg),
            HopeTurtleError::Display(msg) => write!(f, "Display error: {}", msg),
            HopeTurtleError::Gpio(msg) => write!(f, "GPIO error: {}", msg),
            HopeTurtleError::Sampler(msg) => write!(f, "GPS sampler error: {}", msg),
        }
    }
}

impl std::error::Error for HopeTurtleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HopeTurtleError::Io(err) => Some(err),
            HopeTurtleError::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HopeTurtleError {
    fn from(err: std::io::Error) -> Self {
        HopeTurtleError::Io(err)
    }
}

impl From<csv::Error> for HopeTurtleError {
    fn from(err: csv::Error) -> Self {
        HopeTurtleError::Csv(err)
    }
}

impl From<glob::PatternError> for HopeTurtleError {
    fn from(err: glob::PatternError) -> Self {
        HopeTurtleError::Parse(format!("invalid log file pattern: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, HopeTurtleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_io_error_keeps_source() {
        let err: HopeTurtleError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("I/O error"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_message_variants_have_no_source() {
        let err = HopeTurtleError::Sampler("timed out after 20s".to_string());
        assert_eq!(err.to_string(), "GPS sampler error: timed out after 20s");
        assert!(err.source().is_none());
    }
}
