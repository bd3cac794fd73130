//! Scan error types
//!
//! Error codes:
//! - FLAT_SCAN_IO_ERROR (ERROR) - open, seek, or read failure
//! - FLAT_MISCONFIGURED (REJECT) - schema problem surfaced at scan construction
//! - FLAT_QUERY_INVALID (REJECT) - query problem surfaced at scan construction

use std::fmt;
use std::io;

use crate::query::QueryError;
use crate::schema::SchemaError;

/// Severity levels for scan errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The scan is rejected before yielding anything
    Reject,
    /// The scan fails; other scans on the same file continue
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Scan-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorCode {
    /// File open, seek, or read failure
    Io,
    /// Schema misconfiguration detected while building the scan
    Misconfigured,
    /// Query cannot be compiled (bad pattern, unknown operator)
    QueryInvalid,
}

impl ScanErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ScanErrorCode::Io => "FLAT_SCAN_IO_ERROR",
            ScanErrorCode::Misconfigured => "FLAT_MISCONFIGURED",
            ScanErrorCode::QueryInvalid => "FLAT_QUERY_INVALID",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ScanErrorCode::Io => Severity::Error,
            ScanErrorCode::Misconfigured => Severity::Reject,
            ScanErrorCode::QueryInvalid => Severity::Reject,
        }
    }
}

impl fmt::Display for ScanErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Scan error with full context
#[derive(Debug)]
pub struct ScanError {
    /// Error code
    code: ScanErrorCode,
    /// Human-readable message
    message: String,
    /// Underlying IO error if applicable
    source: Option<io::Error>,
}

impl ScanError {
    /// Create an IO error with its source
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: ScanErrorCode::Io,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an IO error with no underlying source
    pub fn io_state(message: impl Into<String>) -> Self {
        Self {
            code: ScanErrorCode::Io,
            message: message.into(),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ScanErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref source) = self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<SchemaError> for ScanError {
    fn from(err: SchemaError) -> Self {
        Self {
            code: ScanErrorCode::Misconfigured,
            message: err.to_string(),
            source: None,
        }
    }
}

impl From<QueryError> for ScanError {
    fn from(err: QueryError) -> Self {
        Self {
            code: ScanErrorCode::QueryInvalid,
            message: err.to_string(),
            source: None,
        }
    }
}

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;
