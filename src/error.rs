//! Actionable typed errors for i2p.
//!
//! Every variant is fatal for the run: nothing is written when one is raised.
//! Internal propagation uses `anyhow`; the public API raises these
//! `thiserror` types so the CLI can render a stable `error_type`.

use std::path::PathBuf;

/// Errors that abort a conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// File extension does not map to a known document format.
    #[error(
        "Unsupported file extension '{extension}' for {}. Use .yaml/.yml for Insomnia or .json for Postman.",
        path.display()
    )]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Input and output would be the same document format.
    #[error(
        "{} and {} are both {format} documents. The output must use the other format.",
        input.display(),
        output.display()
    )]
    SameFormat {
        input: PathBuf,
        output: PathBuf,
        format: String,
    },

    /// Input file could not be read.
    #[error("Failed to read {}: {detail}", path.display())]
    DocumentReadError { path: PathBuf, detail: String },

    /// Input file is not a valid document of the expected format.
    #[error("Failed to parse {format} document at {}: {detail}", path.display())]
    DocumentParseError {
        path: PathBuf,
        format: String,
        detail: String,
    },

    /// Converted document could not be encoded.
    #[error("Failed to encode {format} document: {detail}")]
    DocumentEncodeError { format: String, detail: String },

    /// Output file could not be written.
    #[error("Failed to write {}: {detail}", path.display())]
    DocumentWriteError { path: PathBuf, detail: String },
}

impl ConvertError {
    /// Stable identifier used in `--json` error output.
    pub fn error_type(&self) -> &'static str {
        match self {
            ConvertError::UnsupportedFormat { .. } => "UnsupportedFormat",
            ConvertError::SameFormat { .. } => "SameFormat",
            ConvertError::DocumentReadError { .. } => "DocumentReadError",
            ConvertError::DocumentParseError { .. } => "DocumentParseError",
            ConvertError::DocumentEncodeError { .. } => "DocumentEncodeError",
            ConvertError::DocumentWriteError { .. } => "DocumentWriteError",
        }
    }
}
