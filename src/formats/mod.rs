//! On-disk document formats and extension-based detection.
//!
//! Each format module decodes file content into the in-memory model and
//! encodes a model back into text. File access and atomic writes live in
//! [`pipeline`](crate::pipeline).

pub mod insomnia;
pub mod postman;

use std::fmt;
use std::path::Path;

use crate::error::ConvertError;

/// The two document formats i2p converts between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Insomnia YAML export.
    Insomnia,
    /// Postman JSON collection.
    Postman,
}

impl DocumentFormat {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, ConvertError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Ok(DocumentFormat::Insomnia),
            "json" => Ok(DocumentFormat::Postman),
            _ => Err(ConvertError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            DocumentFormat::Insomnia => "Insomnia",
            DocumentFormat::Postman => "Postman",
        }
    }

    /// Short slug used in JSON output.
    pub fn slug(self) -> &'static str {
        match self {
            DocumentFormat::Insomnia => "insomnia",
            DocumentFormat::Postman => "postman",
        }
    }

    /// The format a document of this format converts into.
    pub fn opposite(self) -> Self {
        match self {
            DocumentFormat::Insomnia => DocumentFormat::Postman,
            DocumentFormat::Postman => DocumentFormat::Insomnia,
        }
    }

    /// Conventional file name for a document of this format.
    pub fn default_file_name(self) -> &'static str {
        match self {
            DocumentFormat::Insomnia => "insomnia.yaml",
            DocumentFormat::Postman => "postman_collection.json",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
