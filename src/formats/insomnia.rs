//! Insomnia YAML decoding and encoding.

use std::path::Path;

use crate::error::ConvertError;
use crate::model::insomnia::InsomniaExport;

const FORMAT: &str = "Insomnia";

/// Decode an Insomnia export from YAML text.
pub fn decode(content: &str, path: &Path) -> Result<InsomniaExport, ConvertError> {
    serde_yaml::from_str(content).map_err(|e| ConvertError::DocumentParseError {
        path: path.to_path_buf(),
        format: FORMAT.to_string(),
        detail: e.to_string(),
    })
}

/// Encode an Insomnia export as YAML with two-space nesting.
pub fn encode(export: &InsomniaExport) -> Result<String, ConvertError> {
    serde_yaml::to_string(export).map_err(|e| ConvertError::DocumentEncodeError {
        format: FORMAT.to_string(),
        detail: e.to_string(),
    })
}
