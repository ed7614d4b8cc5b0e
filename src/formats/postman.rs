//! Postman JSON decoding and encoding.

use std::path::Path;

use crate::error::ConvertError;
use crate::model::postman::PostmanCollection;

const FORMAT: &str = "Postman";

/// Decode a Postman collection from JSON text.
pub fn decode(content: &str, path: &Path) -> Result<PostmanCollection, ConvertError> {
    serde_json::from_str(content).map_err(|e| ConvertError::DocumentParseError {
        path: path.to_path_buf(),
        format: FORMAT.to_string(),
        detail: e.to_string(),
    })
}

/// Encode a Postman collection as two-space indented JSON with a trailing newline.
pub fn encode(collection: &PostmanCollection) -> Result<String, ConvertError> {
    let mut json =
        serde_json::to_string_pretty(collection).map_err(|e| ConvertError::DocumentEncodeError {
            format: FORMAT.to_string(),
            detail: e.to_string(),
        })?;
    json.push('\n');
    Ok(json)
}
