use super::{DocumentExtractor, ExtractionError};

/// Text-like uploads (source code, CSV, JSON, XML) decoded as UTF-8 verbatim.
pub struct PlainTextExtractor;

impl DocumentExtractor for PlainTextExtractor {
    fn label(&self) -> &'static str {
        "TEXT"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}
