//! Document ingestion pipeline
//!
//! Classifies an uploaded file by its declared media type and turns it into
//! either inline binary content (images and PDFs, which the provider reads
//! natively) or extracted plain text. Extraction failures are contained here:
//! the caller always receives an [`ExtractionResult`], never an error.

pub mod plain_text;
pub mod presentation;
pub mod spreadsheet;
pub mod word;

pub use plain_text::PlainTextExtractor;
pub use presentation::PresentationExtractor;
pub use spreadsheet::SpreadsheetExtractor;
pub use word::WordExtractor;

use crate::models::{Attachment, AttachmentDecodeError, EncodedAttachment};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Maximum extracted text length in bytes, to keep prompts bounded.
pub const MAX_TEXT_LENGTH: usize = 500_000;

/// Container prefixes removed before the substring rules run. Without this
/// every OOXML type would match "doc" via "officedocument".
const CONTAINER_PREFIXES: [&str; 2] = ["vnd.openxmlformats-officedocument.", "vnd.oasis.opendocument."];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Word,
    Spreadsheet,
    Presentation,
    PlainText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    Visual,
    Document(DocumentKind),
    Unknown,
}

/// Classify a declared media type. Pure and total.
pub fn classify(media_type: &str) -> MediaCategory {
    let essence = essence(media_type);

    if essence.starts_with("image/") || essence == "application/pdf" {
        return MediaCategory::Visual;
    }

    let subject = CONTAINER_PREFIXES
        .iter()
        .fold(essence.clone(), |acc, prefix| acc.replace(prefix, ""));
    let has = |needle: &str| subject.contains(needle);

    if has("word") || has("doc") {
        MediaCategory::Document(DocumentKind::Word)
    } else if has("sheet") || has("excel") {
        MediaCategory::Document(DocumentKind::Spreadsheet)
    } else if has("presentation") || has("powerpoint") {
        MediaCategory::Document(DocumentKind::Presentation)
    } else if subject.starts_with("text/") || has("json") || has("xml") {
        MediaCategory::Document(DocumentKind::PlainText)
    } else {
        MediaCategory::Unknown
    }
}

/// Lower-cased media type without parameters (`text/plain; charset=utf-8` -> `text/plain`).
fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("{0}")]
    Encoding(#[from] AttachmentDecodeError),

    #[error("could not read Word document: {0}")]
    Word(String),

    #[error("could not read workbook: {0}")]
    Spreadsheet(String),

    #[error("could not read presentation: {0}")]
    Presentation(String),

    #[error("file is not valid UTF-8 text: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("document contains no extractable text")]
    NoText,

    #[error("extractor crashed on malformed input")]
    Panicked,
}

/// Outcome of ingesting the (optional) attachment of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    /// Passed through unmodified for a vision-capable provider.
    Binary { media_type: String, bytes: Vec<u8> },
    /// Extracted text, tagged with the section label shown in the prompt.
    Text { label: &'static str, content: String },
    /// Extraction failed; rendered as an inline note.
    Failed { reason: String },
    /// No attachment, or a media type nothing knows how to read.
    Empty,
}

/// One text extraction strategy per document subtype.
pub trait DocumentExtractor: Send + Sync {
    /// Section tag used when the text is injected into the prompt.
    fn label(&self) -> &'static str;

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;

    /// Text surfaced instead of a failure note when extraction fails.
    fn degraded_notice(&self) -> Option<&'static str> {
        None
    }
}

/// The set of extractors used by the pipeline. Each slot can be swapped.
pub struct Extractors {
    pub word: Box<dyn DocumentExtractor>,
    pub spreadsheet: Box<dyn DocumentExtractor>,
    pub presentation: Box<dyn DocumentExtractor>,
    pub plain_text: Box<dyn DocumentExtractor>,
}

impl Default for Extractors {
    fn default() -> Self {
        Self {
            word: Box::new(WordExtractor),
            spreadsheet: Box::new(SpreadsheetExtractor),
            presentation: Box::new(PresentationExtractor),
            plain_text: Box::new(PlainTextExtractor),
        }
    }
}

impl Extractors {
    fn for_kind(&self, kind: DocumentKind) -> &dyn DocumentExtractor {
        match kind {
            DocumentKind::Word => self.word.as_ref(),
            DocumentKind::Spreadsheet => self.spreadsheet.as_ref(),
            DocumentKind::Presentation => self.presentation.as_ref(),
            DocumentKind::PlainText => self.plain_text.as_ref(),
        }
    }
}

/// Routes an attachment to exactly one extraction path.
#[derive(Default)]
pub struct Ingestor {
    extractors: Extractors,
}

impl Ingestor {
    pub fn new(extractors: Extractors) -> Self {
        Self { extractors }
    }

    /// Decode and ingest an upload. `None` yields [`ExtractionResult::Empty`].
    pub fn ingest(&self, upload: Option<&EncodedAttachment>) -> ExtractionResult {
        let Some(upload) = upload else {
            return ExtractionResult::Empty;
        };

        match upload.decode() {
            Ok(attachment) => self.ingest_attachment(&attachment),
            Err(e) => {
                let err = ExtractionError::from(e);
                warn!("Could not decode {} upload: {}", upload.media_type, err);
                ExtractionResult::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    pub fn ingest_attachment(&self, attachment: &Attachment) -> ExtractionResult {
        match classify(&attachment.media_type) {
            MediaCategory::Visual => {
                debug!(
                    "Passing {} ({} bytes) through as inline data",
                    attachment.media_type,
                    attachment.raw_bytes.len()
                );
                ExtractionResult::Binary {
                    media_type: essence(&attachment.media_type),
                    bytes: attachment.raw_bytes.clone(),
                }
            }
            MediaCategory::Document(kind) => self.extract_document(kind, attachment),
            MediaCategory::Unknown => {
                info!(
                    "Ignoring attachment with unsupported media type {}",
                    attachment.media_type
                );
                ExtractionResult::Empty
            }
        }
    }

    fn extract_document(&self, kind: DocumentKind, attachment: &Attachment) -> ExtractionResult {
        let extractor = self.extractors.for_kind(kind);
        let label = extractor.label();

        let outcome = catch_unwind(AssertUnwindSafe(|| extractor.extract(&attachment.raw_bytes)))
            .unwrap_or(Err(ExtractionError::Panicked))
            .and_then(|text| {
                if text.trim().is_empty() {
                    Err(ExtractionError::NoText)
                } else {
                    Ok(truncate_text(&text, MAX_TEXT_LENGTH))
                }
            });

        match outcome {
            Ok(content) => {
                info!(
                    "{} extraction: {} chars from {} bytes",
                    label,
                    content.chars().count(),
                    attachment.raw_bytes.len()
                );
                ExtractionResult::Text { label, content }
            }
            Err(e) => {
                warn!("{} extraction failed for {}: {}", label, attachment.media_type, e);
                match extractor.degraded_notice() {
                    Some(notice) => ExtractionResult::Text {
                        label,
                        content: notice.to_string(),
                    },
                    None => ExtractionResult::Failed {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }
}

/// Trim every line and drop blank ones.
pub(crate) fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `text` to at most `max` bytes without splitting a character.
pub(crate) fn truncate_text(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
