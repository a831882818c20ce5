use super::{DocumentExtractor, ExtractionError};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use zip::ZipArchive;

const DEGRADED_NOTICE: &str = "Pengguna mengirim file presentasi yang tidak bisa dibaca otomatis. \
Sampaikan dengan sopan bahwa file ini belum bisa dianalisis dan minta pengguna \
mengonversinya ke PDF lalu mengirim ulang.";

/// Slide text of a `.pptx` deck: slides in numeric order, one paragraph per line,
/// slides separated by a blank line.
pub struct PresentationExtractor;

impl DocumentExtractor for PresentationExtractor {
    fn label(&self) -> &'static str {
        "PPT"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(presentation_error)?;

        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slides.sort_by_key(|(number, _)| *number);

        if slides.is_empty() {
            return Err(ExtractionError::Presentation(
                "archive contains no slides".to_string(),
            ));
        }

        let mut sections = Vec::with_capacity(slides.len());
        for (_, name) in &slides {
            let mut xml = String::new();
            archive
                .by_name(name)
                .map_err(presentation_error)?
                .read_to_string(&mut xml)
                .map_err(presentation_error)?;

            let text = slide_text(&xml)?;
            if !text.is_empty() {
                sections.push(text);
            }
        }

        Ok(sections.join("\n\n"))
    }

    fn degraded_notice(&self) -> Option<&'static str> {
        Some(DEGRADED_NOTICE)
    }
}

fn presentation_error(e: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Presentation(e.to_string())
}

/// `ppt/slides/slide12.xml` -> `12`. Layouts, masters and notes are skipped.
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Collect the `a:t` runs of one slide, breaking lines at `a:p` boundaries.
fn slide_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let line = current.trim();
                    if !line.is_empty() {
                        paragraphs.push(line.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(presentation_error)?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(presentation_error(e)),
            _ => {}
        }
    }

    let line = current.trim();
    if !line.is_empty() {
        paragraphs.push(line.to_string());
    }

    Ok(paragraphs.join("\n"))
}
