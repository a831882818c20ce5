use super::{clean_text, DocumentExtractor, ExtractionError};
use docx_rs::{DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild, TableRowChild};

/// Raw text of a `.docx` body: paragraphs one per line, table cells joined by ` | `.
pub struct WordExtractor;

impl DocumentExtractor for WordExtractor {
    fn label(&self) -> &'static str {
        "WORD"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let doc = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Word(e.to_string()))?;

        let mut all_text = String::new();
        for child in &doc.document.children {
            collect_text(child, &mut all_text);
        }

        Ok(clean_text(&all_text))
    }
}

fn collect_text(element: &DocumentChild, output: &mut String) {
    match element {
        DocumentChild::Paragraph(para) => {
            push_runs(&para.children, output);
            output.push('\n');
        }
        DocumentChild::Table(table) => {
            for row in &table.rows {
                let TableChild::TableRow(tr) = row;
                let mut cells = Vec::new();
                for cell in &tr.cells {
                    let TableRowChild::TableCell(tc) = cell;
                    let mut cell_text = String::new();
                    for content in &tc.children {
                        if let TableCellContent::Paragraph(para) = content {
                            push_runs(&para.children, &mut cell_text);
                        }
                    }
                    cells.push(cell_text);
                }
                output.push_str(&cells.join(" | "));
                output.push('\n');
            }
        }
        _ => {}
    }
}

fn push_runs(children: &[ParagraphChild], output: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for run_child in &run.children {
                    if let RunChild::Text(text) = run_child {
                        output.push_str(&text.text);
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_runs(&link.children, output),
            _ => {}
        }
    }
}
