// src/services/extract.rs

use docx_rs::{DocumentChild, ParagraphChild, RunChild, read_docx};

use crate::error::AppError;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TXT_MIME: &str = "text/plain";

/// Converts an uploaded document into a single string, dispatching on the
/// declared MIME type. MIME types outside {PDF, DOCX, plain text} are
/// rejected, as is any document whose extracted text is blank.
pub fn extract_text(bytes: &[u8], mime: &str) -> Result<String, AppError> {
    let text = match mime {
        PDF_MIME => extract_pdf(bytes)?,
        DOCX_MIME => extract_docx(bytes)?,
        m if m == TXT_MIME || m.starts_with("text/plain;") => {
            String::from_utf8_lossy(bytes).into_owned()
        }
        other => {
            return Err(AppError::UnsupportedFormat(format!(
                "Unsupported file type: {}",
                other
            )));
        }
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::EmptyInput(
            "No text could be extracted from the file".to_string(),
        ));
    }

    Ok(text.to_string())
}

fn extract_pdf(bytes: &[u8]) -> Result<String, AppError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| AppError::BadRequest(format!("Error extracting text from PDF: {}", e)))
}

/// Concatenates the text runs of every top-level paragraph, one line per
/// paragraph, the same way a word processor would linearize the document.
fn extract_docx(bytes: &[u8]) -> Result<String, AppError> {
    let docx = read_docx(bytes)
        .map_err(|e| AppError::BadRequest(format!("Error reading DOCX file: {}", e)))?;

    let mut text = String::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            for para_child in &paragraph.children {
                if let ParagraphChild::Run(run) = para_child {
                    for run_child in &run.children {
                        if let RunChild::Text(t) = run_child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }

    Ok(text)
}
