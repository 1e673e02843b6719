use crate::error::ExtractionError;
use crate::utils::{strip_bom, truncate_chars};
use docx_rs::{DocumentChild, ParagraphChild, RunChild};

/// Uploaded text beyond this many characters is dropped before any processing.
pub const MAX_UPLOAD_CHARS: usize = 12000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Docx,
    Text,
}

impl SourceFormat {
    pub fn from_filename(filename: &str) -> Result<Self, ExtractionError> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            Ok(SourceFormat::Pdf)
        } else if lower.ends_with(".docx") {
            Ok(SourceFormat::Docx)
        } else if lower.ends_with(".txt") {
            Ok(SourceFormat::Text)
        } else {
            Err(ExtractionError::UnsupportedFormat(filename.to_string()))
        }
    }
}

#[derive(Debug)]
pub struct Extracted {
    pub text: String,
    pub truncated: bool,
}

/// Recovers plain text from an uploaded file, capped at [`MAX_UPLOAD_CHARS`].
///
/// Parsing runs on the blocking pool; a parser panic is reported as an
/// extraction failure.
pub async fn extract_upload(filename: &str, bytes: Vec<u8>) -> Result<Extracted, ExtractionError> {
    let format = SourceFormat::from_filename(filename)?;
    let text = tokio::task::spawn_blocking(move || extract_text(format, &bytes))
        .await
        .map_err(|_| ExtractionError::ParserPanicked)??;

    let total_chars = text.chars().count();
    let truncated = total_chars > MAX_UPLOAD_CHARS;
    if truncated {
        tracing::warn!(
            "{} has {} characters, keeping the first {}",
            filename,
            total_chars,
            MAX_UPLOAD_CHARS
        );
    }

    Ok(Extracted {
        text: truncate_chars(&text, MAX_UPLOAD_CHARS).to_string(),
        truncated,
    })
}

pub fn extract_text(format: SourceFormat, bytes: &[u8]) -> Result<String, ExtractionError> {
    match format {
        SourceFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractionError::Pdf(e.to_string())),
        SourceFormat::Docx => extract_docx(bytes),
        SourceFormat::Text => Ok(String::from_utf8(strip_bom(bytes).to_vec())?),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        let DocumentChild::Paragraph(paragraph) = child else {
            continue;
        };
        let mut text = String::new();
        for paragraph_child in &paragraph.children {
            let ParagraphChild::Run(run) = paragraph_child else {
                continue;
            };
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
        paragraphs.push(text);
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::export::to_word;

    #[test]
    fn format_follows_extension() {
        assert_eq!(SourceFormat::from_filename("Book.PDF").unwrap(), SourceFormat::Pdf);
        assert_eq!(SourceFormat::from_filename("notes.docx").unwrap(), SourceFormat::Docx);
        assert_eq!(SourceFormat::from_filename("a.txt").unwrap(), SourceFormat::Text);
        assert!(matches!(
            SourceFormat::from_filename("slides.pptx"),
            Err(ExtractionError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn reads_paragraphs_from_word_documents() {
        let bytes = to_word("Chapter 1: Cells\nCells are small.").unwrap();
        let text = extract_text(SourceFormat::Docx, &bytes).unwrap();
        assert_eq!(text, "Chapter 1: Cells\nCells are small.");
    }

    #[test]
    fn garbage_is_an_extraction_error() {
        assert!(matches!(
            extract_text(SourceFormat::Docx, b"definitely not a zip"),
            Err(ExtractionError::Docx(_))
        ));
        assert!(matches!(
            extract_text(SourceFormat::Text, &[0xFF, 0xFE, 0x00]),
            Err(ExtractionError::InvalidUtf8(_))
        ));
    }

    #[tokio::test]
    async fn uploads_are_capped() {
        let body = "a".repeat(MAX_UPLOAD_CHARS + 50);
        let extracted = extract_upload("big.txt", body.into_bytes()).await.unwrap();
        assert!(extracted.truncated);
        assert_eq!(extracted.text.chars().count(), MAX_UPLOAD_CHARS);

        let extracted = extract_upload("small.txt", b"\xEF\xBB\xBFhello".to_vec())
            .await
            .unwrap();
        assert!(!extracted.truncated);
        assert_eq!(extracted.text, "hello");
    }
}
