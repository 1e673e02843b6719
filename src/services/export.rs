use crate::error::{EncodingError, ExportError};
use crate::models::ChatEntry;
use docx_rs::{Docx, Paragraph, Run};
use lopdf::content::{Content, Operation};
use lopdf::dictionary;
use lopdf::{Document, Object, ObjectId, Stream};
use std::io::Cursor;

pub const ASSISTANT_NAME: &str = "Curriculens";

// A4 in points, Courier 12pt (every glyph is 7.2pt wide).
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN_LEFT: i64 = 28;
const MARGIN_TOP: i64 = 28;
const MARGIN_BOTTOM: i64 = 42;
const FONT_SIZE: i64 = 12;
const LEADING: i64 = 14;
const CHARS_PER_LINE: usize = 74;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM) / LEADING) as usize;

/// Renders `text` as a PDF, one line per input line, wrapping long lines.
///
/// The built-in PDF fonts only cover Latin-1, so any other character is
/// rejected rather than dropped.
pub fn to_pdf(text: &str) -> Result<Vec<u8>, ExportError> {
    check_latin1(text)?;

    let lines: Vec<String> = text
        .split('\n')
        .flat_map(|line| wrap_line(&line.replace('\r', "").replace('\t', "    ")))
        .collect();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    // `split` yields at least one line, so there is always a first page.
    let mut page_ids: Vec<ObjectId> = Vec::new();
    for page_lines in lines.chunks(LINES_PER_PAGE) {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new(
                "Td",
                vec![MARGIN_LEFT.into(), (PAGE_HEIGHT - MARGIN_TOP - FONT_SIZE).into()],
            ),
        ];
        for line in page_lines {
            // Checked above: every char fits in one byte.
            let bytes: Vec<u8> = line.chars().map(|c| c as u8).collect();
            operations.push(Operation::new("Tj", vec![Object::string_literal(bytes)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => page_ids.len() as i64,
        "Kids" => page_ids.into_iter().map(Object::from).collect::<Vec<Object>>(),
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(buffer)
}

fn check_latin1(text: &str) -> Result<(), EncodingError> {
    // WinAnsiEncoding maps 0x80-0x9F to typographic glyphs, not C1 controls.
    match text
        .chars()
        .enumerate()
        .find(|(_, c)| *c as u32 > 0xFF || matches!(*c, '\u{80}'..='\u{9F}'))
    {
        Some((position, ch)) => Err(EncodingError { ch, position }),
        None => Ok(()),
    }
}

/// Greedy word wrap to [`CHARS_PER_LINE`]; words longer than a line are split.
fn wrap_line(line: &str) -> Vec<String> {
    let mut wrapped = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split(' ') {
        let mut word: Vec<char> = word.chars().collect();

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > CHARS_PER_LINE && current_len > 0 {
            wrapped.push(std::mem::take(&mut current));
            current_len = 0;
        }

        while word.len() > CHARS_PER_LINE {
            let rest = word.split_off(CHARS_PER_LINE);
            wrapped.push(word.into_iter().collect());
            word = rest;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    wrapped.push(current);
    wrapped
}

/// Renders `text` as a Word document with one paragraph per line.
pub fn to_word(text: &str) -> Result<Vec<u8>, ExportError> {
    let mut docx = Docx::new();
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)));
    }

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| ExportError::Word(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Plain-text chat transcript, most recent exchange first.
pub fn chat_transcript(history: &[ChatEntry]) -> String {
    let mut lines = Vec::new();
    for entry in history.iter().rev() {
        let chapter_info = entry
            .chapter
            .map(|n| format!(" (Chapter {})", n))
            .unwrap_or_default();
        lines.push(format!("You{}: {}", chapter_info, entry.user));
        lines.push(format!("{}: {}", ASSISTANT_NAME, entry.bot));
        lines.push(String::new());
    }
    lines.join("\n")
}
