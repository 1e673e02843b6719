use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chapter number to chapter title, iterated in numeric order.
pub type ChapterMap = BTreeMap<u32, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocumentKind {
    #[default]
    Syllabus,
    Book,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    #[serde(rename = "Lesson Plan")]
    LessonPlan,
    #[serde(rename = "MCQs")]
    Mcqs,
    #[serde(rename = "Short Questions")]
    ShortQuestions,
    #[serde(rename = "Summarize")]
    Summarize,
    #[serde(rename = "Extract Keywords")]
    ExtractKeywords,
}

impl Task {
    pub fn label(self) -> &'static str {
        match self {
            Task::LessonPlan => "Lesson Plan",
            Task::Mcqs => "MCQs",
            Task::ShortQuestions => "Short Questions",
            Task::Summarize => "Summarize",
            Task::ExtractKeywords => "Extract Keywords",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub user: String,
    pub bot: String,
    pub chapter: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Word,
    Txt,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Word => "docx",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Word => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Txt => "text/plain; charset=utf-8",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChapterInfo {
    pub number: u32,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResult {
    pub success: bool,
    pub filename: String,
    pub characters: usize,
    pub truncated: bool,
    pub chapters: Vec<ChapterInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub task: Task,
    #[serde(default)]
    pub chapter: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub chapter: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: ExportFormat,
}
