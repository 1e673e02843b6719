pub mod chapterizer;
pub mod export;
pub mod extract;
pub mod keywords;
pub mod llm;
pub mod prompt;
