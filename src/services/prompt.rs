use crate::error::GenerationError;
use crate::models::Task;
use crate::services::keywords::{DEFAULT_KEYWORD_COUNT, extract_keywords};
use crate::services::llm::TextGenerator;
use crate::utils::truncate_chars;

/// Characters of context embedded in any one prompt. Longer context is cut
/// without notice.
pub const CONTEXT_CHAR_BUDGET: usize = 3000;

fn template_prefix(task: Task) -> Option<&'static str> {
    match task {
        Task::LessonPlan => Some("Create a lesson plan for the following content:"),
        Task::Mcqs => Some("Generate multiple choice questions for the following content:"),
        Task::ShortQuestions => Some("Generate short answer questions for the following content:"),
        Task::Summarize => Some("Summarize the following content:"),
        Task::ExtractKeywords => None,
    }
}

/// Builds the generation prompt for `task`, or `None` for tasks answered
/// locally.
pub fn build_task_prompt(task: Task, context: &str) -> Option<String> {
    template_prefix(task)
        .map(|prefix| format!("{}\n\n{}", prefix, truncate_chars(context, CONTEXT_CHAR_BUDGET)))
}

pub fn build_chat_prompt(question: &str, context: &str) -> String {
    format!(
        "You are an educational assistant. The user uploaded the following content:\n\n\
         {}\n\n\
         User question: {}\n\n\
         Please provide a clear, concise and helpful answer based on the above content.",
        truncate_chars(context, CONTEXT_CHAR_BUDGET),
        question
    )
}

/// Runs one menu task over `context`.
///
/// Keyword extraction never reaches the generator; every other task makes
/// exactly one generator call and returns its output untouched.
pub async fn run_task<G: TextGenerator>(
    task: Task,
    context: &str,
    generator: &G,
) -> Result<String, GenerationError> {
    match build_task_prompt(task, context) {
        Some(prompt) => {
            tracing::info!("running task {:?}", task.label());
            generator.generate_text(&prompt).await
        }
        None => {
            let keywords = extract_keywords(context, DEFAULT_KEYWORD_COUNT);
            Ok(format!("Keywords: {}", keywords.join(", ")))
        }
    }
}

/// Answers a chat question from `context` alone.
pub async fn answer_question<G: TextGenerator>(
    question: &str,
    context: &str,
    generator: &G,
) -> Result<String, GenerationError> {
    generator.generate_text(&build_chat_prompt(question, context)).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records prompts and answers with a canned reply.
    #[derive(Default)]
    pub(crate) struct StubGenerator {
        pub prompts: Mutex<Vec<String>>,
        pub fail: bool,
        pub delay: Option<Duration>,
    }

    impl StubGenerator {
        pub(crate) fn failing() -> Self {
            StubGenerator {
                fail: true,
                ..Default::default()
            }
        }

        /// Answers only after `delay`, leaving room for concurrent requests.
        pub(crate) fn slow(delay: Duration) -> Self {
            StubGenerator {
                delay: Some(delay),
                ..Default::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl TextGenerator for StubGenerator {
        async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(GenerationError::Status {
                    status: 503,
                    body: "overloaded".to_string(),
                });
            }
            Ok(format!("generated from {} chars", prompt.chars().count()))
        }
    }

    #[test]
    fn long_context_is_cut_to_budget() {
        let context = "x".repeat(5000);
        let prompt = build_task_prompt(Task::Summarize, &context).unwrap();
        assert_eq!(
            prompt,
            format!("Summarize the following content:\n\n{}", "x".repeat(3000))
        );

        let chat = build_chat_prompt("why?", &context);
        assert!(chat.contains(&"x".repeat(3000)));
        assert!(!chat.contains(&"x".repeat(3001)));
    }

    #[test]
    fn every_generative_task_embeds_its_prefix() {
        for (task, prefix) in [
            (Task::LessonPlan, "Create a lesson plan"),
            (Task::Mcqs, "Generate multiple choice questions"),
            (Task::ShortQuestions, "Generate short answer questions"),
            (Task::Summarize, "Summarize the following content:"),
        ] {
            let prompt = build_task_prompt(task, "photosynthesis").unwrap();
            assert!(prompt.starts_with(prefix), "{prompt}");
            assert!(prompt.ends_with("\n\nphotosynthesis"));
        }
        assert!(build_task_prompt(Task::ExtractKeywords, "text").is_none());
    }

    #[test]
    fn chat_prompt_carries_persona_and_question() {
        let prompt = build_chat_prompt("What is a cell?", "Cells are units of life.");
        assert!(prompt.starts_with("You are an educational assistant."));
        assert!(prompt.contains("\n\nCells are units of life.\n\n"));
        assert!(prompt.contains("User question: What is a cell?"));
        assert!(prompt.ends_with("based on the above content."));
    }

    #[tokio::test]
    async fn keyword_task_skips_the_generator() {
        let generator = StubGenerator::default();
        let result = run_task(
            Task::ExtractKeywords,
            "the cat sat on the mat the cat ran",
            &generator,
        )
        .await
        .unwrap();
        assert_eq!(result, "Keywords: cat, sat, mat, ran");
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn generator_output_is_returned_unchanged() {
        let generator = StubGenerator::default();
        let result = run_task(Task::LessonPlan, "abc", &generator).await.unwrap();
        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(result, format!("generated from {} chars", calls[0].chars().count()));
    }

    #[tokio::test]
    async fn generator_failure_is_not_retried() {
        let generator = StubGenerator::failing();
        let err = answer_question("q", "ctx", &generator).await.unwrap_err();
        assert!(matches!(err, GenerationError::Status { status: 503, .. }));
        assert_eq!(generator.calls().len(), 1);
    }
}
