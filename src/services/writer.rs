use crate::models::{BookBrief, ChapterContent, ChapterSkeleton};
use crate::services::llm::{GenerationError, TextGenerator};
use std::sync::Arc;

pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const NO_CONTENT: &str = "No content generated.";

pub fn error_placeholder(label: &str) -> String {
    format!("Error generating content for {}.", label)
}

/// Everything written so far, in chapter order. Only ever appended to.
#[derive(Debug, Default)]
pub struct StoryContext {
    text: String,
}

impl StoryContext {
    pub fn append(&mut self, body: &str) {
        if !self.text.is_empty() {
            self.text.push_str("\n\n");
        }
        self.text.push_str(body);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Result of the retry loop for one chapter.
#[derive(Debug)]
pub enum ChapterOutcome {
    Written(String),
    Exhausted {
        attempts: usize,
        last_error: Option<GenerationError>,
    },
}

/// Expands skeletons into prose, one chapter at a time.
///
/// Chapter k is only prompted after chapters 1..k-1 have settled (written or
/// replaced by a placeholder) because its prompt carries their full text.
pub struct ChapterWriter {
    generator: Arc<dyn TextGenerator>,
    max_retries: usize,
}

impl ChapterWriter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub async fn write(&self, brief: &BookBrief, skeletons: &[ChapterSkeleton]) -> Vec<ChapterContent> {
        let mut context = StoryContext::default();
        let mut contents = Vec::with_capacity(skeletons.len());

        for skeleton in skeletons {
            let prompt = chapter_prompt(brief, skeleton, &context);

            let (body, degraded) = match self.attempt(&prompt, skeleton).await {
                ChapterOutcome::Written(text) if text.trim().is_empty() => {
                    (NO_CONTENT.to_string(), false)
                }
                ChapterOutcome::Written(text) => (text, false),
                ChapterOutcome::Exhausted { attempts, last_error } => {
                    tracing::error!(
                        chapter = skeleton.index,
                        attempts,
                        error = ?last_error.map(|e| e.to_string()),
                        "giving up on chapter, inserting placeholder"
                    );
                    (error_placeholder(&skeleton.label), true)
                }
            };

            context.append(&body);
            contents.push(ChapterContent {
                index: skeleton.index,
                label: skeleton.label.clone(),
                body,
                degraded,
            });
        }

        contents
    }

    async fn attempt(&self, prompt: &str, skeleton: &ChapterSkeleton) -> ChapterOutcome {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.generator.generate(prompt).await {
                Ok(text) => {
                    tracing::info!(chapter = skeleton.index, attempt, "chapter written");
                    return ChapterOutcome::Written(text);
                }
                Err(e) => {
                    tracing::warn!(
                        chapter = skeleton.index,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "chapter generation failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        ChapterOutcome::Exhausted {
            attempts: self.max_retries,
            last_error,
        }
    }
}

pub fn chapter_prompt(brief: &BookBrief, skeleton: &ChapterSkeleton, context: &StoryContext) -> String {
    let mut prompt = format!(
        "We are writing an eBook called \"{}\" about {}. Our reader is: {}. \
         Follow this description of the book: {}\n\n\
         We are now writing section {} of the book, {}. Its outline:\n{}\n\n",
        brief.title,
        brief.topic,
        brief.target_audience,
        brief.description,
        skeleton.index,
        skeleton.label,
        skeleton.synopsis,
    );

    if context.is_empty() {
        prompt.push_str("This is the first chapter; nothing has been written yet.\n\n");
    } else {
        prompt.push_str("The previous chapters read:\n");
        prompt.push_str(context.as_str());
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format!(
        "Write at least {} words as cohesive paragraphs, with quantitative facts \
         and statistics where relevant, and avoid inventing facts. ",
        brief.words_per_chapter
    ));
    if let Some(author) = brief.author() {
        prompt.push_str(&format!("Write in the voice of {}. ", author));
    }
    prompt.push_str("Start the chapter with its number and a Markdown heading.");

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{ScriptedGenerator, sample_brief, skeletons};

    fn unavailable() -> GenerationError {
        GenerationError::Status {
            status: 503,
            body: "overloaded".to_string(),
        }
    }

    #[tokio::test]
    async fn test_context_is_exactly_prior_bodies() {
        let generator = Arc::new(ScriptedGenerator::new(|call, _| Ok(format!("body {call}"))));
        let writer = ChapterWriter::new(generator.clone());
        let brief = sample_brief(3);
        let skeletons = skeletons(3);

        let contents = writer.write(&brief, &skeletons).await;

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 3);

        let mut expected = StoryContext::default();
        for (k, skeleton) in skeletons.iter().enumerate() {
            assert_eq!(prompts[k], chapter_prompt(&brief, skeleton, &expected));
            expected.append(&contents[k].body);
        }
        assert!(!prompts[1].contains("body 1"));
        assert!(prompts[2].contains("body 0\n\nbody 1"));
    }

    #[tokio::test]
    async fn test_exhausted_chapter_gets_placeholder_and_next_proceeds() {
        // Chapter 1 fails all three attempts (calls 0..3), chapter 2 succeeds.
        let generator = Arc::new(ScriptedGenerator::new(|call, _| {
            if call < 3 { Err(unavailable()) } else { Ok("second".to_string()) }
        }));
        let writer = ChapterWriter::new(generator.clone());

        let contents = writer.write(&sample_brief(2), &skeletons(2)).await;

        assert_eq!(generator.call_count(), 4);
        assert_eq!(contents[0].body, "Error generating content for Chapter 1.");
        assert!(contents[0].degraded);
        assert_eq!(contents[1].body, "second");
        assert!(!contents[1].degraded);
        assert!(generator.prompts()[3].contains("Error generating content for Chapter 1."));
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_later_attempt() {
        let generator = Arc::new(ScriptedGenerator::new(|call, _| {
            if call == 0 { Err(unavailable()) } else { Ok("recovered".to_string()) }
        }));
        let writer = ChapterWriter::new(generator.clone());

        let contents = writer.write(&sample_brief(1), &skeletons(1)).await;

        assert_eq!(generator.call_count(), 2);
        assert_eq!(contents[0].body, "recovered");
        // Every attempt sends the same prompt.
        let prompts = generator.prompts();
        assert_eq!(prompts[0], prompts[1]);
    }

    #[tokio::test]
    async fn test_retry_bound_is_configurable() {
        let generator = Arc::new(ScriptedGenerator::new(|_, _| Err(unavailable())));
        let writer = ChapterWriter::new(generator.clone()).with_max_retries(5);

        let contents = writer.write(&sample_brief(1), &skeletons(1)).await;

        assert_eq!(generator.call_count(), 5);
        assert!(contents[0].degraded);
    }

    #[tokio::test]
    async fn test_empty_response_is_not_a_failure() {
        let generator = Arc::new(ScriptedGenerator::new(|_, _| Ok("  ".to_string())));
        let writer = ChapterWriter::new(generator.clone());

        let contents = writer.write(&sample_brief(1), &skeletons(1)).await;

        assert_eq!(generator.call_count(), 1);
        assert_eq!(contents[0].body, NO_CONTENT);
        assert!(!contents[0].degraded);
    }

    #[test]
    fn test_prompt_includes_author_only_when_given() {
        let mut brief = sample_brief(1);
        let skeletons = skeletons(1);
        let skeleton = &skeletons[0];
        let ctx = StoryContext::default();
        assert!(!chapter_prompt(&brief, skeleton, &ctx).contains("voice of"));

        brief.author_style = Some("Carl Sagan".to_string());
        let prompt = chapter_prompt(&brief, skeleton, &ctx);
        assert!(prompt.contains("Write in the voice of Carl Sagan."));
        assert!(prompt.contains("at least 500 words"));
        assert!(prompt.contains("Chapter 1"));
    }
}
