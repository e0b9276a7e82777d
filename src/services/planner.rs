use crate::models::{BookBrief, ChapterSkeleton, chapter_label};
use crate::services::llm::TextGenerator;
use std::sync::Arc;

pub const NO_DESCRIPTION: &str = "No description available";
pub const PLANNING_FAILED: &str = "Error generating content.";

// The chapter count comes straight from the request; never size buffers by it.
const PREALLOCATE_LIMIT: usize = 64;

/// Asks the generator for a short outline of every chapter, one call each.
pub struct ChapterPlanner {
    generator: Arc<dyn TextGenerator>,
}

impl ChapterPlanner {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Always returns `brief.chapters()` skeletons in index order. A failed
    /// call leaves a placeholder synopsis for that chapter and is not retried.
    pub async fn plan(&self, brief: &BookBrief) -> Vec<ChapterSkeleton> {
        let mut skeletons = Vec::with_capacity(brief.chapters().min(PREALLOCATE_LIMIT));

        for index in 1..=brief.chapters() {
            let prompt = outline_prompt(brief, index);

            let synopsis = match self.generator.generate(&prompt).await {
                Ok(text) if text.trim().is_empty() => NO_DESCRIPTION.to_string(),
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(chapter = index, error = %e, "chapter outline generation failed");
                    PLANNING_FAILED.to_string()
                }
            };

            skeletons.push(ChapterSkeleton {
                index,
                label: chapter_label(index),
                synopsis,
            });
        }

        skeletons
    }
}

pub fn outline_prompt(brief: &BookBrief, index: usize) -> String {
    format!(
        "We are planning an eBook titled \"{}\" about {}. Its readers are {}. \
         Write a title and a short overview for chapter {} that names its focus \
         and the key points it will cover.",
        brief.title, brief.topic, brief.target_audience, index
    )
}
