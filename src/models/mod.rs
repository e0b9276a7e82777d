use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// The brief a book is generated from, as posted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookBrief {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub topic: String,
    #[serde(rename = "chapters", default, deserialize_with = "null_as_zero")]
    pub chapter_count: i64,
    #[serde(rename = "num_words", default, deserialize_with = "null_as_zero")]
    pub words_per_chapter: i64,
    #[serde(default)]
    pub target_audience: String,
    #[serde(rename = "author", default)]
    pub author_style: Option<String>,
    #[serde(rename = "book_description", default)]
    pub description: String,
}

// A blank number field in the form arrives as `null`; let validation reject it.
fn null_as_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BriefError {
    #[error("book title must not be empty")]
    EmptyTitle,

    #[error("chapter count must be positive, got {0}")]
    InvalidChapterCount(i64),

    #[error("words per chapter must be positive, got {0}")]
    InvalidWordsPerChapter(i64),
}

impl BookBrief {
    pub fn validate(&self) -> Result<(), BriefError> {
        if self.title.trim().is_empty() {
            return Err(BriefError::EmptyTitle);
        }
        if self.chapter_count <= 0 {
            return Err(BriefError::InvalidChapterCount(self.chapter_count));
        }
        if self.words_per_chapter <= 0 {
            return Err(BriefError::InvalidWordsPerChapter(self.words_per_chapter));
        }
        Ok(())
    }

    /// Number of chapters to produce. Zero for briefs that fail validation.
    pub fn chapters(&self) -> usize {
        usize::try_from(self.chapter_count).unwrap_or(0)
    }

    /// Author voice to imitate, if the client gave a non-blank one.
    pub fn author(&self) -> Option<&str> {
        self.author_style
            .as_deref()
            .map(str::trim)
            .filter(|style| !style.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSkeleton {
    pub index: usize,
    pub label: String,
    pub synopsis: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterContent {
    pub index: usize,
    pub label: String,
    pub body: String,
    /// Set when every attempt failed and `body` is the error placeholder.
    pub degraded: bool,
}

pub fn chapter_label(index: usize) -> String {
    format!("Chapter {}", index)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    pub text: String,
    pub sections: usize,
}

impl AssembledDocument {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Output of a render. The paths are already deleted by the time this is handed out.
#[derive(Debug)]
pub struct RenderedArtifact {
    pub markdown_path: PathBuf,
    pub pdf_path: PathBuf,
    pub pdf_bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct GeneratedBook {
    pub file_name: String,
    pub pdf: Vec<u8>,
    pub degraded_chapters: usize,
}
