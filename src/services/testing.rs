//! Offline doubles for the generation service and the PDF engine.

use crate::models::{BookBrief, ChapterSkeleton, chapter_label};
use crate::services::llm::{GenerationError, TextGenerator};
use crate::services::renderer::{PageOptions, PdfEngine, PdfSession, RenderError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(usize, &str) -> Result<String, GenerationError> + Send + Sync;

/// Answers each call through a closure given the zero-based call number and
/// the prompt, and records every prompt it receives.
pub struct ScriptedGenerator {
    respond: Box<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(usize, &str) -> Result<String, GenerationError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| Ok(text.clone()))
    }

    pub fn failing() -> Self {
        Self::new(|_, _| {
            Err(GenerationError::Status {
                status: 500,
                body: "model crashed".to_string(),
            })
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };
        tokio::task::yield_now().await;
        (self.respond)(call, prompt)
    }
}

#[derive(Default)]
struct EngineLog {
    pages: Vec<PageOptions>,
    html: Vec<String>,
    closed: usize,
}

/// Writes `%PDF-stub` followed by the received HTML to the output path.
#[derive(Default)]
pub struct StubEngine {
    fail_export: bool,
    log: Arc<Mutex<EngineLog>>,
}

impl StubEngine {
    pub fn failing_export() -> Self {
        Self {
            fail_export: true,
            ..Self::default()
        }
    }

    pub fn pages(&self) -> Vec<PageOptions> {
        self.log.lock().unwrap().pages.clone()
    }

    pub fn last_html(&self) -> Option<String> {
        self.log.lock().unwrap().html.last().cloned()
    }

    pub fn closed(&self) -> usize {
        self.log.lock().unwrap().closed
    }
}

#[async_trait]
impl PdfEngine for StubEngine {
    async fn launch(&self, page: &PageOptions, output: &Path) -> Result<Box<dyn PdfSession>, RenderError> {
        self.log.lock().unwrap().pages.push(*page);
        Ok(Box::new(StubSession {
            output: output.to_path_buf(),
            fail_export: self.fail_export,
            log: self.log.clone(),
        }))
    }
}

struct StubSession {
    output: PathBuf,
    fail_export: bool,
    log: Arc<Mutex<EngineLog>>,
}

#[async_trait]
impl PdfSession for StubSession {
    async fn export(&mut self, html: &str) -> Result<(), RenderError> {
        self.log.lock().unwrap().html.push(html.to_string());
        if self.fail_export {
            // Leave a partial file behind, as a crashing engine would.
            let _ = tokio::fs::write(&self.output, b"%PDF-partial").await;
            return Err(RenderError::Export("stub engine refused".to_string()));
        }
        let pdf = format!("%PDF-stub\n{html}");
        tokio::fs::write(&self.output, pdf)
            .await
            .map_err(|e| RenderError::Export(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        self.log.lock().unwrap().closed += 1;
    }
}

pub fn sample_brief(chapters: i64) -> BookBrief {
    BookBrief {
        title: "Rust at Sea".to_string(),
        topic: "systems programming".to_string(),
        chapter_count: chapters,
        words_per_chapter: 500,
        target_audience: "engineers".to_string(),
        author_style: None,
        description: "A practical tour.".to_string(),
    }
}

pub fn skeletons(count: usize) -> Vec<ChapterSkeleton> {
    (1..=count)
        .map(|index| ChapterSkeleton {
            index,
            label: chapter_label(index),
            synopsis: format!("outline for chapter {index}"),
        })
        .collect()
}
