use crate::models::{BookBrief, BriefError, GeneratedBook};
use crate::services::artifacts::ScratchFiles;
use crate::services::assembler::assemble;
use crate::services::llm::TextGenerator;
use crate::services::planner::ChapterPlanner;
use crate::services::renderer::{RenderError, Renderer};
use crate::services::writer::ChapterWriter;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid brief: {0}")]
    Validation(#[from] BriefError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Runs one brief through planning, writing, assembly and rendering.
pub struct Pipeline {
    planner: ChapterPlanner,
    writer: ChapterWriter,
    renderer: Renderer,
    output_dir: PathBuf,
}

impl Pipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        renderer: Renderer,
        output_dir: impl Into<PathBuf>,
        max_retries: usize,
    ) -> Self {
        Self {
            planner: ChapterPlanner::new(generator.clone()),
            writer: ChapterWriter::new(generator).with_max_retries(max_retries),
            renderer,
            output_dir: output_dir.into(),
        }
    }

    pub async fn run(&self, brief: BookBrief) -> Result<GeneratedBook, PipelineError> {
        let span = tracing::info_span!(
            "book",
            request_id = %uuid::Uuid::new_v4(),
            title = %brief.title,
            chapters = brief.chapter_count,
        );
        self.run_stages(brief).instrument(span).await
    }

    async fn run_stages(&self, brief: BookBrief) -> Result<GeneratedBook, PipelineError> {
        brief.validate()?;

        let skeletons = self.planner.plan(&brief).await;
        tracing::info!(count = skeletons.len(), "chapters planned");

        let contents = self.writer.write(&brief, &skeletons).await;
        let degraded_chapters = contents.iter().filter(|c| c.degraded).count();
        if degraded_chapters > 0 {
            tracing::warn!(degraded_chapters, "book contains placeholder chapters");
        }

        let document = assemble(&contents);
        tracing::info!(sections = document.sections, chars = document.text.len(), "document assembled");

        let files = ScratchFiles::acquire(&self.output_dir, &brief.title).await?;
        let file_name = files.file_name();
        let artifact = self
            .renderer
            .render(&brief.title, &document, files)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "rendering failed"))?;
        tracing::debug!(
            markdown = %artifact.markdown_path.display(),
            pdf = %artifact.pdf_path.display(),
            "scratch files released"
        );

        Ok(GeneratedBook {
            file_name,
            pdf: artifact.pdf_bytes,
            degraded_chapters,
        })
    }
}
