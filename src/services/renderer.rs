use crate::models::{AssembledDocument, RenderedArtifact};
use crate::services::artifacts::ScratchFiles;
use async_trait::async_trait;
use pulldown_cmark::{Options, Parser, html};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to prepare scratch directory {path}: {source}")]
    Scratch {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write markdown: {0}")]
    WriteMarkdown(std::io::Error),

    #[error("failed to read markdown back: {0}")]
    ReadMarkdown(std::io::Error),

    #[error("failed to launch pdf engine: {0}")]
    Launch(String),

    #[error("pdf export failed: {0}")]
    Export(String),

    #[error("failed to read exported pdf: {0}")]
    ReadOutput(std::io::Error),

    #[error("pdf engine produced an empty file")]
    EmptyOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    A4,
}

impl PageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageFormat::A4 => "A4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub top_mm: u32,
    pub right_mm: u32,
    pub bottom_mm: u32,
    pub left_mm: u32,
}

impl Margins {
    pub const fn uniform(mm: u32) -> Self {
        Self {
            top_mm: mm,
            right_mm: mm,
            bottom_mm: mm,
            left_mm: mm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub format: PageFormat,
    pub margins: Margins,
}

/// Every book is printed on A4 with 20mm margins.
pub const BOOK_PAGE: PageOptions = PageOptions {
    format: PageFormat::A4,
    margins: Margins::uniform(20),
};

pub trait MarkdownConverter: Send + Sync {
    fn to_html(&self, markdown: &str) -> String;
}

pub struct CmarkConverter;

impl MarkdownConverter for CmarkConverter {
    fn to_html(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_FOOTNOTES;
        let parser = Parser::new_ext(markdown, options);

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// Something that can start a rendering engine for one export.
#[async_trait]
pub trait PdfEngine: Send + Sync {
    async fn launch(&self, page: &PageOptions, output: &Path) -> Result<Box<dyn PdfSession>, RenderError>;
}

/// A running engine instance. `close` must be called whether or not `export` succeeded.
#[async_trait]
pub trait PdfSession: Send {
    async fn export(&mut self, html: &str) -> Result<(), RenderError>;
    async fn close(self: Box<Self>);
}

/// Renders through a `wkhtmltopdf` child process, HTML on stdin.
pub struct WkhtmltopdfEngine {
    binary: String,
}

impl WkhtmltopdfEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn args(page: &PageOptions, output: &Path) -> Vec<String> {
        let m = page.margins;
        vec![
            "--quiet".to_string(),
            "--encoding".to_string(),
            "utf-8".to_string(),
            "--page-size".to_string(),
            page.format.as_str().to_string(),
            "--margin-top".to_string(),
            format!("{}mm", m.top_mm),
            "--margin-right".to_string(),
            format!("{}mm", m.right_mm),
            "--margin-bottom".to_string(),
            format!("{}mm", m.bottom_mm),
            "--margin-left".to_string(),
            format!("{}mm", m.left_mm),
            "-".to_string(),
            output.display().to_string(),
        ]
    }
}

#[async_trait]
impl PdfEngine for WkhtmltopdfEngine {
    async fn launch(&self, page: &PageOptions, output: &Path) -> Result<Box<dyn PdfSession>, RenderError> {
        let child = Command::new(&self.binary)
            .args(Self::args(page, output))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RenderError::Launch(format!("{}: {e}", self.binary)))?;

        tracing::debug!(engine = %self.binary, pid = ?child.id(), "pdf engine launched");
        Ok(Box::new(WkhtmltopdfSession { child }))
    }
}

struct WkhtmltopdfSession {
    child: Child,
}

#[async_trait]
impl PdfSession for WkhtmltopdfSession {
    async fn export(&mut self, html: &str) -> Result<(), RenderError> {
        let mut stdin = self
            .child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Export("engine stdin already closed".to_string()))?;
        let mut stderr = self.child.stderr.take();

        // Feed stdin and drain stderr together so neither pipe can fill up and stall the engine.
        let feed = async move {
            stdin.write_all(html.as_bytes()).await?;
            stdin.shutdown().await
        };
        let drain = async move {
            let mut buf = String::new();
            if let Some(stderr) = stderr.as_mut() {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        };
        let (fed, diagnostics) = tokio::join!(feed, drain);

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| RenderError::Export(format!("waiting on engine: {e}")))?;

        if !status.success() {
            return Err(RenderError::Export(format!(
                "engine exited with {status}: {}",
                diagnostics.trim()
            )));
        }
        fed.map_err(|e| RenderError::Export(format!("writing html to engine: {e}")))
    }

    async fn close(self: Box<Self>) {
        let mut child = self.child;
        match child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to stop pdf engine");
                }
            }
        }
    }
}

/// Markdown document in, PDF bytes out.
pub struct Renderer {
    converter: Arc<dyn MarkdownConverter>,
    engine: Arc<dyn PdfEngine>,
    page: PageOptions,
}

impl Renderer {
    pub fn new(converter: Arc<dyn MarkdownConverter>, engine: Arc<dyn PdfEngine>) -> Self {
        Self {
            converter,
            engine,
            page: BOOK_PAGE,
        }
    }

    /// Consumes the scratch files; they are gone once this returns, on any path.
    pub async fn render(
        &self,
        title: &str,
        document: &AssembledDocument,
        files: ScratchFiles,
    ) -> Result<RenderedArtifact, RenderError> {
        tokio::fs::write(files.markdown_path(), document.as_str())
            .await
            .map_err(RenderError::WriteMarkdown)?;
        tracing::info!(path = %files.markdown_path().display(), "markdown written");

        let markdown = tokio::fs::read_to_string(files.markdown_path())
            .await
            .map_err(RenderError::ReadMarkdown)?;
        let html = html_page(title, &self.converter.to_html(&markdown));

        let mut session = self.engine.launch(&self.page, files.pdf_path()).await?;
        let exported = session.export(&html).await;
        session.close().await;
        exported?;

        let artifact = files.finish().await?;
        tracing::info!(bytes = artifact.pdf_bytes.len(), "pdf exported");
        Ok(artifact)
    }
}

fn html_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        html_escape::encode_text(title),
        body
    )
}
