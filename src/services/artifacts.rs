use crate::models::RenderedArtifact;
use crate::services::renderer::RenderError;
use crate::utils::sanitize_title;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The Markdown/PDF pair a single request renders through.
///
/// Paths are derived from the title alone, so two concurrent requests for the
/// same title share them. Both files are removed when the guard is dropped,
/// whichever way the request ends.
#[derive(Debug)]
pub struct ScratchFiles {
    stem: String,
    markdown_path: PathBuf,
    pdf_path: PathBuf,
}

impl ScratchFiles {
    pub async fn acquire(root: &Path, title: &str) -> Result<Self, RenderError> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|source| RenderError::Scratch {
                path: root.to_path_buf(),
                source,
            })?;

        let stem = sanitize_title(title);
        Ok(Self {
            markdown_path: root.join(format!("{stem}.md")),
            pdf_path: root.join(format!("{stem}.pdf")),
            stem,
        })
    }

    pub fn markdown_path(&self) -> &Path {
        &self.markdown_path
    }

    pub fn pdf_path(&self) -> &Path {
        &self.pdf_path
    }

    /// Name offered to the client for the download.
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.stem)
    }

    /// Read the exported PDF into memory and delete both scratch files.
    ///
    /// This is the normal exit and removes the files without blocking the
    /// runtime. `Drop` only covers error and cancellation paths, where it
    /// falls back to blocking removal.
    pub async fn finish(self) -> Result<RenderedArtifact, RenderError> {
        let read = tokio::fs::read(&self.pdf_path).await;
        remove_quietly_async(&self.markdown_path).await;
        remove_quietly_async(&self.pdf_path).await;
        let markdown_path = self.markdown_path.clone();
        let pdf_path = self.pdf_path.clone();
        drop(self);

        let pdf_bytes = read.map_err(RenderError::ReadOutput)?;
        if pdf_bytes.is_empty() {
            return Err(RenderError::EmptyOutput);
        }

        Ok(RenderedArtifact {
            markdown_path,
            pdf_path,
            pdf_bytes,
        })
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        remove_quietly(&self.markdown_path);
        remove_quietly(&self.pdf_path);
    }
}

fn remove_quietly(path: &Path) {
    log_removal(path, std::fs::remove_file(path));
}

async fn remove_quietly_async(path: &Path) {
    log_removal(path, tokio::fs::remove_file(path).await);
}

fn log_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "removed scratch file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove scratch file"),
    }
}
