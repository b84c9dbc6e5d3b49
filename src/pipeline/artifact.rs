//! Temporary artifacts and the per-run directory that owns them.
//!
//! Every run creates one uniquely named directory (`pdf-assembler-XXXXXX`)
//! under the temp root. Intermediate PDFs live inside it, so two concurrent
//! runs never share a path even though the file names within are fixed.
//!
//! The directory is a [`TempDir`]: it is removed when the workspace is
//! closed, when it is dropped on an error path, and when the pipeline
//! future is dropped on cancellation. Removal failures are logged and never
//! turn a successful run into a failed one.

use crate::error::AssembleError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// What produced an artifact. Declaration order is merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArtifactKind {
    /// The rendered Markdown introduction. Always merged first.
    Markdown,
    /// The pages extracted from the input PDF.
    Extraction,
}

impl ArtifactKind {
    fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Markdown => "markdown.pdf",
            ArtifactKind::Extraction => "extracted.pdf",
        }
    }
}

/// A finished intermediate PDF, owned by its [`ArtifactWorkspace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempArtifact {
    kind: ArtifactKind,
    path: PathBuf,
}

impl TempArtifact {
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Owner of all temporary artifacts of one run.
#[derive(Debug)]
pub struct ArtifactWorkspace {
    dir: Option<TempDir>,
    artifacts: Vec<TempArtifact>,
}

impl ArtifactWorkspace {
    /// Create a fresh, uniquely named workspace under `root`.
    pub fn create(root: &Path) -> Result<Self, AssembleError> {
        std::fs::create_dir_all(root).map_err(|e| {
            AssembleError::Internal(format!("Cannot create temp root '{}': {e}", root.display()))
        })?;
        let dir = tempfile::Builder::new()
            .prefix("pdf-assembler-")
            .tempdir_in(root)
            .map_err(|e| AssembleError::Internal(format!("Cannot create temp workspace: {e}")))?;
        debug!("Artifact workspace: {}", dir.path().display());
        Ok(Self {
            dir: Some(dir),
            artifacts: Vec::new(),
        })
    }

    /// Directory holding the artifacts.
    pub fn path(&self) -> &Path {
        self.dir
            .as_ref()
            .map(TempDir::path)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Path at which an artifact of `kind` should be written.
    ///
    /// Nothing is created; the producing tool must write the file itself, so
    /// its presence afterwards proves the tool did its job.
    pub fn reserve(&self, kind: ArtifactKind) -> PathBuf {
        self.path().join(kind.file_name())
    }

    /// Record that the artifact of `kind` now exists at its reserved path.
    pub fn register(&mut self, kind: ArtifactKind) -> Result<&TempArtifact, AssembleError> {
        let path = self.reserve(kind);
        if !path.is_file() {
            return Err(AssembleError::Internal(format!(
                "Artifact '{}' was registered but does not exist",
                path.display()
            )));
        }
        self.artifacts.retain(|a| a.kind != kind);
        let position = self.artifacts.partition_point(|a| a.kind < kind);
        self.artifacts.insert(position, TempArtifact { kind, path });
        Ok(&self.artifacts[position])
    }

    /// Registered artifacts in merge order (Markdown before Extraction).
    pub fn artifacts(&self) -> &[TempArtifact] {
        &self.artifacts
    }

    /// Delete every artifact now. Failures are logged, not returned.
    pub fn close(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        self.artifacts.clear();
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!("Removed artifact workspace {}", path.display()),
                Err(e) => warn!("Could not remove temp files in {}: {e}", path.display()),
            }
        }
    }
}

impl Drop for ArtifactWorkspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}
