//! Reading product images from the media root.

use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

/// An image file read from disk, ready to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadedImage {
    pub file_name: String,
    pub content_type: &'static str,
    pub byte_size: i64,
    pub sha256: String,
}

/// Directory image cells are resolved against.
#[derive(Debug, Clone)]
pub(crate) struct MediaRoot {
    root: PathBuf,
}

impl MediaRoot {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reads `file_name` relative to the media root.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is absolute or climbs out of the root,
    /// has an extension that is not a supported image type, or cannot be
    /// read.
    pub(crate) async fn load(&self, file_name: &str) -> anyhow::Result<LoadedImage> {
        let relative = Path::new(file_name);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            anyhow::bail!("image path {file_name} escapes the media root");
        }

        let content_type = content_type_for(relative)
            .ok_or_else(|| anyhow::anyhow!("unsupported image type: {file_name}"))?;

        let path = self.root.join(relative);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to read image {}: {e}", path.display()))?;

        Ok(LoadedImage {
            file_name: file_name.to_string(),
            content_type,
            byte_size: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
            sha256: format!("{:x}", Sha256::digest(&bytes)),
        })
    }
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}
