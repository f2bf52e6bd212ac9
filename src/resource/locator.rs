// Identifier validation and per-resource path resolution.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{INPUT_EXT, OUTPUT_EXT};
use crate::error::{GatewayError, GatewayResult};

/// Longest identifier accepted; matches the usual filename limit.
const MAX_ID_BYTES: usize = 255;

/// Validated resource identifier. Always a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    /// Reject anything that could escape the storage root or name more than
    /// one path component.
    pub fn parse(raw: &str) -> GatewayResult<Self> {
        let invalid = raw.is_empty()
            || raw == "."
            || raw == ".."
            || raw.len() > MAX_ID_BYTES
            || raw
                .chars()
                .any(|c| c == '/' || c == '\\' || c == '\0' || std::path::is_separator(c));
        if invalid {
            return Err(GatewayError::InvalidIdentifier(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input and output extensions used inside each resource directory.
#[derive(Debug, Clone)]
pub struct ResourceLayout {
    pub input_ext: String,
    pub output_ext: String,
}

impl Default for ResourceLayout {
    fn default() -> Self {
        Self {
            input_ext: INPUT_EXT.to_string(),
            output_ext: OUTPUT_EXT.to_string(),
        }
    }
}

impl ResourceLayout {
    pub fn input_name(&self, id: &ResourceId) -> String {
        format!("{}.{}", id, self.input_ext)
    }

    pub fn output_name(&self, id: &ResourceId) -> String {
        format!("{}.{}", id, self.output_ext)
    }
}

/// Paths for one resource that passed every existence check.
#[derive(Debug, Clone)]
pub struct LocatedResource {
    pub dir: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

pub struct Locator {
    storage_root: PathBuf,
    layout: ResourceLayout,
}

impl Locator {
    /// Create a locator over `storage_root`, which is canonicalized here so
    /// containment checks compare like with like.
    pub fn new(storage_root: impl AsRef<Path>, layout: ResourceLayout) -> GatewayResult<Self> {
        let root = storage_root.as_ref();
        let storage_root = std::fs::canonicalize(root).map_err(|e| {
            GatewayError::Config(format!("storage root {} unusable: {}", root.display(), e))
        })?;
        Ok(Self {
            storage_root,
            layout,
        })
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn layout(&self) -> &ResourceLayout {
        &self.layout
    }

    /// Resolve the directory, input and output paths for a conversion.
    pub async fn locate(&self, id: &ResourceId) -> GatewayResult<LocatedResource> {
        let dir = self.resource_dir(id).await?;

        let input_name = self.layout.input_name(id);
        let input = dir.join(&input_name);
        if !is_regular_file(&input).await? {
            debug!("input missing id={} path={}", id, input.display());
            return Err(GatewayError::InputNotFound {
                id: id.to_string(),
                file: input_name,
            });
        }

        let output = dir.join(self.layout.output_name(id));
        Ok(LocatedResource { dir, input, output })
    }

    /// Resolve the generated output artifact for download.
    pub async fn artifact(&self, id: &ResourceId) -> GatewayResult<PathBuf> {
        let dir = self.resource_dir(id).await?;
        let output = dir.join(self.layout.output_name(id));
        if !is_regular_file(&output).await? {
            return Err(GatewayError::ArtifactNotFound(id.to_string()));
        }
        Ok(output)
    }

    async fn resource_dir(&self, id: &ResourceId) -> GatewayResult<PathBuf> {
        let joined = self.storage_root.join(id.as_str());
        let resolved = match tokio::fs::canonicalize(&joined).await {
            Ok(path) => path,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GatewayError::DirectoryNotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        // Symlinked directories must still land inside the root.
        if resolved == self.storage_root || !resolved.starts_with(&self.storage_root) {
            warn!(
                "resource dir escapes storage root id={} resolved={}",
                id,
                resolved.display()
            );
            return Err(GatewayError::InvalidIdentifier(id.to_string()));
        }

        let meta = tokio::fs::metadata(&resolved).await?;
        if !meta.is_dir() {
            return Err(GatewayError::DirectoryNotFound(id.to_string()));
        }
        Ok(resolved)
    }
}

/// `Ok(false)` for missing paths and non-files; other IO errors propagate.
pub(crate) async fn is_regular_file(path: &Path) -> GatewayResult<bool> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
