// Conversion pipeline: locate, claim the identifier, convert into a staging
// file, then promote the staging file over the output artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::inflight::InFlight;
use super::traits::Converter;
use crate::error::{ConversionError, GatewayError, GatewayResult};
use crate::resource::locator::is_regular_file;
use crate::resource::{Locator, ResourceId};

/// Suffix for converter output that has not been promoted yet.
pub const STAGING_SUFFIX: &str = "partial";

pub struct ConversionService {
    locator: Arc<Locator>,
    converter: Arc<dyn Converter>,
    in_flight: InFlight,
}

impl ConversionService {
    pub fn new(locator: Arc<Locator>, converter: Arc<dyn Converter>) -> Self {
        Self {
            locator,
            converter,
            in_flight: InFlight::new(),
        }
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Convert the input artifact of `id` and return the promoted output path.
    ///
    /// A concurrent call for the same `id` fails with `ConversionInProgress`.
    /// On any failure a previously promoted output is left untouched.
    pub async fn convert(&self, id: &ResourceId) -> GatewayResult<PathBuf> {
        let located = self.locator.locate(id).await?;

        let _guard = self
            .in_flight
            .try_acquire(id.as_str())
            .ok_or_else(|| GatewayError::ConversionInProgress(id.to_string()))?;

        let staging = StagingFile::new(staging_path(&located.output));
        staging.clear().await?;

        debug!(
            "converting id={} input={} staging={}",
            id,
            located.input.display(),
            staging.path.display()
        );
        if let Err(e) = self.produce(&located.input, &staging.path).await {
            staging.discard().await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&staging.path, &located.output).await {
            staging.discard().await;
            return Err(ConversionError::Finalize(e).into());
        }
        staging.settle();

        info!("conversion complete id={} output={}", id, located.output.display());
        Ok(located.output)
    }

    /// Run the converter and check it left a regular file at `staging`.
    async fn produce(&self, input: &Path, staging: &Path) -> GatewayResult<()> {
        self.converter.convert(input, staging).await?;
        if !is_regular_file(staging).await? {
            return Err(ConversionError::MissingOutput.into());
        }
        Ok(())
    }
}

pub fn staging_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(STAGING_SUFFIX);
    output.with_file_name(name)
}

/// Staging output that is removed unless it was promoted.
///
/// Completed runs settle it explicitly; `Drop` only covers a request future
/// that was cancelled mid-conversion.
struct StagingFile {
    path: PathBuf,
    settled: bool,
}

impl StagingFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            settled: false,
        }
    }

    /// Remove leftovers from an interrupted run.
    async fn clear(&self) -> GatewayResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("removed stale staging file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the staging file after a failed run.
    async fn discard(mut self) {
        self.settled = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            log_remove_failure(&self.path, &e);
        }
    }

    /// The staging file was renamed into place.
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // Best-effort; a leftover is cleared by the next run.
        let path = std::mem::take(&mut self.path);
        let remove = move || {
            if let Err(e) = std::fs::remove_file(&path) {
                log_remove_failure(&path, &e);
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(remove);
            }
            Err(_) => remove(),
        }
    }
}

fn log_remove_failure(path: &Path, e: &std::io::Error) {
    if e.kind() != std::io::ErrorKind::NotFound {
        warn!("failed to remove staging file {}: {}", path.display(), e);
    }
}
