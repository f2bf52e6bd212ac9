use std::path::Path;

use async_trait::async_trait;

use crate::error::ConversionError;

/// Produces `output` from `input`. Implementations must not touch any other path.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError>;
}
