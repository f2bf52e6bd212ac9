// Subprocess-backed converter.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info, warn};

use super::traits::Converter;
use crate::config::{ConverterCommand, GatewayConfig};
use crate::error::ConversionError;

/// Runs `program args... <input> <output>` and waits for it without blocking
/// the runtime. The child inherits the gateway's stdout/stderr.
pub struct ExternalConverter {
    command: ConverterCommand,
    timeout: Duration,
}

impl ExternalConverter {
    pub fn new(command: ConverterCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.converter.clone(), config.conversion_timeout)
    }
}

#[async_trait]
impl Converter for ExternalConverter {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        let started = Instant::now();
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!("converter launch failed program={} err={}", self.command.program, e);
                ConversionError::Launch(e)
            })?;

        info!(
            "converter started pid={:?} input={} output={}",
            child.id(),
            input.display(),
            output.display()
        );

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        let status = match waited {
            Ok(status) => status.map_err(ConversionError::Launch)?,
            Err(_) => {
                warn!(
                    "converter exceeded {:?}, killing pid={:?}",
                    self.timeout,
                    child.id()
                );
                if let Err(e) = child.kill().await {
                    warn!("failed to kill converter: {}", e);
                }
                return Err(ConversionError::TimedOut(self.timeout));
            }
        };

        if status.success() {
            info!("converter finished in {:?}", started.elapsed());
            Ok(())
        } else {
            error!("converter failed status={}", status);
            Err(ConversionError::ExitStatus(status.code()))
        }
    }
}
