use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};

/// Read size for streamed file bodies (1 MiB).
pub const STREAM_CHUNK_BYTES: usize = 1024 * 1024;

/// Default listen host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8090;

/// The front-end dev server, the only origin allowed by CORS unless overridden.
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// Upper bound on a single converter run.
pub const DEFAULT_CONVERSION_TIMEOUT_SECS: u64 = 600;

/// Upper bound on opening a file for streaming.
pub const DEFAULT_FILE_OPEN_TIMEOUT_SECS: u64 = 10;

/// Extension of the converter input inside each resource directory.
pub const INPUT_EXT: &str = "ply";

/// Extension of the converter output inside each resource directory.
pub const OUTPUT_EXT: &str = "ksplat";

/// External converter invocation: `program args... <input> <output>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ConverterCommand {
    /// Split a whitespace-separated command line into program and leading args.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    fn default_script() -> Self {
        let script = Path::new(env!("CARGO_MANIFEST_DIR")).join("create-ksplat.js");
        Self {
            program: "node".to_string(),
            args: vec![script.to_string_lossy().into_owned()],
        }
    }
}

/// Immutable gateway configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Front-end bundle directory; holds `index.html` and `assets/`.
    pub frontend_dist: PathBuf,
    /// Canonical storage root holding one directory per resource.
    pub storage_root: PathBuf,
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub converter: ConverterCommand,
    pub conversion_timeout: Duration,
    pub file_open_timeout: Duration,
}

impl GatewayConfig {
    /// Load `.env` (if present) and build the config from the process environment.
    pub fn from_env() -> GatewayResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    ///
    /// Fails when `SPLAT_STORAGE_DIR` is unset or missing on disk, when the
    /// front-end bundle directory does not exist, when a numeric option
    /// does not parse, or when a timeout is zero.
    pub fn from_lookup<F>(lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let frontend_dist = get("FRONTEND_DIST").map(PathBuf::from).unwrap_or_else(|| {
            Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("..")
                .join("scantrix-ui-web")
                .join("dist")
        });
        if !frontend_dist.is_dir() {
            return Err(GatewayError::Config(format!(
                "could not find frontend dist folder at {}",
                frontend_dist.display()
            )));
        }

        let storage_root = get("SPLAT_STORAGE_DIR")
            .ok_or_else(|| GatewayError::Config("SPLAT_STORAGE_DIR is not set".to_string()))?;
        let storage_root = std::fs::canonicalize(&storage_root).map_err(|e| {
            GatewayError::Config(format!("storage root {} unusable: {}", storage_root, e))
        })?;
        if !storage_root.is_dir() {
            return Err(GatewayError::Config(format!(
                "storage root {} is not a directory",
                storage_root.display()
            )));
        }

        let converter = match get("KSPLAT_CONVERTER") {
            Some(line) => ConverterCommand::parse(&line)
                .ok_or_else(|| GatewayError::Config("KSPLAT_CONVERTER is empty".to_string()))?,
            None => ConverterCommand::default_script(),
        };

        Ok(Self {
            frontend_dist,
            storage_root,
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            converter,
            conversion_timeout: parse_secs(
                "CONVERSION_TIMEOUT_SECS",
                get("CONVERSION_TIMEOUT_SECS"),
                DEFAULT_CONVERSION_TIMEOUT_SECS,
            )?,
            file_open_timeout: parse_secs(
                "FILE_OPEN_TIMEOUT_SECS",
                get("FILE_OPEN_TIMEOUT_SECS"),
                DEFAULT_FILE_OPEN_TIMEOUT_SECS,
            )?,
        })
    }

    /// Socket address to bind, from `host` and `port`.
    pub fn listen_addr(&self) -> GatewayResult<SocketAddr> {
        let ip = self
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|e| GatewayError::Config(format!("invalid HOST {:?}: {}", self.host, e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// The SPA shell document.
    pub fn index_html(&self) -> PathBuf {
        self.frontend_dist.join("index.html")
    }

    /// Root for `/assets/*` requests.
    pub fn assets_dir(&self) -> PathBuf {
        self.frontend_dist.join("assets")
    }
}

/// A timeout in whole seconds. Zero is rejected.
fn parse_secs(key: &str, value: Option<String>, default: u64) -> GatewayResult<Duration> {
    let secs = parse_or(key, value, default)?;
    if secs == 0 {
        return Err(GatewayError::Config(format!("{} must be at least 1", key)));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> GatewayResult<T>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| GatewayError::Config(format!("invalid {} {:?}: {}", key, v, e))),
        None => Ok(default),
    }
}
