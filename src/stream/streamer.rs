// File streaming with Content-Length / Range framing.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::range::ParsedRange;
use crate::config::STREAM_CHUNK_BYTES;
use crate::error::{GatewayError, GatewayResult};

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Response metadata that does not depend on the file itself.
#[derive(Debug, Clone)]
pub struct Framing {
    pub content_type: &'static str,
    /// Suggested filename for `Content-Disposition: attachment`.
    pub attachment: Option<String>,
}

impl Framing {
    /// Generated artifact: generic binary, saved under `filename`.
    pub fn download(filename: impl Into<String>) -> Self {
        Self {
            content_type: OCTET_STREAM,
            attachment: Some(filename.into()),
        }
    }

    /// Bundle file: typed by extension, displayed inline.
    pub fn inline(path: &Path) -> Self {
        Self {
            content_type: content_type_for(path),
            attachment: None,
        }
    }
}

/// An open regular file ready to be streamed.
///
/// The handle moves into the response body and is closed when the body is
/// dropped, whether the transfer finished or the client went away.
#[derive(Debug)]
pub struct AssetFile {
    file: File,
    len: u64,
    path: PathBuf,
}

/// Open `path` for streaming. Missing paths and non-regular files are `NotFound`.
pub async fn open_asset(path: &Path, open_timeout: Duration) -> GatewayResult<AssetFile> {
    let not_found = || {
        GatewayError::NotFound(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string()),
        )
    };

    let file = match tokio::time::timeout(open_timeout, File::open(path)).await {
        Ok(Ok(file)) => file,
        Ok(Err(e)) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Err(not_found());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            warn!("open timed out after {:?} path={}", open_timeout, path.display());
            return Err(GatewayError::OpenTimedOut(path.to_path_buf()));
        }
    };

    let meta = file.metadata().await?;
    if !meta.is_file() {
        return Err(not_found());
    }

    Ok(AssetFile {
        file,
        len: meta.len(),
        path: path.to_path_buf(),
    })
}

impl AssetFile {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Build the streaming response, honouring a single byte range if given.
    pub async fn respond(
        mut self,
        range: Option<ParsedRange>,
        framing: &Framing,
    ) -> GatewayResult<Response> {
        let total = self.len;
        let (start, end, is_partial) = match range {
            Some(range) => {
                let (start, end) = range
                    .resolve(total)
                    .ok_or(GatewayError::RangeNotSatisfiable { total })?;
                (start, end, true)
            }
            None => (0, total, false),
        };

        if start > 0 {
            self.file.seek(SeekFrom::Start(start)).await?;
        }

        debug!(
            "streaming path={} range=[{}, {}) partial={}",
            self.path.display(),
            start,
            end,
            is_partial
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(framing.content_type),
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(end - start));
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

        if is_partial {
            // Content-Range: bytes start-end/total (end is inclusive in HTTP).
            let content_range = format!("bytes {}-{}/{}", start, end - 1, total);
            if let Ok(value) = HeaderValue::from_str(&content_range) {
                headers.insert(header::CONTENT_RANGE, value);
            }
        }

        if let Some(name) = &framing.attachment {
            let disposition = format!("attachment; filename=\"{}\"", quote_filename(name));
            match HeaderValue::from_str(&disposition) {
                Ok(value) => {
                    headers.insert(header::CONTENT_DISPOSITION, value);
                }
                Err(_) => warn!("skipping unrepresentable filename {:?}", name),
            }
        }

        let status = if is_partial {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        };

        let reader = self.file.take(end - start);
        let body = Body::from_stream(ReaderStream::with_capacity(reader, STREAM_CHUNK_BYTES));

        Ok((status, headers, body).into_response())
    }
}

fn quote_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' { '\'' } else { c })
        .collect()
}

/// Content type for bundle files, keyed on extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") | Some("map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => OCTET_STREAM,
    }
}
