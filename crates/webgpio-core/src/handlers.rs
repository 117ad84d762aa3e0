//! Framework-agnostic request handlers.
//!
//! These functions contain the logic of every control route. Framework-specific
//! code (axum on Linux, esp-idf-http on the device) wraps them and translates
//! [`Response`] into its own response type.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::actuator::{self, Level, SharedActuator};
use crate::error::ServeError;
use crate::routes::{Handler, StaticResource};

/// Status, optional content type and body of a handler result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type),
            body,
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            content_type: None,
            body: Vec::new(),
        }
    }

    pub fn server_error() -> Self {
        Self {
            status: 500,
            content_type: None,
            body: Vec::new(),
        }
    }
}

/// Everything a handler may touch.
///
/// Handlers keep no state between calls; each call reads from the mounted
/// filesystem or writes the actuator and returns.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// Root the flash filesystem is mounted at.
    pub assets_root: PathBuf,
    pub actuator: SharedActuator,
}

/// Run the handler of a matched route.
pub fn handle(handler: &Handler, ctx: &HandlerContext) -> Response {
    match handler {
        Handler::Static(resource) => serve_static(&ctx.assets_root, resource),
        Handler::Actuator(level) => drive_actuator(&ctx.actuator, *level),
    }
}

/// Serve a flash asset in full, or 500 when it cannot be buffered.
pub fn serve_static(root: &Path, resource: &StaticResource) -> Response {
    respond(resource, read_resource(root, resource))
}

fn respond(resource: &StaticResource, result: Result<Vec<u8>, ServeError>) -> Response {
    match result {
        Ok(body) => Response::ok(resource.content_type, body),
        Err(e) => {
            error!("{}", e);
            Response::server_error()
        }
    }
}

/// Read a resource into memory.
///
/// The file is sized up front and read into a buffer reserved for exactly
/// that size plus one byte, so the final read that detects end of file never reallocates.
/// Whatever was read is returned, even if the file turned out shorter than
/// its measured size. The file handle is closed on every path.
pub fn read_resource(root: &Path, resource: &StaticResource) -> Result<Vec<u8>, ServeError> {
    let path = resolve(root, resource.path);

    let mut file = File::open(&path).map_err(|source| ServeError::ResourceUnavailable {
        path: path.clone(),
        source,
    })?;
    let size = file
        .metadata()
        .map_err(|source| ServeError::ResourceUnavailable {
            path: path.clone(),
            source,
        })?
        .len();

    read_measured(file, size, &path)
}

/// Buffer up to `size` bytes from `reader`.
///
/// A reader that ends early or fails part-way yields the bytes read so far.
fn read_measured(reader: impl Read, size: u64, path: &Path) -> Result<Vec<u8>, ServeError> {
    let mut buffer = Vec::new();
    let capacity = usize::try_from(size)
        .ok()
        .and_then(|size| size.checked_add(1))
        .ok_or_else(|| ServeError::AllocationFailed {
            path: path.to_path_buf(),
            size,
        })?;
    buffer
        .try_reserve_exact(capacity)
        .map_err(|_| ServeError::AllocationFailed {
            path: path.to_path_buf(),
            size,
        })?;

    if let Err(e) = reader.take(size).read_to_end(&mut buffer) {
        warn!(
            "Read of {} stopped after {} of {} bytes: {}",
            path.display(),
            buffer.len(),
            size,
            e
        );
    } else if (buffer.len() as u64) < size {
        warn!(
            "Short read of {}: {} of {} bytes",
            path.display(),
            buffer.len(),
            size
        );
    }

    Ok(buffer)
}

/// Set the actuator and answer 204 No Content.
pub fn drive_actuator(actuator: &SharedActuator, level: Level) -> Response {
    actuator::lock(actuator).set(level);
    info!("Actuator {} by web request", level);
    Response::no_content()
}

fn resolve(root: &Path, resource_path: &str) -> PathBuf {
    root.join(resource_path.trim_start_matches('/'))
}
