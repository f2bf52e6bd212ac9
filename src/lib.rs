//! HTTP gateway for splat resources: serves the viewer SPA, streams `.ksplat`
//! artifacts and runs the external `.ply` → `.ksplat` converter.
//!
//! Storage layout: `<storage_root>/<id>/<id>.ply` in, `<storage_root>/<id>/<id>.ksplat` out.

pub mod config;
pub mod convert;
pub mod error;
pub mod logging;
pub mod resource;
pub mod server;
pub mod stream;

pub use config::GatewayConfig;
pub use error::{ConversionError, GatewayError, GatewayResult};
