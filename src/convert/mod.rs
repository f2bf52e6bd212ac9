// Conversion — runs the external ply-to-ksplat converter and promotes its output.

pub mod external;
pub mod inflight;
pub mod service;
pub mod traits;

pub use external::ExternalConverter;
pub use inflight::{InFlight, InFlightGuard};
pub use service::ConversionService;
pub use traits::Converter;
