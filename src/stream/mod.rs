// Asset streaming — regular files out over HTTP with range support.

pub mod range;
pub mod streamer;

pub use range::{parse_range_header, ParsedRange};
pub use streamer::{open_asset, AssetFile, Framing};
