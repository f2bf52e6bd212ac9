// Resource lookup — maps identifiers onto the directory-per-resource storage tree.

pub mod locator;

pub use locator::{LocatedResource, Locator, ResourceId, ResourceLayout};
