//! WMS request/response interception.
//!
//! - [`Parameters`], [`RequestContext`], [`ResponseBuffer`]: what the host
//!   hands to the filter hooks
//! - [`negotiate_format`]: request-time `image/tiff` → `image/png` rewrite
//! - [`patch_capabilities`]: adds the `image/tiff` format to capabilities
//! - [`GeoTiffFilter`]: ties both together behind the [`ServerFilter`] hooks

mod capabilities;
mod context;
mod filter;
mod negotiate;
mod params;

pub use capabilities::{patch_capabilities, XML_DECLARATION};
pub use context::{PendingConversion, RequestContext, ResponseBuffer};
pub use filter::{FilterFlow, GeoTiffFilter, ServerFilter};
pub use negotiate::negotiate_format;
pub use params::Parameters;
