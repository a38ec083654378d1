//! Tile server access
//!
//! [`AsyncHttpClient`] is the seam between the fetcher and the network;
//! [`AsyncReqwestClient`] is the production implementation. [`UrlTemplate`]
//! turns a tile coordinate into the request URL.
//!
//! ```ignore
//! use tilefetch::provider::{AsyncReqwestClient, UrlTemplate};
//!
//! let client = AsyncReqwestClient::new()?;
//! let template = UrlTemplate::new("https://tile.openstreetmap.org/{z}/{x}/{y}.png");
//! ```

mod http;
mod template;
mod types;

pub use http::{AsyncHttpClient, AsyncReqwestClient};
pub use template::{has_tile_placeholders, substitute, UrlTemplate};
pub use types::{HttpResponse, ProviderError};

#[cfg(test)]
pub use http::tests::{MockAsyncHttpClient, RoutedMockClient, Scripted};
