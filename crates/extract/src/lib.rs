// ABOUTME: Main library entry point for the readlater content extraction pipeline.
// ABOUTME: Re-exports the public API: Client, ClientBuilder, ExtractionResult, ExtractError, ErrorCode, Options.

//! readlater-extract - turns an article URL into a clean, plain-text document.
//!
//! Hosts known to render their content with JavaScript (WeChat official
//! account articles, Zhihu) are tried in a headless browser first; everything
//! else, and every browser failure, goes through a static fetch and a
//! readability-style parse. Output that looks like an anti-bot page or is too
//! thin is swapped for a placeholder derived from the URL.
//!
//! # Example
//!
//! ```no_run
//! use readlater_extract::{Client, ExtractError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ExtractError> {
//!     let client = Client::builder().max_browsers(1).build();
//!     let result = client.extract("https://example.com/article").await?;
//!     println!("{}", result.format_markdown());
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod client;
pub mod error;
pub mod fallback;
pub mod image;
pub mod normalize;
pub mod options;
pub mod proxy;
pub mod quality;
pub mod readability;
pub mod resource;
pub mod result;
pub mod site;
pub mod strategy;

pub use crate::browser::{ChromeRenderer, PageRenderer, RenderedPage};
pub use crate::client::Client;
pub use crate::error::{ErrorCode, ExtractError};
pub use crate::image::rewrite_image_url;
pub use crate::options::{BrowserOptions, ClientBuilder, Options};
pub use crate::proxy::{ImageProxy, ProxiedImage, ProxyError};
pub use crate::quality::is_low_quality;
pub use crate::result::ExtractionResult;
pub use crate::site::SiteProfile;
