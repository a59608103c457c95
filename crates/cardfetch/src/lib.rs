//! Card image retrieval for the menu.
//!
//! [`CardSource`] knows the url of every card, an [`ImageFetcher`] turns urls
//! into bitmaps, and [`FetchQueue`] runs the fetches on a small worker pool
//! and hands results back over a channel.

mod fetcher;
mod queue;
mod source;

use thiserror::Error;

pub use image::RgbaImage;
pub use reqwest::Url;

pub use fetcher::{HttpImageFetcher, ImageFetcher, SyntheticFetcher};
pub use queue::{FetchJob, FetchOutcome, FetchQueue, FetchTarget};
pub use source::CardSource;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to start fetch worker: {0}")]
    Spawn(std::io::Error),
}
