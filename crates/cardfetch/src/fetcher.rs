use std::time::Duration;

use image::{Rgba, RgbaImage};
use reqwest::blocking::Client;
use reqwest::Url;
use tracing::debug;

use crate::FetchError;

/// Turns a url into a decoded bitmap.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<RgbaImage, FetchError>;
}

/// Fetches over HTTP(S) and decodes whatever image format comes back.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    http: Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cardmenu/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &Url) -> Result<RgbaImage, FetchError> {
        debug!(%url, "requesting card image");
        let response = self.http.get(url.clone()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes()?;
        let image = image::load_from_memory(&bytes)?;
        Ok(image.to_rgba8())
    }
}

/// Offline stand-in that paints a flat tile per url.
///
/// The colour is derived from the url text, so the same card always gets the
/// same tile.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticFetcher {
    width: u32,
    height: u32,
}

impl SyntheticFetcher {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }
}

impl Default for SyntheticFetcher {
    fn default() -> Self {
        // Same 2.5 : 3.5 aspect as the cards.
        Self::new(50, 70)
    }
}

impl ImageFetcher for SyntheticFetcher {
    fn fetch(&self, url: &Url) -> Result<RgbaImage, FetchError> {
        let hash = fnv1a(url.as_str().as_bytes());
        let fill = Rgba([
            64 + (hash & 0x7f) as u8,
            64 + ((hash >> 8) & 0x7f) as u8,
            64 + ((hash >> 16) & 0x7f) as u8,
            255,
        ]);
        let border = Rgba([240, 240, 240, 255]);
        let (width, height) = (self.width, self.height);
        Ok(RgbaImage::from_fn(width, height, |x, y| {
            if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                border
            } else {
                fill
            }
        }))
    }
}

fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5u32, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(0x0100_0193)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_tiles_are_stable_per_url() {
        let fetcher = SyntheticFetcher::default();
        let a = Url::parse("https://cards.test/?t=1").unwrap();
        let b = Url::parse("https://cards.test/?t=2").unwrap();
        let first = fetcher.fetch(&a).unwrap();
        let again = fetcher.fetch(&a).unwrap();
        let other = fetcher.fetch(&b).unwrap();
        assert_eq!(first.dimensions(), (50, 70));
        assert_eq!(first, again);
        assert_ne!(first.get_pixel(10, 10), other.get_pixel(10, 10));
        assert_eq!(first.get_pixel(0, 0), &Rgba([240, 240, 240, 255]));
    }

    #[test]
    fn unreachable_host_reports_http_error() {
        let fetcher = HttpImageFetcher::new(Duration::from_millis(200)).unwrap();
        let url = Url::parse("http://127.0.0.1:9/?t=1").unwrap();
        assert!(matches!(fetcher.fetch(&url), Err(FetchError::Http(_))));
    }
}
