use reqwest::Url;

use crate::FetchError;

/// Where card preview images live.
///
/// Card ids are 1-based on the server: grid index 0 is requested as `t=1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSource {
    host: Url,
    width: u32,
    format: String,
    card_back: Option<Url>,
}

impl CardSource {
    pub fn new(host: &str, width: u32, format: impl Into<String>) -> Result<Self, FetchError> {
        let host = parse_url(host)?;
        if host.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl {
                url: host.to_string(),
                reason: "card host must be a base url".into(),
            });
        }
        Ok(Self {
            host,
            width,
            format: format.into(),
            card_back: None,
        })
    }

    pub fn with_card_back(mut self, url: &str) -> Result<Self, FetchError> {
        self.card_back = Some(parse_url(url)?);
        Ok(self)
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn card_back(&self) -> Option<&Url> {
        self.card_back.as_ref()
    }

    /// Preview url for the card at grid `index`.
    pub fn url_for(&self, index: usize) -> Url {
        let mut url = self.host.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("t", &(index + 1).to_string())
            .append_pair("w", &self.width.to_string())
            .append_pair("ext", &self.format);
        url
    }
}

fn parse_url(raw: &str) -> Result<Url, FetchError> {
    Url::parse(raw.trim()).map_err(|err| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })
}
