use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const CURRENT_VERSION: u32 = 1;
pub const DEFAULT_CARD_HOST: &str = "https://card-preview.exokit.org";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MenuConfig {
    pub version: u32,
    pub timing: Timing,
    pub grid: Grid,
    pub fetch: Fetch,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            timing: Timing::default(),
            grid: Grid::default(),
            fetch: Fetch::default(),
        }
    }
}

/// Clock and curve parameters shared by the panel wipe and the card fly-in.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Timing {
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub period: Duration,
    pub stagger: f32,
    pub drop_offset: f32,
    pub easing: EasingSetting,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(2000),
            stagger: 0.02,
            drop_offset: 0.1,
            easing: EasingSetting::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Grid {
    pub rows: u32,
    pub cols: u32,
    pub card_width: f32,
    /// Width:height ratio of a card, e.g. `[2.5, 3.5]` for a trading card.
    pub card_aspect: [f32; 2],
    pub buffer_factor: f32,
    pub corner_radius: f32,
    pub inner_factor: f32,
}

impl Grid {
    pub fn card_height(&self) -> f32 {
        self.card_width / self.card_aspect[0] * self.card_aspect[1]
    }

    pub fn card_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            rows: 6,
            cols: 4,
            card_width: 0.063,
            card_aspect: [2.5, 3.5],
            buffer_factor: 1.1,
            corner_radius: 0.0025,
            inner_factor: 0.99,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Fetch {
    pub host: String,
    pub width: u32,
    pub format: String,
    pub card_back: Option<String>,
    pub concurrency: usize,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,
}

impl Default for Fetch {
    fn default() -> Self {
        Self {
            host: DEFAULT_CARD_HOST.to_string(),
            width: 1024,
            format: "png".to_string(),
            card_back: None,
            concurrency: 6,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum EasingSetting {
    Linear,
    Smoothstep,
    EaseInOut,
    CubicBezier([f32; 4]),
}

impl Default for EasingSetting {
    fn default() -> Self {
        Self::CubicBezier([0.0, 1.0, 0.0, 1.0])
    }
}

impl fmt::Display for EasingSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EasingSetting::Linear => f.write_str("linear"),
            EasingSetting::Smoothstep => f.write_str("smoothstep"),
            EasingSetting::EaseInOut => f.write_str("ease-in-out"),
            EasingSetting::CubicBezier([x1, y1, x2, y2]) => {
                write!(f, "cubic-bezier({x1}, {y1}, {x2}, {y2})")
            }
        }
    }
}

impl FromStr for EasingSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "linear" => return Ok(Self::Linear),
            "smoothstep" => return Ok(Self::Smoothstep),
            "ease-in-out" | "easeinout" | "ease_in_out" => return Ok(Self::EaseInOut),
            _ => {}
        }

        let Some(args) = normalized
            .strip_prefix("cubic-bezier(")
            .and_then(|rest| rest.strip_suffix(')'))
        else {
            return Err(format!(
                "invalid easing '{raw}'; expected linear, smoothstep, ease-in-out, or cubic-bezier(x1, y1, x2, y2)"
            ));
        };

        let values = args
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f32>()
                    .map_err(|_| format!("invalid cubic-bezier control value '{}'", part.trim()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let points: [f32; 4] = values
            .try_into()
            .map_err(|_| "cubic-bezier requires exactly four control values".to_string())?;
        Ok(Self::CubicBezier(points))
    }
}

impl TryFrom<String> for EasingSetting {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EasingSetting> for String {
    fn from(value: EasingSetting) -> Self {
        value.to_string()
    }
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl MenuConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: MenuConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `path` when it exists, otherwise falls back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CURRENT_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CURRENT_VERSION}",
                self.version
            )));
        }

        let timing = &self.timing;
        if timing.period.is_zero() {
            return Err(ConfigError::Invalid(
                "timing.period must be greater than zero".into(),
            ));
        }
        if !(timing.stagger >= 0.0 && timing.stagger.is_finite()) {
            return Err(ConfigError::Invalid("timing.stagger must be >= 0".into()));
        }
        if !timing.drop_offset.is_finite() {
            return Err(ConfigError::Invalid(
                "timing.drop_offset must be finite".into(),
            ));
        }
        if let EasingSetting::CubicBezier([x1, y1, x2, y2]) = timing.easing {
            if !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
                return Err(ConfigError::Invalid(format!(
                    "cubic-bezier x control values must lie in [0, 1]; got {x1} and {x2}"
                )));
            }
            if !(y1.is_finite() && y2.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "cubic-bezier y control values must be finite; got {y1} and {y2}"
                )));
            }
        }

        let grid = &self.grid;
        if grid.rows == 0 || grid.cols == 0 {
            return Err(ConfigError::Invalid(
                "grid.rows and grid.cols must be greater than zero".into(),
            ));
        }
        if !(grid.card_width > 0.0 && grid.card_width.is_finite()) {
            return Err(ConfigError::Invalid(
                "grid.card_width must be greater than zero".into(),
            ));
        }
        if !grid
            .card_aspect
            .iter()
            .all(|value| *value > 0.0 && value.is_finite())
        {
            return Err(ConfigError::Invalid(
                "grid.card_aspect values must be finite and greater than zero".into(),
            ));
        }
        if !(grid.buffer_factor > 1.0 && grid.buffer_factor.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "grid.buffer_factor must be greater than 1; got {}",
                grid.buffer_factor
            )));
        }
        if !(grid.corner_radius >= 0.0 && grid.corner_radius.is_finite()) {
            return Err(ConfigError::Invalid(
                "grid.corner_radius must be finite and non-negative".into(),
            ));
        }
        if !(grid.inner_factor > 0.0 && grid.inner_factor < 1.0) {
            return Err(ConfigError::Invalid(
                "grid.inner_factor must lie strictly between 0 and 1".into(),
            ));
        }

        let fetch = &self.fetch;
        if fetch.host.trim().is_empty() {
            return Err(ConfigError::Invalid("fetch.host must not be empty".into()));
        }
        if fetch.width == 0 {
            return Err(ConfigError::Invalid(
                "fetch.width must be greater than zero".into(),
            ));
        }
        if fetch.format.trim().is_empty() {
            return Err(ConfigError::Invalid("fetch.format must not be empty".into()));
        }
        if fetch.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "fetch.concurrency must be at least 1".into(),
            ));
        }
        if fetch.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "fetch.timeout must be greater than zero".into(),
            ));
        }
        if let Some(back) = &fetch.card_back {
            if back.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "fetch.card_back must not be empty when present".into(),
                ));
            }
        }

        Ok(())
    }
}
