use std::collections::BTreeMap;
use std::time::Duration;

use serde::{de::Error as _, Deserialize, Deserializer};

/// Prefix marking options that are forwarded to the transport client.
pub const HTTP_PREFIX: &str = "http_";

/// Session configuration shared by every request.
///
/// Built once per client session and never mutated afterwards. Besides the
/// named fields, any number of `http_<setting>` entries may be present; they
/// are applied to the transport client by name (see
/// [`crate::TransportConfig`]). Unknown settings and falsy values are
/// skipped.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Constant pause between attempts. Deserialized from seconds.
    #[serde(deserialize_with = "deserialize_seconds")]
    pub retry_interval: Duration,
    /// Explicit proxy; when set, environment proxies are ignored.
    pub http_proxy_address: Option<String>,
    /// Remaining named options, keyed by their full name.
    #[serde(flatten)]
    pub extra: BTreeMap<String, OptionValue>,
}

impl Default for Options {
    fn default() -> Self {
        let mut extra = BTreeMap::new();
        extra.insert("http_open_timeout".to_owned(), OptionValue::Int(180));
        extra.insert("http_read_timeout".to_owned(), OptionValue::Int(180));
        Self {
            max_retries: 10,
            retry_interval: Duration::from_secs(3),
            http_proxy_address: None,
            extra,
        }
    }
}

impl Options {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_proxy_address(mut self, address: impl Into<String>) -> Self {
        self.http_proxy_address = Some(address.into());
        self
    }

    /// Sets (or replaces) a named option such as `http_read_timeout`.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Removes a named option, e.g. to drop one of the default timeouts.
    pub fn without_option(mut self, name: &str) -> Self {
        self.extra.remove(name);
        self
    }

    /// Iterates the `http_*` options that carry a value, with the prefix
    /// stripped. Falsy values are filtered out here.
    pub fn http_settings(&self) -> impl Iterator<Item = (&str, OptionValue)> + '_ {
        let proxy = self
            .http_proxy_address
            .as_ref()
            .map(|address| ("proxy_address", OptionValue::Text(address.clone())));

        let extra = self.extra.iter().filter_map(|(name, value)| {
            let setting = name.strip_prefix(HTTP_PREFIX)?;
            // The typed field wins over a duplicate map entry.
            if setting == "proxy_address" {
                return None;
            }
            Some((setting, value.clone()))
        });

        proxy
            .into_iter()
            .chain(extra)
            .filter(|(_, value)| value.is_set())
    }
}

/// Loosely typed option value, as found in configuration sources.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    /// `false` for `Null` and `Bool(false)`; such options are not applied.
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Null | Self::Bool(false))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Interprets numbers as seconds.
    pub fn as_seconds(&self) -> Option<Duration> {
        match self {
            Self::Int(value) => u64::try_from(*value).ok().map(Duration::from_secs),
            Self::Float(value) => Duration::try_from_secs_f64(*value).ok(),
            _ => None,
        }
    }

    pub fn as_port(&self) -> Option<u16> {
        match self {
            Self::Int(value) => u16::try_from(*value).ok(),
            Self::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u16> for OptionValue {
    fn from(value: u16) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Duration> for OptionValue {
    fn from(value: Duration) -> Self {
        Self::Float(value.as_secs_f64())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl<T: Into<OptionValue>> From<Option<T>> for OptionValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

fn deserialize_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Whole(u64),
        Fractional(f64),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Whole(secs) => Ok(Duration::from_secs(secs)),
        Seconds::Fractional(secs) => Duration::try_from_secs_f64(secs).map_err(D::Error::custom),
    }
}
