use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::{redirect, Certificate, Proxy, RequestBuilder, Url};

use crate::{NetError, OptionValue, Options, Result};

/// Destination of a single request, parsed once per call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    url: Url,
    host: String,
    port: u16,
}

impl Target {
    /// Parses an absolute `http`/`https` URL.
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = |reason: &str| NetError::InvalidUrl {
            url: url.to_owned(),
            reason: reason.to_owned(),
        };

        let parsed = Url::parse(url).map_err(|err| invalid(&err.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("unsupported scheme"));
        }
        let host = parsed.host_str().ok_or_else(|| invalid("missing host"))?.to_owned();
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port"))?;

        Ok(Self {
            url: parsed,
            host,
            port,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path plus query string, e.g. `/cs?id=1`.
    pub fn request_uri(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{query}", self.url.path()),
            None => self.url.path().to_owned(),
        }
    }

    pub fn is_tls(&self) -> bool {
        self.scheme() == "https"
    }
}

type ApplySetting = fn(&mut TransportConfig, &OptionValue);

/// Recognized `http_*` settings, prefix stripped.
const SETTINGS: &[(&str, ApplySetting)] = &[
    ("proxy_address", set_proxy_address),
    ("proxy_port", set_proxy_port),
    ("proxy_user", set_proxy_user),
    ("proxy_pass", set_proxy_pass),
    ("open_timeout", set_open_timeout),
    ("read_timeout", set_read_timeout),
    ("keep_alive_timeout", set_keep_alive_timeout),
    ("verify_mode", set_verify_mode),
    ("ca_file", set_ca_file),
];

/// Connection settings for one request, assembled from [`Options`].
///
/// A fresh config (and client) is built for every call; nothing here is
/// cached between requests.
#[derive(Clone, PartialEq)]
pub struct TransportConfig {
    target: Target,
    use_ssl: bool,
    proxy_from_env: bool,
    proxy_address: Option<String>,
    proxy_port: Option<u16>,
    proxy_user: Option<String>,
    proxy_pass: Option<String>,
    open_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    keep_alive_timeout: Option<Duration>,
    verify_peer: bool,
    ca_file: Option<PathBuf>,
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("target", &self.target.url().as_str())
            .field("use_ssl", &self.use_ssl)
            .field("proxy_from_env", &self.proxy_from_env)
            .field("proxy_address", &self.proxy_address)
            .field("proxy_port", &self.proxy_port)
            .field("proxy_user", &self.proxy_user)
            .field("proxy_pass", &self.proxy_pass.as_ref().map(|_| "<redacted>"))
            .field("open_timeout", &self.open_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("keep_alive_timeout", &self.keep_alive_timeout)
            .field("verify_peer", &self.verify_peer)
            .field("ca_file", &self.ca_file)
            .finish()
    }
}

impl TransportConfig {
    /// Plain config for `target`: TLS when the scheme asks for it, ambient
    /// proxy settings honoured.
    pub fn new(target: Target) -> Self {
        Self {
            use_ssl: target.is_tls(),
            target,
            proxy_from_env: true,
            proxy_address: None,
            proxy_port: None,
            proxy_user: None,
            proxy_pass: None,
            open_timeout: None,
            read_timeout: None,
            keep_alive_timeout: None,
            verify_peer: true,
            ca_file: None,
        }
    }

    /// Applies every set `http_*` option. An explicit proxy turns off
    /// environment proxies before anything else is applied.
    pub fn from_options(target: Target, options: &Options) -> Self {
        let mut config = Self::new(target);
        if options.http_proxy_address.is_some() {
            config.proxy_from_env = false;
        }
        for (name, value) in options.http_settings() {
            config.apply(name, &value);
        }
        config
    }

    /// Parses `url` and builds a client handle scoped to it.
    pub fn build(url: &str, options: &Options) -> Result<ClientHandle> {
        let target = Target::parse(url)?;
        Self::from_options(target, options).into_client()
    }

    /// Applies a single setting by name (without the `http_` prefix).
    ///
    /// Returns `false` for unknown names and falsy values; neither is an
    /// error.
    pub fn apply(&mut self, name: &str, value: &OptionValue) -> bool {
        if !value.is_set() {
            return false;
        }
        match SETTINGS.iter().find(|(setting, _)| *setting == name) {
            Some((_, apply)) => {
                apply(self, value);
                true
            }
            None => false,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn use_ssl(&self) -> bool {
        self.use_ssl
    }

    pub fn proxy_from_env(&self) -> bool {
        self.proxy_from_env
    }

    pub fn open_timeout(&self) -> Option<Duration> {
        self.open_timeout
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn keep_alive_timeout(&self) -> Option<Duration> {
        self.keep_alive_timeout
    }

    pub fn verify_peer(&self) -> bool {
        self.verify_peer
    }

    /// Explicit proxy as a URL, `http://` assumed when no scheme is given.
    pub fn proxy_url(&self) -> Option<String> {
        let address = self.proxy_address.as_deref()?;
        let raw = if address.contains("://") {
            address.to_owned()
        } else {
            format!("http://{address}")
        };

        let Ok(mut url) = Url::parse(&raw) else {
            return Some(raw);
        };
        if let (None, Some(port)) = (url.port(), self.proxy_port) {
            if url.set_port(Some(port)).is_err() {
                return Some(raw);
            }
        }
        Some(url.into())
    }

    /// Builds the `reqwest` client for this request.
    pub fn into_client(self) -> Result<ClientHandle> {
        // One request per call: redirects are handed back to the caller.
        let mut builder = reqwest::Client::builder().redirect(redirect::Policy::none());

        if !self.proxy_from_env {
            builder = builder.no_proxy();
        }
        if let Some(proxy_url) = self.proxy_url() {
            let mut proxy = Proxy::all(proxy_url.as_str())?;
            if let Some(user) = &self.proxy_user {
                proxy = proxy.basic_auth(user, self.proxy_pass.as_deref().unwrap_or_default());
            }
            builder = builder.proxy(proxy);
        }
        if self.use_ssl {
            builder = builder.https_only(true);
        }
        if let Some(timeout) = self.open_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = self.read_timeout {
            builder = builder.read_timeout(timeout);
        }
        if let Some(timeout) = self.keep_alive_timeout {
            builder = builder.pool_idle_timeout(timeout);
        }
        if !self.verify_peer {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(path) = &self.ca_file {
            let pem = std::fs::read(path)?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        }

        Ok(ClientHandle {
            http: builder.build()?,
            target: self.target,
        })
    }
}

fn set_proxy_address(config: &mut TransportConfig, value: &OptionValue) {
    if let Some(address) = value.as_text() {
        config.proxy_address = Some(address.to_owned());
    }
}

fn set_proxy_port(config: &mut TransportConfig, value: &OptionValue) {
    if let Some(port) = value.as_port() {
        config.proxy_port = Some(port);
    }
}

fn set_proxy_user(config: &mut TransportConfig, value: &OptionValue) {
    if let Some(user) = value.as_text() {
        config.proxy_user = Some(user.to_owned());
    }
}

fn set_proxy_pass(config: &mut TransportConfig, value: &OptionValue) {
    if let Some(pass) = value.as_text() {
        config.proxy_pass = Some(pass.to_owned());
    }
}

fn set_open_timeout(config: &mut TransportConfig, value: &OptionValue) {
    if let Some(timeout) = value.as_seconds() {
        config.open_timeout = Some(timeout);
    }
}

fn set_read_timeout(config: &mut TransportConfig, value: &OptionValue) {
    if let Some(timeout) = value.as_seconds() {
        config.read_timeout = Some(timeout);
    }
}

fn set_keep_alive_timeout(config: &mut TransportConfig, value: &OptionValue) {
    if let Some(timeout) = value.as_seconds() {
        config.keep_alive_timeout = Some(timeout);
    }
}

// Accepts the symbolic names as well as the numeric OpenSSL-style modes.
fn set_verify_mode(config: &mut TransportConfig, value: &OptionValue) {
    match value {
        OptionValue::Int(0) => config.verify_peer = false,
        OptionValue::Int(_) => config.verify_peer = true,
        OptionValue::Text(mode) if mode.eq_ignore_ascii_case("none") => {
            config.verify_peer = false;
        }
        OptionValue::Text(mode) if mode.eq_ignore_ascii_case("peer") => {
            config.verify_peer = true;
        }
        _ => {}
    }
}

fn set_ca_file(config: &mut TransportConfig, value: &OptionValue) {
    if let Some(path) = value.as_text() {
        config.ca_file = Some(PathBuf::from(path));
    }
}

/// Configured client scoped to one request's destination.
#[derive(Clone, Debug)]
pub struct ClientHandle {
    http: reqwest::Client,
    target: Target,
}

impl ClientHandle {
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn get(&self) -> RequestBuilder {
        self.http.get(self.target.url().clone())
    }

    pub fn post(&self) -> RequestBuilder {
        self.http.post(self.target.url().clone())
    }
}
