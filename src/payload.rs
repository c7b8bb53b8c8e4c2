/// Status code the storage API uses to signal an exhausted transfer quota.
pub const BANDWIDTH_LIMIT_STATUS: u16 = 509;

/// Request or response body, tagged by how it may be rendered in logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        Self::Binary(value.into())
    }

    /// Tags a received body.
    ///
    /// Text only when the media type is textual (or declares a charset) and
    /// the bytes are valid UTF-8; anything else stays binary.
    pub fn from_response(bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        if !content_type.is_some_and(is_textual) {
            return Self::Binary(bytes);
        }
        match String::from_utf8(bytes) {
            Ok(text) => Self::Text(text),
            Err(err) => Self::Binary(err.into_bytes()),
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Self::Binary(value.to_vec())
    }
}

fn is_textual(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    let mime = lowered.split(';').next().unwrap_or_default().trim();
    lowered.contains("charset=")
        || mime.starts_with("text/")
        || mime.ends_with("/json")
        || mime.ends_with("+json")
        || mime.ends_with("/xml")
        || mime.ends_with("+xml")
        || mime == "application/x-www-form-urlencoded"
}

/// How a response should be treated by the caller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseClass {
    Normal,
    /// Status 509 with an empty body.
    RateLimited,
}

/// Status code and body of a completed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Payload,
}

impl Response {
    pub fn class(&self) -> ResponseClass {
        if self.status == BANDWIDTH_LIMIT_STATUS && self.body.is_empty() {
            ResponseClass::RateLimited
        } else {
            ResponseClass::Normal
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
