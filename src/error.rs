/// Conditions the remote server declares fatal for the request as sent.
///
/// Retrying the same request unchanged cannot resolve these, so the retry
/// executor hands them straight back to the caller.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ServerError {
    /// Rate-limit signal: status 509 with an empty body.
    #[error("bandwidth limit exceeded")]
    BandwidthLimitExceeded,
}

/// Error type returned by this crate.
///
/// Only [`NetError::Server`] is fatal; every other variant is transient.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Fatal condition signaled by the server.
    #[error("server error: {0}")]
    Server(#[from] ServerError),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The request URL could not be used to address a host.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Local I/O failure while assembling the transport (e.g. reading a CA file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetError {
    /// Returns the fatal server condition, if this is one.
    pub fn server_error(&self) -> Option<ServerError> {
        match self {
            Self::Server(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Outcome of classifying a failed attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Spend retry budget and run the operation again.
    Retry,
    /// Propagate immediately.
    Fatal,
}

/// Classification hook used by [`crate::survive`].
///
/// Implement it for your own error type to drive the retry executor with
/// operations that do not return [`NetError`].
pub trait Classify: std::fmt::Display {
    fn verdict(&self) -> Verdict;

    /// Short label written into retry log lines.
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl Classify for NetError {
    fn verdict(&self) -> Verdict {
        match self {
            Self::Server(_) => Verdict::Fatal,
            _ => Verdict::Retry,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Server(ServerError::BandwidthLimitExceeded) => "BandwidthLimitExceeded",
            Self::Transport(_) => "Transport",
            Self::InvalidUrl { .. } => "InvalidUrl",
            Self::Io(_) => "Io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Classify, NetError, ServerError, Verdict};

    #[test]
    fn only_server_errors_are_fatal() {
        let fatal = NetError::from(ServerError::BandwidthLimitExceeded);
        assert_eq!(fatal.verdict(), Verdict::Fatal);
        assert_eq!(fatal.server_error(), Some(ServerError::BandwidthLimitExceeded));

        let io = NetError::from(std::io::Error::other("disk gone"));
        assert_eq!(io.verdict(), Verdict::Retry);
        assert_eq!(io.server_error(), None);

        let url = NetError::InvalidUrl {
            url: "nope".to_owned(),
            reason: "relative URL without a base".to_owned(),
        };
        assert_eq!(url.verdict(), Verdict::Retry);
        assert_eq!(url.kind(), "InvalidUrl");
    }

    #[test]
    fn display_keeps_underlying_message() {
        let err = NetError::from(std::io::Error::other("disk gone"));
        assert_eq!(err.to_string(), "io error: disk gone");
        assert_eq!(
            NetError::from(ServerError::BandwidthLimitExceeded).to_string(),
            "server error: bandwidth limit exceeded"
        );
    }
}
