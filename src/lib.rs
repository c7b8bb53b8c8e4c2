//! `storage-net` is the HTTP transport layer of a cloud-storage API client.
//!
//! It issues requests through a per-call client built from session
//! [`Options`], retries transient failures and reports server-declared fatal
//! conditions as [`ServerError`]:
//! - [`NetClient::get_content`]
//! - [`NetClient::post`]
//! - [`survive`] / [`NetClient::survive`]

mod client;
mod error;
mod options;
mod payload;
mod retry;
mod transport;

pub mod trace;

pub use client::NetClient;
pub use error::{Classify, NetError, ServerError, Verdict};
pub use options::{OptionValue, Options, HTTP_PREFIX};
pub use payload::{Payload, Response, ResponseClass, BANDWIDTH_LIMIT_STATUS};
pub use retry::survive;
pub use transport::{ClientHandle, Target, TransportConfig};

pub type Result<T> = std::result::Result<T, NetError>;
