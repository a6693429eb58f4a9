//! Networking layer for the browser.
//!
//! This crate provides the pieces of a page load that the security filters
//! inspect:
//! - Response and request headers
//! - The request that produced a document (method, URL, body)
//! - The load channel, which can be cancelled with a reason
//! - Rewindable upload streams for request bodies

pub mod headers;
pub mod request;
pub mod upload;
pub mod channel;

pub use headers::HeaderMap;
pub use request::Request;
pub use upload::UploadStream;
pub use channel::{CancelReason, ChannelStatus, HttpChannel, LoadChannel};
