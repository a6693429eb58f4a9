//! Load channels.
//!
//! A channel is the in-flight load that produced a document. Security
//! filters read its response headers and request body, and may cancel it.

use crate::headers::HeaderMap;
use crate::request::Request;
use crate::upload::UploadStream;
use http::Method;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// Why a load was cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// The user or embedder aborted the load.
    Aborted,
    /// The XSS filter detected a reflected script and block mode is active.
    XssBlocked,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Aborted => write!(f, "load aborted"),
            CancelReason::XssBlocked => write!(f, "blocked by XSS filter"),
        }
    }
}

/// Channel state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelStatus {
    /// The load is running or finished normally.
    Active,
    /// The load was cancelled.
    Cancelled(CancelReason),
}

impl ChannelStatus {
    /// Check if the load was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChannelStatus::Cancelled(_))
    }
}

/// The network side of a document load.
pub trait HttpChannel: Send + Sync {
    /// The request method.
    fn request_method(&self) -> &Method;

    /// Whether the request was a POST and may carry a form body.
    fn is_post(&self) -> bool {
        self.request_method() == Method::POST
    }

    /// A response header value.
    fn response_header(&self, name: &str) -> Option<String>;

    /// The request body, if the request carried one.
    fn upload_stream(&self) -> Option<Box<dyn UploadStream + '_>>;

    /// Cancel the load. Cancelling an already cancelled load does nothing.
    fn cancel(&self, reason: CancelReason);

    /// Current state of the load.
    fn status(&self) -> ChannelStatus;
}

/// In-memory channel built from a request and its response headers.
pub struct LoadChannel {
    request: Request,
    response_headers: HeaderMap,
    upload: Option<Mutex<Box<dyn UploadStream + Send>>>,
    status: Mutex<ChannelStatus>,
}

impl LoadChannel {
    /// Create a channel. The request body, if any, becomes the upload stream.
    pub fn new(request: Request, response_headers: HeaderMap) -> Self {
        let upload = request.body.clone().map(|body| {
            let stream: Box<dyn UploadStream + Send> = Box::new(Cursor::new(body));
            Mutex::new(stream)
        });

        Self {
            request,
            response_headers,
            upload,
            status: Mutex::new(ChannelStatus::Active),
        }
    }

    /// Replace the upload stream, e.g. with a body spooled to disk.
    pub fn with_upload_stream(mut self, stream: impl UploadStream + Send + 'static) -> Self {
        self.upload = Some(Mutex::new(Box::new(stream)));
        self
    }
}

impl HttpChannel for LoadChannel {
    fn request_method(&self) -> &Method {
        &self.request.method
    }

    fn response_header(&self, name: &str) -> Option<String> {
        self.response_headers.get(name).map(str::to_string)
    }

    fn upload_stream(&self) -> Option<Box<dyn UploadStream + '_>> {
        let guard = self.upload.as_ref()?.lock();
        Some(Box::new(LockedUpload(guard)))
    }

    fn cancel(&self, reason: CancelReason) {
        let mut status = self.status.lock();
        if status.is_cancelled() {
            return;
        }
        tracing::info!("Cancelling load of {}: {}", self.request.url, reason);
        *status = ChannelStatus::Cancelled(reason);
    }

    fn status(&self) -> ChannelStatus {
        *self.status.lock()
    }
}

impl fmt::Debug for LoadChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadChannel")
            .field("request", &self.request)
            .field("response_headers", &self.response_headers)
            .field("has_upload", &self.upload.is_some())
            .field("status", &self.status())
            .finish()
    }
}

/// Upload stream borrowed from a channel for the duration of a read.
struct LockedUpload<'a>(MutexGuard<'a, Box<dyn UploadStream + Send>>);

impl Read for LockedUpload<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Seek for LockedUpload<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }
}

impl UploadStream for LockedUpload<'_> {
    fn available(&mut self) -> io::Result<u64> {
        self.0.available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::rewind;
    use url::Url;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_response_header_lookup() {
        let headers: HeaderMap = [("X-Xss-Protection", "1; mode=block")].into_iter().collect();
        let channel = LoadChannel::new(Request::get(url("https://example.com/")), headers);

        assert_eq!(
            channel.response_header("x-xss-protection").as_deref(),
            Some("1; mode=block")
        );
        assert_eq!(channel.response_header("content-type"), None);
        assert_eq!(channel.request_method(), &Method::GET);
        assert!(!channel.is_post());
    }

    #[test]
    fn test_post_channel() {
        let request = Request::post_form(url("https://example.com/login"), "user=alice");
        let channel = LoadChannel::new(request, HeaderMap::new());

        assert!(channel.is_post());
        assert!(channel.upload_stream().is_some());
    }

    #[test]
    fn test_get_has_no_upload_stream() {
        let channel = LoadChannel::new(Request::get(url("https://example.com/")), HeaderMap::new());
        assert!(channel.upload_stream().is_none());
    }

    #[test]
    fn test_upload_stream_survives_partial_consumption() {
        let request = Request::post_form(url("https://example.com/login"), "user=alice");
        let channel = LoadChannel::new(request, HeaderMap::new());

        {
            let mut stream = channel.upload_stream().unwrap();
            let mut buf = [0u8; 5];
            stream.read_exact(&mut buf).unwrap();
        }

        let mut stream = channel.upload_stream().unwrap();
        assert_eq!(stream.available().unwrap(), 5);
        rewind(&mut stream).unwrap();

        let mut body = String::new();
        stream.read_to_string(&mut body).unwrap();
        assert_eq!(body, "user=alice");
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let channel = LoadChannel::new(Request::get(url("https://example.com/")), HeaderMap::new());
        assert_eq!(channel.status(), ChannelStatus::Active);

        channel.cancel(CancelReason::XssBlocked);
        channel.cancel(CancelReason::Aborted);

        assert_eq!(channel.status(), ChannelStatus::Cancelled(CancelReason::XssBlocked));
    }
}
