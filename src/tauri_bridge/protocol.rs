//! Custom protocol handler for camera frames
//!
//! Implements the `arframe://` scheme so the page can pull the latest
//! encoded frame as a binary body instead of Base64 inside the per-tick
//! JSON.
//!
//! Supported resources (host-style, query string ignored):
//! - `arframe://frame?<cache-buster>`: latest JPEG, or 204 before the first frame
//! - `arframe://metadata`: `{"width":..,"height":..,"available":..}`

use tauri::http::{
    header::{
        HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE,
    },
    Request, Response as HttpResponse, StatusCode, Uri,
};
use tracing::{debug, trace};

use super::shared_state::{EncodedFrame, FrameCache};
use crate::config::FRAME_SCHEME;
use crate::error::ResourceError;

type Response = HttpResponse<Vec<u8>>;

/// Resources served by the frame scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameResource {
    Frame,
    Metadata,
}

impl FrameResource {
    /// Resolve the resource named by `uri`
    ///
    /// The resource is the host (`arframe://frame`). Platforms that rewrite
    /// custom schemes to `http://arframe.localhost/frame` carry it in the
    /// first path segment instead.
    pub fn from_uri(uri: &Uri) -> Result<Self, ResourceError> {
        let host = uri.host().unwrap_or_default();
        let scheme_host = format!("{FRAME_SCHEME}.localhost");
        let name = if host.is_empty() || host == "localhost" || host == scheme_host {
            uri.path().split('/').find(|segment| !segment.is_empty())
        } else {
            Some(host)
        };

        match name {
            Some("frame") => Ok(Self::Frame),
            Some("metadata") => Ok(Self::Metadata),
            Some(other) => Err(ResourceError::Unsupported(other.to_string())),
            None => Err(ResourceError::MissingResource),
        }
    }
}

/// Answers frame scheme requests from the shared [`FrameCache`]
#[derive(Clone)]
pub struct FrameResourceServer {
    cache: FrameCache,
}

impl FrameResourceServer {
    pub fn new(cache: FrameCache) -> Self {
        Self { cache }
    }

    /// Handle a scheme request, rendering protocol errors as plain-text responses
    pub fn respond(&self, request: &Request<Vec<u8>>) -> Response {
        trace!(uri = %request.uri(), "frame protocol request");
        match self.handle(request.uri()) {
            Ok(response) => response,
            Err(e) => {
                debug!(uri = %request.uri(), error = %e, "frame protocol request rejected");
                error_response(&e)
            }
        }
    }

    pub fn handle(&self, uri: &Uri) -> Result<Response, ResourceError> {
        match FrameResource::from_uri(uri)? {
            FrameResource::Frame => Ok(self.frame()),
            FrameResource::Metadata => self.metadata(),
        }
    }

    fn frame(&self) -> Response {
        match self.cache.read().into_frame() {
            Some(frame) => {
                let body = frame.data().to_vec();
                response(StatusCode::OK, EncodedFrame::CONTENT_TYPE, body)
            }
            None => response(StatusCode::NO_CONTENT, EncodedFrame::CONTENT_TYPE, Vec::new()),
        }
    }

    fn metadata(&self) -> Result<Response, ResourceError> {
        let json = serde_json::to_vec(&self.cache.metadata())?;
        Ok(response(StatusCode::OK, "application/json", json))
    }
}

fn response(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Response {
    let content_length = body.len();
    let mut response = HttpResponse::new(body);
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn error_response(error: &ResourceError) -> Response {
    let status = match error {
        ResourceError::MissingResource => StatusCode::BAD_REQUEST,
        ResourceError::Unsupported(_) => StatusCode::NOT_FOUND,
        ResourceError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    response(status, "text/plain", error.to_string().into_bytes())
}
