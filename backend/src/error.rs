use reqwest::StatusCode;
use thiserror::Error;

use crate::polyline::PolylineError;

/// Failure while talking to one of the external services.
///
/// Never leaves a client boundary: every public client method degrades it to
/// an empty or `None` result after logging.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} answered with status {status}")]
    Status {
        service: &'static str,
        status: StatusCode,
    },
    #[error("{service} returned an unreadable payload: {reason}")]
    Payload {
        service: &'static str,
        reason: String,
    },
    #[error("route geometry could not be decoded: {0}")]
    Geometry(#[from] PolylineError),
    #[error("no {0} endpoint configured")]
    NoEndpoint(&'static str),
}

impl ServiceError {
    pub(crate) fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ServiceError::Transport { service, source }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("GPX output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
