//! In-memory transport for tests. Records every request it receives.

use crate::http::error::FetchError;
use crate::http::transport::{HttpRequest, HttpResponse, Transport};
use reqwest::header::{HeaderMap, HeaderValue, LOCATION};
use reqwest::StatusCode;
use std::cell::RefCell;
use std::rc::Rc;

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, FetchError>>;

/// Shared view of the requests a [ScriptedTransport] has seen.
#[derive(Clone, Default)]
pub(crate) struct RequestLog(Rc<RefCell<Vec<HttpRequest>>>);

impl RequestLog {
    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.0.borrow().clone()
    }

    pub(crate) fn count(&self) -> usize {
        self.0.borrow().len()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.0.borrow().iter().map(|r| r.url.clone()).collect()
    }
}

pub(crate) struct ScriptedTransport {
    handler: Handler,
    log: RequestLog,
}

impl ScriptedTransport {
    pub(crate) fn new(
        handler: impl Fn(&HttpRequest) -> Result<HttpResponse, FetchError> + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            log: RequestLog::default(),
        }
    }

    pub(crate) fn log(&self) -> RequestLog {
        self.log.clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        self.log.0.borrow_mut().push(request.clone());
        (self.handler)(request)
    }
}

pub(crate) fn ok_response(url: &str, body: &[u8]) -> HttpResponse {
    HttpResponse {
        url: url.to_string(),
        status: StatusCode::OK,
        headers: HeaderMap::new(),
        body: body.to_vec(),
    }
}

pub(crate) fn status_response(url: &str, status: u16) -> HttpResponse {
    let mut response = ok_response(url, b"error page");
    response.status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response
}

pub(crate) fn redirect_response(url: &str, location: &str) -> HttpResponse {
    let mut response = status_response(url, 302);
    response.body.clear();
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers.insert(LOCATION, value);
    }
    response
}

pub(crate) fn io_failure(url: &str) -> FetchError {
    FetchError::Io {
        url: url.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
    }
}
