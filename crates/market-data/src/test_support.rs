//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::{HttpRequest, HttpResponse, HttpTransport, TransportError};

type Reply = Result<HttpResponse, TransportError>;

struct Route {
    url_suffix: String,
    query: Option<(String, String)>,
    replies: VecDeque<Reply>,
}

impl Route {
    fn matches(&self, request: &HttpRequest) -> bool {
        request.url.ends_with(&self.url_suffix)
            && self
                .query
                .as_ref()
                .map_or(true, |(k, v)| request.query_param(k) == Some(v.as_str()))
    }

    /// Replies are consumed in order; the last one repeats forever.
    fn next_reply(&mut self) -> Reply {
        if self.replies.len() > 1 {
            self.replies.pop_front().unwrap()
        } else {
            self.replies.front().cloned().unwrap()
        }
    }
}

/// Routes requests by URL suffix (and optionally one query parameter).
/// Unrouted requests get a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, url_suffix: &str, replies: Vec<Reply>) -> Self {
        self.push(url_suffix, None, replies)
    }

    pub fn on_query(self, url_suffix: &str, key: &str, value: &str, replies: Vec<Reply>) -> Self {
        self.push(url_suffix, Some((key.to_string(), value.to_string())), replies)
    }

    fn push(self, url_suffix: &str, query: Option<(String, String)>, replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty());
        self.routes.lock().unwrap().push(Route {
            url_suffix: url_suffix.to_string(),
            query,
            replies: replies.into(),
        });
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn ok(body: &str) -> Reply {
    Ok(HttpResponse::ok(body))
}

pub fn status(code: u16) -> Reply {
    Ok(HttpResponse::new(code, ""))
}

pub fn refused() -> Reply {
    Err(TransportError {
        message: "connection refused".to_string(),
        timed_out: false,
    })
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(request.clone());

        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|route| route.matches(request)) {
            Some(route) => route.next_reply(),
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}
