// src/fetch/mod.rs
//
// The HTTP collaborator every source goes through. Sources only see the
// `Fetch` trait, so tests drive them with canned responses.

pub mod links;
pub mod save;

use anyhow::{Context, Result};
use reqwest::{Client, Method};
use std::{collections::BTreeMap, future::Future, time::Instant};
use tracing::{debug, info};

pub const USER_AGENT: &str = concat!("charityscraper/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Get,
    Post,
}

/// What to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: FetchMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: FetchMethod::Get,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: FetchMethod::Post,
            ..Self::get(url)
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// What came back. Non-success statuses are data, not errors.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Given a request, return status, headers and body.
pub trait Fetch {
    fn fetch(&self, req: &FetchRequest) -> impl Future<Output = Result<FetchResponse>> + Send;
}

/// `Fetch` over a shared reqwest client. No retries: a transport error
/// surfaces to the caller as-is.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let method = match req.method {
            FetchMethod::Get => Method::GET,
            FetchMethod::Post => Method::POST,
        };
        debug!(%method, url = %req.url, "request");
        let start = Instant::now();

        let mut builder = self.client.request(method, &req.url);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let resp = builder
            .send()
            .await
            .with_context(|| format!("{:?} {} failed", req.method, req.url))?;

        let url = resp.url().to_string();
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect::<BTreeMap<_, _>>();
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("reading body from {}", req.url))?
            .to_vec();

        info!(url = %req.url, status, bytes = body.len(), elapsed = ?start.elapsed(), "fetched");
        Ok(FetchResponse {
            url,
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
pub mod stub {
    //! Canned-response fetcher for source tests.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct StubFetcher {
        routes: BTreeMap<String, FetchResponse>,
        pub seen: Mutex<Vec<FetchRequest>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(mut self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
            self.routes.insert(
                url.to_string(),
                FetchResponse {
                    url: url.to_string(),
                    status,
                    headers: BTreeMap::from([(
                        "last-modified".to_string(),
                        "Tue, 01 Sep 2020 08:00:00 GMT".to_string(),
                    )]),
                    body: body.into(),
                },
            );
            self
        }

        pub fn requests(&self) -> Vec<FetchRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Fetch for StubFetcher {
        async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
            self.seen.lock().unwrap().push(req.clone());
            self.routes
                .get(&req.url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("connection refused: {}", req.url))
        }
    }
}
