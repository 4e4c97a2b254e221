//! Authenticated JSON transport to one search domain.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::es_url;

const BODY_SAMPLE_LIMIT: usize = 500;

/// Basic-auth credentials for the domain.
#[derive(Clone)]
pub struct Credentials {
    pub user: Arc<str>,
    pub pass: Arc<str>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// Which response codes count as a usable answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accept {
    Success,
    SuccessOrMissing,
}

impl Accept {
    fn allows(self, status: StatusCode) -> bool {
        match self {
            Accept::Success => status.is_success(),
            Accept::SuccessOrMissing => status.is_success() || status == StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Clone)]
pub struct EsHttp {
    client: Client,
    base_url: Arc<str>,
    credentials: Credentials,
}

impl EsHttp {
    pub fn new(
        base_url: impl Into<Arc<str>>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build domain http client")?;
        Ok(Self {
            client,
            base_url: es_url::normalize_base_url(base_url),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let Credentials { user, pass } = &self.credentials;
        self.client
            .request(method, self.url(path))
            .basic_auth(&**user, Some(&**pass))
    }

    async fn dispatch(&self, req: RequestBuilder, context: &'static str, accept: Accept) -> Result<Response> {
        let resp = req.send().await.context(context)?;
        let status = resp.status();
        if accept.allows(status) {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(status_error(context, status, &body))
    }

    /// Any 2xx is accepted; the body is left unread.
    pub async fn send_ok(&self, req: RequestBuilder, context: &'static str) -> Result<Response> {
        self.dispatch(req, context, Accept::Success).await
    }

    /// Decode a 2xx body; 404 becomes `None`.
    pub async fn send_optional<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        context: &'static str,
    ) -> Result<Option<T>> {
        let resp = self.dispatch(req, context, Accept::SuccessOrMissing).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        resp.json().await.map(Some).context(context)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, context: &'static str) -> Result<T> {
        let resp = self.send_ok(self.request(Method::GET, path), context).await?;
        resp.json().await.context(context)
    }

    pub async fn post_value(&self, path: &str, body: &Value, context: &'static str) -> Result<Value> {
        self.write_value(Method::POST, path, body, context).await
    }

    pub async fn put_value(&self, path: &str, body: &Value, context: &'static str) -> Result<Value> {
        self.write_value(Method::PUT, path, body, context).await
    }

    async fn write_value(
        &self,
        method: Method,
        path: &str,
        body: &Value,
        context: &'static str,
    ) -> Result<Value> {
        let req = self.request(method, path).json(body);
        let resp = self.send_ok(req, context).await?;
        resp.json().await.context(context)
    }

    /// Deleting something already gone is fine.
    pub async fn delete_allow_404(&self, path: &str, context: &'static str) -> Result<()> {
        self.dispatch(self.request(Method::DELETE, path), context, Accept::SuccessOrMissing)
            .await?;
        Ok(())
    }
}

fn status_error(context: &str, status: StatusCode, body: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "{} status={} body_sample={}",
        context,
        status,
        body_sample(body, BODY_SAMPLE_LIMIT)
    )
}

fn body_sample(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
