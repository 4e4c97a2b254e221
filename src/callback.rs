//! Outcome envelope for the deployment orchestrator and its delivery.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::execution::ExecutionLog;
use crate::request::CustomResourceEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
}

impl Status {
    pub fn from_verdict(succeeded: bool) -> Self {
        if succeeded {
            Status::Success
        } else {
            Status::Failed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackEnvelope {
    pub status: Status,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: Value,
}

impl CallbackEnvelope {
    pub fn new(
        event: &CustomResourceEvent,
        status: Status,
        reason: String,
        physical_resource_id: String,
        log: &ExecutionLog,
    ) -> Self {
        Self {
            status,
            reason,
            physical_resource_id,
            stack_id: event.stack_id.clone().unwrap_or_default(),
            request_id: event.request_id.clone().unwrap_or_default(),
            logical_resource_id: event.logical_resource_id.clone().unwrap_or_default(),
            no_echo: false,
            data: log.to_data(),
        }
    }
}

pub fn log_pointer(log_stream_name: &str) -> String {
    format!("See the details in CloudWatch Log Stream: {log_stream_name}")
}

#[derive(Clone)]
pub struct CallbackReporter {
    client: Client,
}

impl CallbackReporter {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build callback client")?;
        Ok(Self { client })
    }

    /// PUT the envelope to the presigned `response_url`.
    ///
    /// The receiver requires an empty content type and an exact content length.
    pub async fn send(&self, response_url: &str, envelope: &CallbackEnvelope) -> Result<StatusCode> {
        let body = serde_json::to_string(envelope).context("serialize callback body")?;
        info!("callback: response body {}", body);
        let resp = self
            .client
            .put(response_url)
            .header(CONTENT_TYPE, "")
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await
            .context("callback put")?;
        let status = resp.status();
        info!("callback: status code {}", status);
        Ok(status)
    }
}
