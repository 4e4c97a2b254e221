//! Collaborator seam between the reconciliation logic and the search domain.
//!
//! Everything the probe, remap engine, and alert reconcilers need from the
//! domain goes through [`SearchApi`]. [`crate::domain::DomainClient`] is the
//! HTTP implementation.

use async_trait::async_trait;
use anyhow::Result;
use serde_json::{Map, Value};

use crate::types::{Lookup, MonitorSpec};

#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Names of every index on the domain.
    async fn list_indices(&self) -> Result<Vec<String>>;

    /// Document count of `index` under the `_cat` column projection `filter`.
    /// `None` when the index does not exist or reports no count.
    async fn document_count(&self, index: &str, filter: &str) -> Result<Option<u64>>;

    async fn create_index(&self, index: &str, mappings: &Map<String, Value>) -> Result<()>;

    /// Start a server-side copy. Returns once the copy is accepted, not finished.
    async fn reindex(&self, source: &str, dest: &str) -> Result<()>;

    async fn delete_index(&self, index: &str) -> Result<()>;

    async fn delete_documents(&self, index: &str, range: &Value) -> Result<()>;

    async fn get_index_pattern(&self, id: &str, title: &str) -> Lookup;

    async fn set_index_pattern(&self, id: &str, title: &str, overwrite: bool) -> Result<()>;

    async fn get_dashboard(&self, title: &str) -> Lookup;

    /// Create a dashboard, or overwrite `existing_id` when given.
    async fn set_dashboard(&self, title: &str, existing_id: Option<&str>) -> Result<()>;

    async fn get_alert_destination(&self, name: &str) -> Lookup;

    /// Create an SNS destination, or update `existing_id` in place when given.
    async fn set_alert_destination(
        &self,
        name: &str,
        topic_arn: &str,
        role_arn: &str,
        existing_id: Option<&str>,
    ) -> Result<()>;

    async fn get_monitor(&self, name: &str) -> Lookup;

    /// Create a monitor, or update `existing_id` when given.
    async fn set_monitor(&self, monitor: &MonitorSpec, existing_id: Option<&str>) -> Result<()>;
}
