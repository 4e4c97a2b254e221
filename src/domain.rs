//! OpenSearch REST implementation of [`SearchApi`].

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::{Map, Value};
use tracing::info;

use crate::api::SearchApi;
use crate::config::Config;
use crate::es_http::{Credentials, EsHttp};
use crate::es_index;
use crate::es_query;
use crate::types::{Lookup, MonitorSpec};

#[derive(Clone)]
pub struct DomainClient {
    http: EsHttp,
    dashboards_path: Arc<str>,
    alerting_path: Arc<str>,
}

impl DomainClient {
    pub fn new(endpoint: &str, credentials: Credentials, cfg: &Config) -> Result<Self> {
        Ok(Self {
            http: EsHttp::new(endpoint.to_string(), credentials, cfg.http_timeout())?,
            dashboards_path: Arc::from(cfg.dashboards_path.trim_matches('/')),
            alerting_path: Arc::from(cfg.alerting_path.trim_matches('/')),
        })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    fn dashboards(&self, method: Method, rel: &str) -> RequestBuilder {
        self.http
            .request(method, &format!("{}/{}", self.dashboards_path, rel))
            .header("osd-xsrf", "true")
    }

    fn alerting(&self, method: Method, rel: &str) -> RequestBuilder {
        self.http
            .request(method, &format!("{}/{}", self.alerting_path, rel))
    }

    async fn find_saved_object(&self, kind: &str, title: &str) -> Result<Option<String>> {
        if title.is_empty() {
            return Ok(None);
        }
        let quoted = format!("\"{title}\"");
        let req = self.dashboards(Method::GET, "_find").query(&[
            ("type", kind),
            ("search_fields", "title"),
            ("search", quoted.as_str()),
        ]);
        let found: Option<Value> = self.http.send_optional(req, "find saved object").await?;
        Ok(found.and_then(|v| saved_object_id_by_title(&v, title)))
    }

    async fn find_index_pattern(&self, id: &str, title: &str) -> Result<Option<String>> {
        if !id.is_empty() {
            let req = self.dashboards(Method::GET, &format!("index-pattern/{id}"));
            let found: Option<Value> = self.http.send_optional(req, "get index pattern").await?;
            if let Some(found_id) = found.as_ref().and_then(saved_object_id) {
                return Ok(Some(found_id));
            }
        }
        self.find_saved_object("index-pattern", title).await
    }

    async fn find_destination(&self, name: &str) -> Result<Option<String>> {
        let req = self
            .alerting(Method::GET, "destinations")
            .query(&[("searchString", name)]);
        let found: Option<Value> = self.http.send_optional(req, "get alert destination").await?;
        Ok(found.and_then(|v| destination_id_by_name(&v, name)))
    }

    async fn find_monitor(&self, name: &str) -> Result<Option<String>> {
        let req = self
            .alerting(Method::POST, "monitors/_search")
            .json(&es_query::monitor_search_body(name));
        let found: Option<Value> = self.http.send_optional(req, "search monitors").await?;
        Ok(found.and_then(|v| monitor_id_from_search(&v)))
    }
}

#[async_trait]
impl SearchApi for DomainClient {
    async fn list_indices(&self) -> Result<Vec<String>> {
        let rows: Value = self
            .http
            .get_json("_cat/indices?format=json&h=index", "list indices")
            .await?;
        Ok(es_index::index_names(&rows))
    }

    async fn document_count(&self, index: &str, filter: &str) -> Result<Option<u64>> {
        let req = self
            .http
            .request(Method::GET, &format!("_cat/indices/{index}"))
            .query(&[("format", "json"), ("h", filter)]);
        let rows: Option<Value> = self.http.send_optional(req, "document count").await?;
        Ok(rows.and_then(|r| es_index::parse_doc_count(&r)))
    }

    async fn create_index(&self, index: &str, mappings: &Map<String, Value>) -> Result<()> {
        let body = es_query::create_index_body(mappings);
        self.http.put_value(index, &body, "create index").await?;
        info!("domain: created index {}", index);
        Ok(())
    }

    async fn reindex(&self, source: &str, dest: &str) -> Result<()> {
        let req = self
            .http
            .request(Method::POST, "_reindex")
            .query(&[("wait_for_completion", "false")])
            .json(&es_query::reindex_body(source, dest));
        self.http.send_ok(req, "reindex request").await?;
        info!("domain: reindex accepted source={} dest={}", source, dest);
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        self.http.delete_allow_404(index, "delete index").await?;
        info!("domain: deleted index {}", index);
        Ok(())
    }

    async fn delete_documents(&self, index: &str, range: &Value) -> Result<()> {
        let body = es_query::delete_by_query_body(range);
        let resp = self
            .http
            .post_value(
                &format!("{index}/_delete_by_query?conflicts=proceed"),
                &body,
                "delete by query",
            )
            .await?;
        let deleted = resp.get("deleted").and_then(|v| v.as_u64()).unwrap_or(0);
        info!("domain: deleted {} documents from {}", deleted, index);
        Ok(())
    }

    async fn get_index_pattern(&self, id: &str, title: &str) -> Lookup {
        Lookup::from_result(self.find_index_pattern(id, title).await)
    }

    async fn set_index_pattern(&self, id: &str, title: &str, overwrite: bool) -> Result<()> {
        let mut req = self.dashboards(Method::POST, &format!("index-pattern/{id}"));
        if overwrite {
            req = req.query(&[("overwrite", "true")]);
        }
        let req = req.json(&es_query::index_pattern_body(title));
        self.http.send_ok(req, "set index pattern").await?;
        Ok(())
    }

    async fn get_dashboard(&self, title: &str) -> Lookup {
        Lookup::from_result(self.find_saved_object("dashboard", title).await)
    }

    async fn set_dashboard(&self, title: &str, existing_id: Option<&str>) -> Result<()> {
        let req = match existing_id {
            Some(id) => self
                .dashboards(Method::POST, &format!("dashboard/{id}"))
                .query(&[("overwrite", "true")]),
            None => self.dashboards(Method::POST, "dashboard"),
        };
        let req = req.json(&es_query::dashboard_body(title));
        self.http.send_ok(req, "set dashboard").await?;
        Ok(())
    }

    async fn get_alert_destination(&self, name: &str) -> Lookup {
        Lookup::from_result(self.find_destination(name).await)
    }

    async fn set_alert_destination(
        &self,
        name: &str,
        topic_arn: &str,
        role_arn: &str,
        existing_id: Option<&str>,
    ) -> Result<()> {
        let body = es_query::sns_destination_body(name, topic_arn, role_arn);
        let req = match existing_id {
            Some(id) => self.alerting(Method::PUT, &format!("destinations/{id}")),
            None => self.alerting(Method::POST, "destinations"),
        };
        self.http
            .send_ok(req.json(&body), "set alert destination")
            .await?;
        Ok(())
    }

    async fn get_monitor(&self, name: &str) -> Lookup {
        Lookup::from_result(self.find_monitor(name).await)
    }

    async fn set_monitor(&self, monitor: &MonitorSpec, existing_id: Option<&str>) -> Result<()> {
        let body = es_query::monitor_body(monitor);
        let req = match existing_id {
            Some(id) => self.alerting(Method::PUT, &format!("monitors/{id}")),
            None => self.alerting(Method::POST, "monitors"),
        };
        self.http.send_ok(req.json(&body), "set monitor").await?;
        Ok(())
    }
}

/// `id` of a single saved-object response.
pub fn saved_object_id(v: &Value) -> Option<String> {
    v.get("id")
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Id of the saved object in a `_find` response whose title matches exactly.
pub fn saved_object_id_by_title(v: &Value, title: &str) -> Option<String> {
    v.get("saved_objects")?
        .as_array()?
        .iter()
        .find(|obj| {
            obj.pointer("/attributes/title").and_then(|t| t.as_str()) == Some(title)
        })
        .and_then(saved_object_id)
}

pub fn destination_id_by_name(v: &Value, name: &str) -> Option<String> {
    v.get("destinations")?
        .as_array()?
        .iter()
        .find(|d| d.get("name").and_then(|n| n.as_str()) == Some(name))
        .and_then(saved_object_id)
}

/// First hit's `_id` from a monitor search.
pub fn monitor_id_from_search(v: &Value) -> Option<String> {
    v.pointer("/hits/hits/0/_id")
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
