//! Custom-resource events and the desired-state request decoded from them.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::RequestError;
use crate::es_index;
use crate::types::MonitorSpec;

const DEFAULT_MONITOR_INTERVAL: u32 = 5;
const DEFAULT_MONITOR_UNIT: &str = "MINUTES";
const DEFAULT_MONITOR_CONDITION: &str = "ctx.results[0].hits.total.value > 5";
const DEFAULT_RANGE_FIELD: &str = "timestamp";
const DEFAULT_RANGE_FROM: &str = "now-1h";
const DEFAULT_RANGE_TO: &str = "now";
const DEFAULT_TRIGGER_SUBJECT: &str = "Monitor Triggered";

/// Triggering event as delivered by the deployment orchestrator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    #[serde(default)]
    pub request_type: Option<String>,
    #[serde(default)]
    pub resource_properties: Map<String, Value>,
    #[serde(default)]
    pub stack_id: Option<String>,
    #[serde(default, rename = "ResponseURL")]
    pub response_url: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub logical_resource_id: Option<String>,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
}

impl CustomResourceEvent {
    /// A stack id means the orchestrator is waiting on a callback.
    pub fn expects_callback(&self) -> bool {
        self.stack_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
    Invalid(Option<String>),
}

impl RequestType {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("Create") => RequestType::Create,
            Some("Update") => RequestType::Update,
            Some("Delete") => RequestType::Delete,
            other => RequestType::Invalid(other.map(str::to_string)),
        }
    }

    pub fn is_create_or_update(&self) -> bool {
        matches!(self, RequestType::Create | RequestType::Update)
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestType::Create => f.write_str("Create"),
            RequestType::Update => f.write_str("Update"),
            RequestType::Delete => f.write_str("Delete"),
            RequestType::Invalid(Some(raw)) => write!(f, "{raw:?}"),
            RequestType::Invalid(None) => f.write_str("<missing>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnsAlert {
    pub name: String,
    pub topic_arn: String,
    pub role_arn: String,
}

/// Monitor settings before the destination is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorRequest {
    pub name: String,
    pub interval: u32,
    pub unit: String,
    pub condition: String,
    pub range_field: String,
    pub range_from: String,
    pub range_to: String,
    pub query_terms: Map<String, Value>,
    pub trigger_subject: String,
    pub trigger_message: String,
}

impl MonitorRequest {
    pub fn bind(&self, destination_id: String, index: &str) -> MonitorSpec {
        MonitorSpec {
            name: self.name.clone(),
            destination_id,
            indices: vec![index.to_string()],
            schedule_interval: self.interval,
            schedule_unit: self.unit.clone(),
            range_field: self.range_field.clone(),
            range_from: self.range_from.clone(),
            range_to: self.range_to.clone(),
            query_terms: self.query_terms.clone(),
            condition: self.condition.clone(),
            trigger_subject: self.trigger_subject.clone(),
            trigger_message: self.trigger_message.clone(),
        }
    }
}

impl Default for MonitorRequest {
    fn default() -> Self {
        let query_terms = Map::new();
        Self {
            name: String::new(),
            interval: DEFAULT_MONITOR_INTERVAL,
            unit: DEFAULT_MONITOR_UNIT.to_string(),
            condition: DEFAULT_MONITOR_CONDITION.to_string(),
            range_field: DEFAULT_RANGE_FIELD.to_string(),
            range_from: DEFAULT_RANGE_FROM.to_string(),
            range_to: DEFAULT_RANGE_TO.to_string(),
            trigger_subject: DEFAULT_TRIGGER_SUBJECT.to_string(),
            trigger_message: default_trigger_message(
                &query_terms,
                DEFAULT_MONITOR_CONDITION,
                DEFAULT_MONITOR_INTERVAL,
            ),
            query_terms,
        }
    }
}

/// Desired state for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationRequest {
    pub request_type: RequestType,
    pub region: String,
    pub endpoint: String,
    pub index: String,
    pub mappings: Map<String, Value>,
    pub initialize_dashboard: bool,
    pub sns_alert_name: String,
    pub sns_topic_arn: String,
    pub sns_role_arn: String,
    pub monitor: MonitorRequest,
    pub document_delete_range: Option<Value>,
}

impl ReconciliationRequest {
    pub fn new(request_type: RequestType, endpoint: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            request_type,
            region: String::new(),
            endpoint: endpoint.into(),
            index: index.into(),
            mappings: Map::new(),
            initialize_dashboard: false,
            sns_alert_name: String::new(),
            sns_topic_arn: String::new(),
            sns_role_arn: String::new(),
            monitor: MonitorRequest::default(),
            document_delete_range: None,
        }
    }

    pub fn from_event(
        event: &CustomResourceEvent,
        default_region: &str,
    ) -> Result<Self, RequestError> {
        let props = &event.resource_properties;

        let index = prop_str(props, "OpenSearchIndex");
        es_index::validate_index_name(&index).map_err(RequestError::InvalidIndex)?;

        let region = match prop_str(props, "Region") {
            r if r.is_empty() => default_region.trim().to_string(),
            r => r,
        };

        let interval = prop_u32(props, "MonitorInterval", DEFAULT_MONITOR_INTERVAL)?;
        let condition = prop_str_or(props, "MonitorCondition", DEFAULT_MONITOR_CONDITION);
        let query_terms = prop_object(props, "MonitorQueryTerms")?;
        let trigger_message = match prop_str(props, "MonitorTriggerMessage") {
            m if m.is_empty() => default_trigger_message(&query_terms, &condition, interval),
            m => m,
        };
        let monitor = MonitorRequest {
            name: prop_str(props, "MonitorName"),
            interval,
            unit: prop_str_or(props, "MonitorUnit", DEFAULT_MONITOR_UNIT),
            condition,
            range_field: prop_str_or(props, "MonitorRangeField", DEFAULT_RANGE_FIELD),
            range_from: prop_str_or(props, "MonitorRangeFrom", DEFAULT_RANGE_FROM),
            range_to: prop_str_or(props, "MonitorRangeTo", DEFAULT_RANGE_TO),
            query_terms,
            trigger_subject: prop_str_or(props, "MonitorTriggerSubject", DEFAULT_TRIGGER_SUBJECT),
            trigger_message,
        };

        Ok(Self {
            request_type: RequestType::parse(event.request_type.as_deref()),
            region,
            endpoint: prop_str(props, "OpenSearchDomain"),
            index,
            mappings: prop_object(props, "Mappings")?,
            initialize_dashboard: prop_bool(
                props,
                &["InitializeDashboard", "InitalizeDashboard"],
                false,
            )?,
            sns_alert_name: prop_str(props, "SnsAlertName"),
            sns_topic_arn: prop_str(props, "SnsTopicArn"),
            sns_role_arn: prop_str(props, "SnsRoleArn"),
            monitor,
            document_delete_range: prop_optional_json(props, "DocumentDeleteRange")?,
        })
    }

    /// Alerting is enabled only when name, topic, and role are all present.
    pub fn sns_alert(&self) -> Option<SnsAlert> {
        if self.sns_alert_name.is_empty()
            || self.sns_topic_arn.is_empty()
            || self.sns_role_arn.is_empty()
        {
            return None;
        }
        Some(SnsAlert {
            name: self.sns_alert_name.clone(),
            topic_arn: self.sns_topic_arn.clone(),
            role_arn: self.sns_role_arn.clone(),
        })
    }

    pub fn monitor_enabled(&self) -> bool {
        !self.monitor.name.is_empty() && !self.sns_alert_name.is_empty() && !self.index.is_empty()
    }
}

pub fn default_trigger_message(terms: &Map<String, Value>, condition: &str, interval: u32) -> String {
    format!(
        "Monitor detected {} satisfying {} within {}",
        Value::Object(terms.clone()),
        condition,
        interval
    )
}

fn prop_str(props: &Map<String, Value>, key: &str) -> String {
    match props.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn prop_str_or(props: &Map<String, Value>, key: &str, default: &str) -> String {
    match prop_str(props, key) {
        s if s.is_empty() => default.to_string(),
        s => s,
    }
}

fn prop_u32(props: &Map<String, Value>, key: &'static str, default: u32) -> Result<u32, RequestError> {
    let raw = prop_str(props, key);
    if raw.is_empty() {
        return Ok(default);
    }
    raw.parse::<u32>().map_err(|_| RequestError::InvalidInteger { key, value: raw })
}

fn prop_bool(props: &Map<String, Value>, keys: &[&'static str], default: bool) -> Result<bool, RequestError> {
    for &key in keys {
        if let Some(Value::Bool(b)) = props.get(key) {
            return Ok(*b);
        }
        let raw = prop_str(props, key);
        if raw.is_empty() {
            continue;
        }
        return parse_bool(&raw).ok_or(RequestError::InvalidBool { key, value: raw });
    }
    Ok(default)
}

/// Accepts the usual truthy/falsy spellings, case-insensitively.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn prop_optional_json(props: &Map<String, Value>, key: &'static str) -> Result<Option<Value>, RequestError> {
    let value = match props.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => serde_json::from_str::<Value>(s.trim()).map_err(|e| {
            RequestError::InvalidJson {
                key,
                reason: e.to_string(),
            }
        })?,
        Some(other) => other.clone(),
    };
    match &value {
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(_) => Ok(Some(value)),
        _ => Err(RequestError::NotAnObject { key }),
    }
}

fn prop_object(props: &Map<String, Value>, key: &'static str) -> Result<Map<String, Value>, RequestError> {
    match prop_optional_json(props, key)? {
        Some(Value::Object(map)) => Ok(map),
        _ => Ok(Map::new()),
    }
}
