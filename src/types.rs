use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalised answer of a single remote lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    Absent,
    Failed(String),
}

impl Lookup {
    pub fn from_result(res: anyhow::Result<Option<String>>) -> Self {
        match res {
            Ok(Some(id)) if !id.is_empty() => Lookup::Found(id),
            Ok(_) => Lookup::Absent,
            Err(err) => Lookup::Failed(format!("{err:#}")),
        }
    }
}

/// Everything needed to render one query-level monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSpec {
    pub name: String,
    pub destination_id: String,
    pub indices: Vec<String>,
    pub schedule_interval: u32,
    pub schedule_unit: String,
    pub range_field: String,
    pub range_from: String,
    pub range_to: String,
    pub query_terms: Map<String, Value>,
    pub condition: String,
    pub trigger_subject: String,
    pub trigger_message: String,
}
