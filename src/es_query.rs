use serde_json::{json, Map, Value};

use crate::types::MonitorSpec;

pub fn create_index_body(mappings: &Map<String, Value>) -> Value {
    if mappings.is_empty() {
        return json!({});
    }
    json!({ "mappings": mappings })
}

pub fn reindex_body(source: &str, dest: &str) -> Value {
    json!({
        "source": { "index": source },
        "dest": { "index": dest }
    })
}

/// Accepts either a bare query clause or a full `{"query": ..}` body.
pub fn delete_by_query_body(range: &Value) -> Value {
    if range.get("query").is_some() {
        return range.clone();
    }
    json!({ "query": range })
}

pub fn index_pattern_body(title: &str) -> Value {
    json!({ "attributes": { "title": title } })
}

pub fn dashboard_body(title: &str) -> Value {
    let search_source = json!({
        "query": { "query": "", "language": "kuery" },
        "filter": []
    });
    json!({
        "attributes": {
            "title": title,
            "description": "",
            "panelsJSON": "[]",
            "optionsJSON": "{\"hidePanelTitles\":false,\"useMargins\":true}",
            "timeRestore": false,
            "kibanaSavedObjectMeta": {
                "searchSourceJSON": search_source.to_string()
            }
        },
        "references": []
    })
}

pub fn sns_destination_body(name: &str, topic_arn: &str, role_arn: &str) -> Value {
    json!({
        "name": name,
        "type": "sns",
        "sns": {
            "topic_arn": topic_arn,
            "role_arn": role_arn
        }
    })
}

pub fn monitor_search_body(name: &str) -> Value {
    json!({
        "query": {
            "match_phrase": { "monitor.name": name }
        }
    })
}

pub fn monitor_body(spec: &MonitorSpec) -> Value {
    let mut range = Map::new();
    range.insert(
        spec.range_field.clone(),
        json!({ "gte": spec.range_from, "lte": spec.range_to }),
    );
    let mut filters = vec![json!({ "range": range })];
    for (field, value) in &spec.query_terms {
        let mut term = Map::new();
        term.insert(field.clone(), value.clone());
        filters.push(json!({ "match_phrase": term }));
    }

    json!({
        "type": "monitor",
        "monitor_type": "query_level_monitor",
        "name": spec.name,
        "enabled": true,
        "schedule": {
            "period": {
                "interval": spec.schedule_interval,
                "unit": spec.schedule_unit
            }
        },
        "inputs": [{
            "search": {
                "indices": spec.indices,
                "query": {
                    "size": 0,
                    "query": { "bool": { "filter": filters } }
                }
            }
        }],
        "triggers": [{
            "name": format!("{}-trigger", spec.name),
            "severity": "1",
            "condition": {
                "script": { "source": spec.condition, "lang": "painless" }
            },
            "actions": [{
                "name": format!("{}-action", spec.name),
                "destination_id": spec.destination_id,
                "subject_template": { "source": spec.trigger_subject, "lang": "mustache" },
                "message_template": { "source": spec.trigger_message, "lang": "mustache" }
            }]
        }]
    })
}
