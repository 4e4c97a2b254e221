//! In-memory search domain used to drive the reconciliation logic.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

use domainsync::api::SearchApi;
use domainsync::types::{Lookup, MonitorSpec};

struct PendingCopy {
    total: u64,
    polls_left: u32,
}

#[derive(Default)]
struct State {
    indices: BTreeMap<String, u64>,
    mappings: HashMap<String, Map<String, Value>>,
    pending: HashMap<String, PendingCopy>,
    scripted_counts: HashMap<String, VecDeque<Option<u64>>>,
    index_patterns: BTreeMap<String, String>,
    dashboards: BTreeMap<String, String>,
    destinations: BTreeMap<String, String>,
    monitors: BTreeMap<String, String>,
    last_monitor: Option<(MonitorSpec, Option<String>)>,
    failing: HashSet<&'static str>,
    reindex_lag: u32,
    stalled: bool,
    next_id: u32,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct FakeDomain {
    state: Mutex<State>,
}

impl FakeDomain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(self, name: &str, docs: u64) -> Self {
        self.state().indices.insert(name.to_string(), docs);
        self
    }

    pub fn with_index_pattern(self, id: &str, title: &str) -> Self {
        self.state()
            .index_patterns
            .insert(id.to_string(), title.to_string());
        self
    }

    pub fn with_dashboard(self, title: &str, id: &str) -> Self {
        self.state()
            .dashboards
            .insert(title.to_string(), id.to_string());
        self
    }

    pub fn with_destination(self, name: &str, id: &str) -> Self {
        self.state()
            .destinations
            .insert(name.to_string(), id.to_string());
        self
    }

    pub fn with_monitor(self, name: &str, id: &str) -> Self {
        self.state().monitors.insert(name.to_string(), id.to_string());
        self
    }

    /// The copy becomes visible on the poll after `polls` partial reads.
    pub fn with_reindex_lag(self, polls: u32) -> Self {
        self.state().reindex_lag = polls;
        self
    }

    /// Copies never finish.
    pub fn stalled(self) -> Self {
        self.state().stalled = true;
        self
    }

    /// Counts returned for `index`, one per read; the last one repeats.
    pub fn with_scripted_counts(self, index: &str, counts: Vec<Option<u64>>) -> Self {
        self.state()
            .scripted_counts
            .insert(index.to_string(), counts.into());
        self
    }

    pub fn failing(self, op: &'static str) -> Self {
        self.state().failing.insert(op);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.state().indices.contains_key(name)
    }

    pub fn docs(&self, name: &str) -> Option<u64> {
        self.state().indices.get(name).copied()
    }

    pub fn mapping_of(&self, name: &str) -> Option<Map<String, Value>> {
        self.state().mappings.get(name).cloned()
    }

    pub fn index_pattern_count(&self) -> usize {
        self.state().index_patterns.len()
    }

    pub fn dashboard_count(&self) -> usize {
        self.state().dashboards.len()
    }

    pub fn destination_id(&self, name: &str) -> Option<String> {
        self.state().destinations.get(name).cloned()
    }

    pub fn last_monitor(&self) -> Option<(MonitorSpec, Option<String>)> {
        self.state().last_monitor.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake state lock")
    }
}

impl State {
    fn call(&mut self, op: &'static str, detail: String) -> Result<()> {
        self.calls.push(format!("{op}:{detail}"));
        if self.failing.contains(op) {
            return Err(anyhow!("{op} failed (injected)"));
        }
        Ok(())
    }

    fn lookup(&mut self, op: &'static str, detail: String) -> Option<Lookup> {
        match self.call(op, detail) {
            Ok(()) => None,
            Err(err) => Some(Lookup::Failed(err.to_string())),
        }
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

#[async_trait]
impl SearchApi for FakeDomain {
    async fn list_indices(&self) -> Result<Vec<String>> {
        let mut st = self.state();
        st.call("list_indices", String::new())?;
        Ok(st.indices.keys().cloned().collect())
    }

    async fn document_count(&self, index: &str, _filter: &str) -> Result<Option<u64>> {
        let mut st = self.state();
        st.call("count", index.to_string())?;

        if let Some(script) = st.scripted_counts.get_mut(index) {
            let next = if script.len() > 1 {
                script.pop_front().flatten()
            } else {
                script.front().copied().flatten()
            };
            return Ok(next);
        }

        let stalled = st.stalled;
        if let Some(pending) = st.pending.get_mut(index) {
            if stalled || pending.polls_left > 0 {
                pending.polls_left = pending.polls_left.saturating_sub(1);
                return Ok(Some(pending.total / 2));
            }
            let total = pending.total;
            st.pending.remove(index);
            st.indices.insert(index.to_string(), total);
        }
        Ok(st.indices.get(index).copied())
    }

    async fn create_index(&self, index: &str, mappings: &Map<String, Value>) -> Result<()> {
        let mut st = self.state();
        st.call("create_index", index.to_string())?;
        if st.indices.contains_key(index) {
            return Err(anyhow!("resource_already_exists_exception: {index}"));
        }
        st.indices.insert(index.to_string(), 0);
        st.mappings.insert(index.to_string(), mappings.clone());
        Ok(())
    }

    async fn reindex(&self, source: &str, dest: &str) -> Result<()> {
        let mut st = self.state();
        st.call("reindex", format!("{source}->{dest}"))?;
        let total = *st
            .indices
            .get(source)
            .ok_or_else(|| anyhow!("no such index {source}"))?;
        let polls_left = st.reindex_lag;
        st.pending
            .insert(dest.to_string(), PendingCopy { total, polls_left });
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        let mut st = self.state();
        st.call("delete_index", index.to_string())?;
        st.indices.remove(index);
        st.mappings.remove(index);
        Ok(())
    }

    async fn delete_documents(&self, index: &str, range: &Value) -> Result<()> {
        let mut st = self.state();
        st.call("delete_documents", format!("{index}:{range}"))
    }

    async fn get_index_pattern(&self, id: &str, title: &str) -> Lookup {
        let mut st = self.state();
        if let Some(failed) = st.lookup("get_index_pattern", id.to_string()) {
            return failed;
        }
        if st.index_patterns.contains_key(id) {
            return Lookup::Found(id.to_string());
        }
        st.index_patterns
            .iter()
            .find(|(_, t)| t.as_str() == title)
            .map(|(found, _)| Lookup::Found(found.clone()))
            .unwrap_or(Lookup::Absent)
    }

    async fn set_index_pattern(&self, id: &str, title: &str, overwrite: bool) -> Result<()> {
        let mut st = self.state();
        st.call("set_index_pattern", format!("{id}:overwrite={overwrite}"))?;
        if st.index_patterns.contains_key(id) && !overwrite {
            return Err(anyhow!("conflict: index pattern {id} exists"));
        }
        st.index_patterns.insert(id.to_string(), title.to_string());
        Ok(())
    }

    async fn get_dashboard(&self, title: &str) -> Lookup {
        let mut st = self.state();
        if let Some(failed) = st.lookup("get_dashboard", title.to_string()) {
            return failed;
        }
        st.dashboards
            .get(title)
            .map(|id| Lookup::Found(id.clone()))
            .unwrap_or(Lookup::Absent)
    }

    async fn set_dashboard(&self, title: &str, existing_id: Option<&str>) -> Result<()> {
        let mut st = self.state();
        st.call("set_dashboard", format!("{title}:{existing_id:?}"))?;
        let id = match existing_id {
            Some(id) => id.to_string(),
            None => st.fresh_id("dashboard"),
        };
        st.dashboards.insert(title.to_string(), id);
        Ok(())
    }

    async fn get_alert_destination(&self, name: &str) -> Lookup {
        let mut st = self.state();
        if let Some(failed) = st.lookup("get_destination", name.to_string()) {
            return failed;
        }
        st.destinations
            .get(name)
            .map(|id| Lookup::Found(id.clone()))
            .unwrap_or(Lookup::Absent)
    }

    async fn set_alert_destination(
        &self,
        name: &str,
        topic_arn: &str,
        _role_arn: &str,
        existing_id: Option<&str>,
    ) -> Result<()> {
        let mut st = self.state();
        st.call(
            "set_destination",
            format!("{name}:{topic_arn}:{existing_id:?}"),
        )?;
        let id = match existing_id {
            Some(id) => id.to_string(),
            None => st.fresh_id("destination"),
        };
        st.destinations.insert(name.to_string(), id);
        Ok(())
    }

    async fn get_monitor(&self, name: &str) -> Lookup {
        let mut st = self.state();
        if let Some(failed) = st.lookup("get_monitor", name.to_string()) {
            return failed;
        }
        st.monitors
            .get(name)
            .map(|id| Lookup::Found(id.clone()))
            .unwrap_or(Lookup::Absent)
    }

    async fn set_monitor(&self, monitor: &MonitorSpec, existing_id: Option<&str>) -> Result<()> {
        let mut st = self.state();
        st.call("set_monitor", format!("{}:{existing_id:?}", monitor.name))?;
        let id = match existing_id {
            Some(id) => id.to_string(),
            None => st.fresh_id("monitor"),
        };
        st.monitors.insert(monitor.name.clone(), id);
        st.last_monitor = Some((monitor.clone(), existing_id.map(str::to_string)));
        Ok(())
    }
}
