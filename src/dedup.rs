use std::collections::HashMap;

/// Recently-seen message ids with their arrival time. Entries live for the
/// retention window and are removed by `sweep`, which callers run on every
/// message intake, so the map stays bounded under sustained traffic.
pub struct DedupCache {
    retention_secs: i64,
    entries: HashMap<String, i64>,
}

impl DedupCache {
    pub fn new(retention_secs: i64) -> Self {
        Self {
            retention_secs,
            entries: HashMap::new(),
        }
    }

    /// Drops every entry older than the retention window, measured against
    /// `now` in wall-clock seconds.
    pub fn sweep(&mut self, now: i64) {
        let retention = self.retention_secs;
        self.entries.retain(|_, seen| now - *seen <= retention);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, now: i64) {
        self.entries.insert(id.into(), now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
