//! Identity index: one retained record per canonical URL.

use std::collections::HashMap;

use release_digest_common::{CandidateRecord, MergePolicy};

/// What happened to an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First record with this key.
    Inserted,
    /// Key already held; incoming dropped (first-seen-wins).
    Discarded,
    /// Key already held; incoming took the slot (last-write-wins).
    Replaced,
}

/// Insertion-ordered map from identity key to record.
///
/// Order matters downstream: ranking is a stable sort, so records with equal
/// dates keep the order in which their keys were first seen. A replacement
/// under last-write-wins keeps the slot of the record it replaces.
#[derive(Debug, Clone)]
pub struct IdentityIndex {
    policy: MergePolicy,
    slots: HashMap<String, usize>,
    records: Vec<CandidateRecord>,
}

impl IdentityIndex {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            slots: HashMap::new(),
            records: Vec::new(),
        }
    }

    pub fn merge(&mut self, incoming: CandidateRecord) -> MergeOutcome {
        match self.slots.get(&incoming.identity_key) {
            None => {
                self.slots
                    .insert(incoming.identity_key.clone(), self.records.len());
                self.records.push(incoming);
                MergeOutcome::Inserted
            }
            Some(&slot) => match self.policy {
                MergePolicy::FirstSeenWins => MergeOutcome::Discarded,
                MergePolicy::LastWriteWins => {
                    self.records[slot] = incoming;
                    MergeOutcome::Replaced
                }
            },
        }
    }

    pub fn get(&self, identity_key: &str) -> Option<&CandidateRecord> {
        self.slots.get(identity_key).map(|&slot| &self.records[slot])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Retained records in first-insertion order.
    pub fn into_records(self) -> Vec<CandidateRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    #[test]
    fn first_seen_wins_keeps_earliest() {
        let mut index = IdentityIndex::new(MergePolicy::FirstSeenWins);
        assert_eq!(index.merge(record("u1", "a", Some("2024-01-02"))), MergeOutcome::Inserted);
        assert_eq!(index.merge(record("u1", "b", Some("2024-01-05"))), MergeOutcome::Discarded);

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("https://a.bandcamp.com/album/u1").unwrap().topic_key, "a");
    }

    #[test]
    fn last_write_wins_overwrites_in_place() {
        let mut index = IdentityIndex::new(MergePolicy::LastWriteWins);
        index.merge(record("u1", "a", None));
        index.merge(record("u2", "a", None));
        assert_eq!(index.merge(record("u1", "b", None)), MergeOutcome::Replaced);

        let records = index.into_records();
        let topics: Vec<&str> = records.iter().map(|r| r.topic_key.as_str()).collect();
        assert_eq!(topics, vec!["b", "a"]);
        assert!(records[0].identity_key.ends_with("/u1"));
    }

    #[test]
    fn insertion_order_preserved() {
        let mut index = IdentityIndex::new(MergePolicy::FirstSeenWins);
        for key in ["u3", "u1", "u2"] {
            index.merge(record(key, "a", None));
        }
        let keys: Vec<String> = index
            .into_records()
            .into_iter()
            .map(|r| r.identity_key)
            .collect();
        assert!(keys[0].ends_with("/u3"));
        assert!(keys[1].ends_with("/u1"));
        assert!(keys[2].ends_with("/u2"));
    }

    #[test]
    fn empty_index() {
        let index = IdentityIndex::new(MergePolicy::default());
        assert!(index.is_empty());
        assert!(index.get("anything").is_none());
    }
}
