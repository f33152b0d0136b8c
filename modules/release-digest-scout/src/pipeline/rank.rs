//! Ranking & bound: newest first, then the configured output cap.

use release_digest_common::CandidateRecord;

/// Newest first, unknown dates last, then keep at most `max_output`.
///
/// `sort_by` is stable, so equal dates (and all unknown dates) keep their
/// input order and the result is identical across runs.
pub fn rank_and_truncate(
    mut records: Vec<CandidateRecord>,
    max_output: usize,
) -> Vec<CandidateRecord> {
    // Option orders None below Some, so descending puts unknown dates last.
    records.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    records.truncate(max_output);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    fn keys(records: &[CandidateRecord]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r.identity_key.rsplit('/').next().unwrap_or_default())
            .collect()
    }

    #[test]
    fn newest_first() {
        let ranked = rank_and_truncate(
            vec![
                record("old", "t", Some("2024-01-01")),
                record("new", "t", Some("2024-01-03")),
                record("mid", "t", Some("2024-01-02")),
            ],
            10,
        );
        assert_eq!(keys(&ranked), vec!["new", "mid", "old"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let ranked = rank_and_truncate(
            vec![
                record("b", "t", Some("2024-01-02")),
                record("a", "t", Some("2024-01-02")),
                record("c", "t", Some("2024-01-02")),
            ],
            10,
        );
        assert_eq!(keys(&ranked), vec!["b", "a", "c"]);
    }

    #[test]
    fn unknown_dates_last_in_input_order() {
        let ranked = rank_and_truncate(
            vec![
                record("x", "t", None),
                record("dated", "t", Some("2020-01-01")),
                record("y", "t", None),
            ],
            10,
        );
        assert_eq!(keys(&ranked), vec!["dated", "x", "y"]);
    }

    #[test]
    fn truncates_to_max_output() {
        let ranked = rank_and_truncate(
            vec![
                record("one", "t", Some("2024-01-01")),
                record("two", "t", Some("2024-01-02")),
            ],
            1,
        );
        assert_eq!(keys(&ranked), vec!["two"]);
    }

    #[test]
    fn never_pads() {
        let ranked = rank_and_truncate(vec![record("one", "t", None)], 20);
        assert_eq!(ranked.len(), 1);
        assert!(rank_and_truncate(Vec::new(), 20).is_empty());
    }
}
