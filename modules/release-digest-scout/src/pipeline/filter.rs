//! Eligibility filter: pure, binary, AND-composed predicates.

use chrono::NaiveDate;
use release_digest_common::{CandidateRecord, FilterConfig};

/// Why a record was excluded. The first failing predicate wins, checked in
/// the order recency, item count, description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnknownDate,
    TooOld { age_days: i64 },
    ItemCountUnobserved,
    TooFewItems { count: u32 },
    DescriptionUnobserved,
    DescriptionTooShort { length: usize },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::UnknownDate => write!(f, "unknown release date"),
            Rejection::TooOld { age_days } => write!(f, "released {age_days} days ago"),
            Rejection::ItemCountUnobserved => write!(f, "item count not observed"),
            Rejection::TooFewItems { count } => write!(f, "only {count} items"),
            Rejection::DescriptionUnobserved => write!(f, "description not observed"),
            Rejection::DescriptionTooShort { length } => {
                write!(f, "description only {length} chars")
            }
        }
    }
}

/// Check every enabled predicate. `today` anchors the recency window.
pub fn check(
    record: &CandidateRecord,
    config: &FilterConfig,
    today: NaiveDate,
) -> Result<(), Rejection> {
    if let Some(max_age) = config.max_age_days {
        let age_days = record.age_days(today).ok_or(Rejection::UnknownDate)?;
        if age_days > i64::from(max_age) {
            return Err(Rejection::TooOld { age_days });
        }
    }

    match (record.richness.item_count, config.min_item_count) {
        (None, _) if config.require_item_count => return Err(Rejection::ItemCountUnobserved),
        (Some(count), Some(min_items)) if count < min_items => {
            return Err(Rejection::TooFewItems { count })
        }
        _ => {}
    }

    match (&record.richness.description, config.min_description_length) {
        (None, _) if config.require_description => return Err(Rejection::DescriptionUnobserved),
        (Some(text), Some(min_length)) => {
            let length = text.trim().chars().count();
            if length < min_length {
                return Err(Rejection::DescriptionTooShort { length });
            }
        }
        _ => {}
    }

    Ok(())
}

pub fn is_eligible(record: &CandidateRecord, config: &FilterConfig, today: NaiveDate) -> bool {
    check(record, config, today).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{date, record};
    use release_digest_common::RichnessSignals;

    fn today() -> NaiveDate {
        date("2024-01-10")
    }

    fn with_richness(count: Option<u32>, description: Option<&str>) -> CandidateRecord {
        CandidateRecord {
            richness: RichnessSignals {
                item_count: count,
                description: description.map(String::from),
            },
            ..record("u", "t", Some("2024-01-09"))
        }
    }

    #[test]
    fn no_filters_accept_everything() {
        let config = FilterConfig::default();
        assert!(is_eligible(&record("u", "t", None), &config, today()));
    }

    #[test]
    fn recency_window_inclusive() {
        let config = FilterConfig {
            max_age_days: Some(7),
            ..FilterConfig::default()
        };
        assert!(is_eligible(&record("u", "t", Some("2024-01-03")), &config, today()));
        assert_eq!(
            check(&record("u", "t", Some("2024-01-02")), &config, today()),
            Err(Rejection::TooOld { age_days: 8 })
        );
    }

    #[test]
    fn unknown_date_excluded_when_recency_enabled() {
        let config = FilterConfig {
            max_age_days: Some(3650),
            ..FilterConfig::default()
        };
        assert_eq!(
            check(&record("u", "t", None), &config, today()),
            Err(Rejection::UnknownDate)
        );
    }

    #[test]
    fn future_dates_pass_recency() {
        let config = FilterConfig {
            max_age_days: Some(1),
            ..FilterConfig::default()
        };
        assert!(is_eligible(&record("u", "t", Some("2024-02-01")), &config, today()));
    }

    #[test]
    fn item_count_below_threshold_excluded() {
        let config = FilterConfig {
            min_item_count: Some(4),
            ..FilterConfig::default()
        };
        assert_eq!(
            check(&with_richness(Some(3), None), &config, today()),
            Err(Rejection::TooFewItems { count: 3 })
        );
        assert!(is_eligible(&with_richness(Some(4), None), &config, today()));
    }

    #[test]
    fn unobserved_item_count_passes_unless_required() {
        let lenient = FilterConfig {
            min_item_count: Some(4),
            ..FilterConfig::default()
        };
        assert!(is_eligible(&with_richness(None, None), &lenient, today()));

        let strict = FilterConfig {
            require_item_count: true,
            ..lenient
        };
        assert_eq!(
            check(&with_richness(None, None), &strict, today()),
            Err(Rejection::ItemCountUnobserved)
        );
    }

    #[test]
    fn require_flags_apply_without_thresholds() {
        let config = FilterConfig {
            require_item_count: true,
            require_description: true,
            ..FilterConfig::default()
        };
        assert_eq!(
            check(&with_richness(None, Some("cold")), &config, today()),
            Err(Rejection::ItemCountUnobserved)
        );
        assert_eq!(
            check(&with_richness(Some(1), None), &config, today()),
            Err(Rejection::DescriptionUnobserved)
        );
        assert!(is_eligible(&with_richness(Some(1), Some("x")), &config, today()));
    }

    #[test]
    fn description_length_counts_chars() {
        let config = FilterConfig {
            min_description_length: Some(5),
            ..FilterConfig::default()
        };
        // 5 chars, 10 bytes
        assert!(is_eligible(&with_richness(None, Some("ледян")), &config, today()));
        assert_eq!(
            check(&with_richness(None, Some("  cold ")), &config, today()),
            Err(Rejection::DescriptionTooShort { length: 4 })
        );
    }

    #[test]
    fn unobserved_description_passes_unless_required() {
        let lenient = FilterConfig {
            min_description_length: Some(10),
            ..FilterConfig::default()
        };
        assert!(is_eligible(&with_richness(None, None), &lenient, today()));

        let strict = FilterConfig {
            require_description: true,
            ..lenient
        };
        assert_eq!(
            check(&with_richness(None, None), &strict, today()),
            Err(Rejection::DescriptionUnobserved)
        );
    }

    #[test]
    fn predicates_compose_with_and() {
        let config = FilterConfig {
            max_age_days: Some(7),
            min_item_count: Some(2),
            ..FilterConfig::default()
        };
        // fresh but too few items
        assert!(!is_eligible(&with_richness(Some(1), None), &config, today()));
        // enough items and fresh
        assert!(is_eligible(&with_richness(Some(2), None), &config, today()));
    }
}
