use std::collections::HashSet;
use std::env;

use chrono::Duration;

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .map(|value| value.clamp(0.0, 1.0))
        .unwrap_or(default)
}

/// Non-negative hour count as a window; out-of-range values keep `default`.
fn window_from_hours(hours: i64, default: Duration) -> Duration {
    Duration::try_hours(hours.max(0)).unwrap_or(default)
}

fn env_address_set(key: &str) -> HashSet<String> {
    env::var(key)
        .map(|value| parse_address_list(&value))
        .unwrap_or_default()
}

/// Split a comma separated address list into lowercased, non-empty entries.
pub fn parse_address_list(value: &str) -> HashSet<String> {
    value
        .split(',')
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Tuning for the subject-only root merge.
#[derive(Debug, Clone)]
pub struct ThreadingConfig {
    /// Maximum distance between two headerless roots that may still merge
    pub subject_merge_window: Duration,
    /// Minimum content-token Jaccard similarity for a merge
    pub subject_merge_jaccard: f64,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            subject_merge_window: Duration::days(7),
            subject_merge_jaccard: 0.25,
        }
    }
}

/// Thresholds used by the cross-thread merge engine.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub similarity_threshold: f32,
    pub participant_overlap_threshold: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.82,
            participant_overlap_threshold: 1,
        }
    }
}

/// Runtime configuration for the whole triage pipeline.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub threading: ThreadingConfig,
    pub merge: MergeConfig,
    /// Addresses whose involvement raises personal priority
    pub vip_addresses: HashSet<String>,
    /// Addresses never counted as shared participants (lists, bots, yourself)
    pub ignored_participants: HashSet<String>,
}

impl TriageConfig {
    pub fn from_env() -> Self {
        let threading_defaults = ThreadingConfig::default();
        let merge_defaults = MergeConfig::default();

        let window_hours = env_i64(
            "TRIAGE_SUBJECT_WINDOW_HOURS",
            threading_defaults.subject_merge_window.num_hours(),
        );

        Self {
            threading: ThreadingConfig {
                subject_merge_window: window_from_hours(
                    window_hours,
                    threading_defaults.subject_merge_window,
                ),
                subject_merge_jaccard: env_f32(
                    "TRIAGE_SUBJECT_JACCARD",
                    threading_defaults.subject_merge_jaccard as f32,
                ) as f64,
            },
            merge: MergeConfig {
                similarity_threshold: env_f32(
                    "TRIAGE_SIMILARITY_THRESHOLD",
                    merge_defaults.similarity_threshold,
                ),
                participant_overlap_threshold: env_usize(
                    "TRIAGE_PARTICIPANT_OVERLAP",
                    merge_defaults.participant_overlap_threshold,
                ),
            },
            vip_addresses: env_address_set("TRIAGE_VIP_ADDRESSES"),
            ignored_participants: env_address_set("TRIAGE_IGNORED_PARTICIPANTS"),
        }
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_list() {
        let parsed = parse_address_list(" Boss@Corp.com , ,ceo@corp.com");
        assert_eq!(parsed.len(), 2);
        assert!(parsed.contains("boss@corp.com"));
        assert!(parsed.contains("ceo@corp.com"));
    }

    #[test]
    fn test_defaults() {
        let threading = ThreadingConfig::default();
        assert_eq!(threading.subject_merge_window, Duration::days(7));
        assert_eq!(threading.subject_merge_jaccard, 0.25);

        let merge = MergeConfig::default();
        assert_eq!(merge.similarity_threshold, 0.82);
        assert_eq!(merge.participant_overlap_threshold, 1);
    }

    #[test]
    fn test_window_from_hours_falls_back_when_out_of_range() {
        let default = Duration::days(7);
        assert_eq!(window_from_hours(36, default), Duration::hours(36));
        assert_eq!(window_from_hours(-5, default), Duration::zero());
        assert_eq!(window_from_hours(i64::MAX, default), default);
    }
}
