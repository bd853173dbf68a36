use crate::quota::capacity::RecordSummary;

/// Ordered eviction decision: which records to remove and how many bytes
/// their removal frees.
#[derive(Debug, Clone)]
pub struct EvictionPlan {
    pub victims: Vec<String>,
    pub freed_bytes: u64,
}

impl EvictionPlan {
    /// Whether executing the plan frees at least the requested reduction.
    pub fn satisfies(&self, needed_bytes: u64) -> bool {
        self.freed_bytes >= needed_bytes
    }
}

/// Selects records to evict until at least `needed_bytes` are freed.
///
/// Candidates are taken strictly oldest-first (`uploaded_at` ascending,
/// ties broken by id so the order is stable). Record size never influences
/// the order: a large old record goes before small new ones even when that
/// over-frees relative to the strict minimum.
pub fn plan(candidates: &[RecordSummary], needed_bytes: u64) -> EvictionPlan {
    let mut ordered: Vec<&RecordSummary> = candidates.iter().collect();
    ordered.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then_with(|| a.id.cmp(&b.id)));

    let mut victims = Vec::new();
    let mut freed_bytes = 0u64;
    for entry in ordered {
        if freed_bytes >= needed_bytes {
            break;
        }
        freed_bytes += entry.size;
        victims.push(entry.id.clone());
    }
    EvictionPlan { victims, freed_bytes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn entry(id: &str, age_secs: i64, size: u64) -> RecordSummary {
        RecordSummary {
            id: id.into(),
            uploaded_at: Utc::now() - Duration::seconds(age_secs),
            size,
        }
    }

    #[test]
    fn test_oldest_goes_first_regardless_of_size() {
        // The oldest record is the smallest; it is still evicted first.
        let candidates = vec![entry("small-old", 300, 10), entry("big-new", 100, 500)];
        let plan = plan(&candidates, 5);
        assert_eq!(plan.victims, vec!["small-old".to_string()]);
        assert_eq!(plan.freed_bytes, 10);
    }

    #[test]
    fn test_large_old_record_over_frees() {
        // One big old record satisfies the target in a single step even
        // though the two newer ones would have been a tighter fit.
        let candidates =
            vec![entry("huge", 300, 1000), entry("a", 200, 30), entry("b", 100, 30)];
        let plan = plan(&candidates, 50);
        assert_eq!(plan.victims, vec!["huge".to_string()]);
        assert_eq!(plan.freed_bytes, 1000);
    }

    #[test]
    fn test_cascades_until_target_met() {
        let candidates = vec![entry("a", 300, 20), entry("b", 200, 20), entry("c", 100, 20)];
        let plan = plan(&candidates, 35);
        assert_eq!(plan.victims, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(plan.freed_bytes, 40);
        assert!(plan.satisfies(35));
    }

    #[test]
    fn test_exhausted_candidates_fall_short() {
        let candidates = vec![entry("a", 300, 20), entry("b", 200, 20)];
        let plan = plan(&candidates, 100);
        assert_eq!(plan.victims.len(), 2);
        assert_eq!(plan.freed_bytes, 40);
        assert!(!plan.satisfies(100));
    }

    #[test]
    fn test_equal_timestamps_break_ties_by_id() {
        let now = Utc::now();
        let mk = |id: &str| RecordSummary { id: id.into(), uploaded_at: now, size: 10 };
        let plan_a = plan(&[mk("beta"), mk("alpha")], 15);
        let plan_b = plan(&[mk("alpha"), mk("beta")], 15);
        assert_eq!(plan_a.victims, vec!["alpha".to_string(), "beta".to_string()]);
        assert_eq!(plan_a.victims, plan_b.victims);
    }
}
