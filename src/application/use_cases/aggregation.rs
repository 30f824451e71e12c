use crate::domain::claim::{AggregateOutcome, Decision, Verdict};

/// Reconciles the per-item verdicts into one outcome. All-or-nothing rule:
/// the aggregate is Approved only when every verdict is Approved. Pure; the
/// orchestrator guarantees the slice is non-empty before calling.
pub fn aggregate(verdicts: &[Verdict]) -> AggregateOutcome {
    let final_decision = if verdicts.iter().all(|v| v.decision == Decision::Approved) {
        Decision::Approved
    } else {
        Decision::Rejected
    };

    let combined_feedback = verdicts
        .iter()
        .map(|v| v.feedback.trim())
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string();

    AggregateOutcome {
        final_decision,
        combined_feedback,
        processed_count: verdicts.len(),
        artifact_locations: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(decision: Decision, feedback: &str) -> Verdict {
        Verdict {
            decision,
            feedback: feedback.to_string(),
        }
    }

    #[test]
    fn all_approved_aggregates_to_approved() {
        let outcome = aggregate(&[
            verdict(Decision::Approved, "fine"),
            verdict(Decision::Approved, "also fine"),
        ]);
        assert_eq!(outcome.final_decision, Decision::Approved);
        assert_eq!(outcome.processed_count, 2);
        assert_eq!(outcome.combined_feedback, "fine\n\nalso fine");
    }

    #[test]
    fn one_rejection_flips_the_aggregate_regardless_of_position() {
        for position in 0..3 {
            let mut verdicts = vec![
                verdict(Decision::Approved, "a"),
                verdict(Decision::Approved, "b"),
                verdict(Decision::Approved, "c"),
            ];
            verdicts[position].decision = Decision::Rejected;
            assert_eq!(aggregate(&verdicts).final_decision, Decision::Rejected);
        }
    }

    #[test]
    fn empty_feedback_entries_are_skipped() {
        let outcome = aggregate(&[
            verdict(Decision::Approved, "  "),
            verdict(Decision::Approved, "kept"),
        ]);
        assert_eq!(outcome.combined_feedback, "kept");
    }
}
