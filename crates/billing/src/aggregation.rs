//! Deterministic folding of item statuses into an order status.
//!
//! Two rules exist: the execution-pass rule, fed by a tally of the items
//! attempted during one coordinator pass, and the refresh rule, computed
//! purely from stored item statuses without touching the registry.

use crate::order::{OrderItemStatus, OrderStatus};

/// Outcome counters for one execution pass over an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionTally {
    pub executed: usize,
    pub processed: usize,
    pub in_progress: usize,
    pub failed: usize,
}

impl ExecutionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that an item was eligible and attempted in this pass.
    pub fn attempted(&mut self) {
        self.executed += 1;
    }

    /// Record the status an attempted item ended the pass with.
    pub fn observe(&mut self, status: OrderItemStatus) {
        match status {
            OrderItemStatus::Processed => self.processed += 1,
            OrderItemStatus::Pending => self.in_progress += 1,
            OrderItemStatus::Failed => self.failed += 1,
            // Blocked items and items stuck mid-flight count toward
            // `executed` only; resolve() treats them as not-processed.
            _ => {}
        }
    }

    /// Fold the tally into an order status.
    ///
    /// Priority: everything processed wins; an empty pass is incomplete;
    /// otherwise failure dominates, then in-progress, then incomplete.
    pub fn resolve(&self) -> OrderStatus {
        if self.processed == self.executed {
            if self.executed > 0 {
                OrderStatus::Processed
            } else {
                OrderStatus::Incomplete
            }
        } else if self.failed > 0 {
            OrderStatus::Failed
        } else if self.in_progress > 0 {
            OrderStatus::Processing
        } else {
            OrderStatus::Incomplete
        }
    }
}

/// Read-only recomputation of an order status from stored item statuses.
///
/// Any failed item wins; otherwise any pending item keeps the order
/// processing; an order whose items are all processed is processed; anything
/// else is incomplete.
pub fn refresh_status(statuses: &[OrderItemStatus]) -> OrderStatus {
    let mut processed = 0;
    let mut in_progress = 0;
    let mut failed = 0;
    for status in statuses {
        match status {
            OrderItemStatus::Processed => processed += 1,
            OrderItemStatus::Pending => in_progress += 1,
            OrderItemStatus::Failed => failed += 1,
            _ => {}
        }
    }
    if failed > 0 {
        OrderStatus::Failed
    } else if in_progress > 0 {
        OrderStatus::Processing
    } else if processed == statuses.len() {
        OrderStatus::Processed
    } else {
        OrderStatus::Incomplete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use OrderItemStatus::*;

    fn tally_of(outcomes: &[OrderItemStatus]) -> ExecutionTally {
        let mut tally = ExecutionTally::new();
        for status in outcomes {
            tally.attempted();
            tally.observe(*status);
        }
        tally
    }

    #[test]
    fn all_processed_resolves_processed() {
        assert_eq!(tally_of(&[Processed, Processed]).resolve(), OrderStatus::Processed);
    }

    #[test]
    fn empty_pass_resolves_incomplete() {
        assert_eq!(ExecutionTally::new().resolve(), OrderStatus::Incomplete);
    }

    #[test]
    fn failure_dominates_pending_and_processed() {
        assert_eq!(
            tally_of(&[Processed, Failed, Pending]).resolve(),
            OrderStatus::Failed
        );
    }

    #[test]
    fn pending_without_failure_resolves_processing() {
        assert_eq!(
            tally_of(&[Processed, Pending]).resolve(),
            OrderStatus::Processing
        );
    }

    #[test]
    fn unresolved_items_resolve_incomplete() {
        // An attempted item that ended neither processed/pending/failed
        // (e.g. still executing after a timeout) leaves the order incomplete.
        assert_eq!(tally_of(&[Executing]).resolve(), OrderStatus::Incomplete);
    }

    #[test]
    fn refresh_priority_failed_then_pending_then_processed() {
        assert_eq!(refresh_status(&[Processed, Failed]), OrderStatus::Failed);
        assert_eq!(refresh_status(&[Processed, Pending]), OrderStatus::Processing);
        assert_eq!(refresh_status(&[Processed, Processed]), OrderStatus::Processed);
        assert_eq!(refresh_status(&[Processed, Started]), OrderStatus::Incomplete);
        assert_eq!(refresh_status(&[Blocked]), OrderStatus::Incomplete);
    }

    fn arb_status() -> impl Strategy<Value = OrderItemStatus> {
        prop_oneof![
            Just(Started),
            Just(Executing),
            Just(Pending),
            Just(Blocked),
            Just(Processed),
            Just(Failed),
        ]
    }

    proptest! {
        /// Property: the pass rule is a pure function of the outcome
        /// multiset — item order never changes the result.
        #[test]
        fn pass_rule_is_order_independent(
            mut outcomes in prop::collection::vec(arb_status(), 0..12),
            seed in any::<u64>(),
        ) {
            let baseline = tally_of(&outcomes).resolve();
            // Cheap deterministic shuffle.
            let len = outcomes.len();
            for i in 0..len {
                let j = (seed as usize).wrapping_mul(31).wrapping_add(i * 7) % len.max(1);
                outcomes.swap(i, j);
            }
            prop_assert_eq!(tally_of(&outcomes).resolve(), baseline);
        }

        /// Property: refresh never reports Processed unless every item is
        /// processed, and never loses a failure.
        #[test]
        fn refresh_rule_respects_priorities(
            statuses in prop::collection::vec(arb_status(), 1..12),
        ) {
            let result = refresh_status(&statuses);
            if statuses.iter().any(|s| *s == Failed) {
                prop_assert_eq!(result, OrderStatus::Failed);
            } else if statuses.iter().any(|s| *s == Pending) {
                prop_assert_eq!(result, OrderStatus::Processing);
            } else if statuses.iter().all(|s| *s == Processed) {
                prop_assert_eq!(result, OrderStatus::Processed);
            } else {
                prop_assert_eq!(result, OrderStatus::Incomplete);
            }
        }
    }
}
