//! Per-user points ledger with oldest-first deduction.
//!
//! A [`Ledger`] keeps three views of one user's points:
//!
//! - every open [`PointEvent`] ordered by its [`OrderKey`],
//! - one running total per payer (a degenerate event whose key is the
//!   payer's earliest order key, see [`PointEvent::merge`]),
//! - the user's overall total.
//!
//! # Concurrency
//!
//! All three views sit behind a single [`Mutex`]. Every public operation
//! takes the lock once and runs to completion, so readers never observe the
//! totals and the ordered events out of step. The lock is never held across
//! an `.await`.
//!
//! # Failure model
//!
//! Every rejection is detected before the state is touched. Deductions are
//! planned against an immutable view first and only applied once the plan is
//! known to cover the full amount.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{DeductionScope, LedgerError, OrderKey, PointEvent};

#[derive(Debug, Default)]
struct LedgerState {
    events: BTreeMap<OrderKey, PointEvent>,
    payer_totals: HashMap<String, PointEvent>,
    user_total: i64,
}

/// Outcome of walking the ordered events for a deduction, before anything
/// is mutated.
#[derive(Debug, Default)]
struct DeductionPlan {
    /// Negated slices taken from each consumed event, oldest first.
    removed: Vec<PointEvent>,
    /// Keys of every event the plan touches.
    consumed: Vec<OrderKey>,
    /// Unspent part of the last partially consumed event.
    remainder: Option<PointEvent>,
    /// Points the plan could not find.
    shortfall: i64,
}

/// Points ledger of a single user.
#[derive(Debug)]
pub struct Ledger {
    user: String,
    state: Mutex<LedgerState>,
}

impl Ledger {
    /// Creates an empty ledger for `user`.
    #[must_use]
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Identifier of the user owning this ledger.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    // State is only written after every check has passed, so a panic while
    // holding the lock cannot leave it torn.
    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a point event.
    ///
    /// - zero points: ignored.
    /// - positive points: stored and credited to the payer and the user.
    /// - negative points: deducts `|points|` from that payer's events,
    ///   oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidDeduction`] when a negative event would
    /// drive the payer or the user below zero, and
    /// [`LedgerError::BalanceOverflow`] when a credit would overflow a total.
    /// The ledger is unchanged on error.
    pub fn add_points(&self, event: PointEvent) -> Result<(), LedgerError> {
        let points = event.points();
        if points == 0 {
            tracing::debug!(user = %self.user, payer = event.payer(), "ignoring zero-point event");
            return Ok(());
        }

        let mut state = self.state();

        if points > 0 {
            return self.credit(&mut state, event);
        }

        let amount = points.saturating_neg();
        let payer_total = state
            .payer_totals
            .get(event.payer())
            .map_or(0, PointEvent::points);
        if state.user_total + points < 0 || payer_total + points < 0 {
            let err = LedgerError::InvalidDeduction {
                scope: DeductionScope::Payer,
                user: self.user.clone(),
                payer: Some(event.payer().to_string()),
                amount,
            };
            tracing::warn!(user = %self.user, payer = event.payer(), points, "{err}");
            return Err(err);
        }

        let removed = self.deduct(&mut state, Some(event.payer()), amount)?;
        tracing::info!(
            user = %self.user,
            payer = event.payer(),
            points,
            slices = removed.len(),
            "deducted payer points"
        );
        Ok(())
    }

    /// Spends `amount` points drawn from the oldest events of any payer.
    ///
    /// Returns the negated slices taken from each event, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NonPositiveDeduction`] if `amount < 1` and
    /// [`LedgerError::InvalidDeduction`] if the user holds fewer than
    /// `amount` points. The ledger is unchanged on error.
    pub fn deduct_points(&self, amount: i64) -> Result<Vec<PointEvent>, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::NonPositiveDeduction(amount));
        }

        let mut state = self.state();
        if state.user_total - amount < 0 {
            let err = LedgerError::InvalidDeduction {
                scope: DeductionScope::User,
                user: self.user.clone(),
                payer: None,
                amount,
            };
            tracing::warn!(user = %self.user, amount, "{err}");
            return Err(err);
        }

        let removed = self.deduct(&mut state, None, amount)?;
        tracing::info!(user = %self.user, amount, slices = removed.len(), "deducted user points");
        Ok(removed)
    }

    /// Current total of every payer ever credited, ordered by each payer's
    /// earliest order key.
    ///
    /// Payers whose points were fully spent still appear with `0`.
    #[must_use]
    pub fn balances(&self) -> Vec<PointEvent> {
        let state = self.state();
        let mut totals: Vec<PointEvent> = state.payer_totals.values().cloned().collect();
        drop(state);
        totals.sort();
        totals
    }

    /// Current total of the user across all payers.
    #[must_use]
    pub fn user_total(&self) -> i64 {
        self.state().user_total
    }

    /// Open events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<PointEvent> {
        self.state().events.values().cloned().collect()
    }

    /// Number of open events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.state().events.len()
    }

    fn credit(&self, state: &mut LedgerState, event: PointEvent) -> Result<(), LedgerError> {
        let overflow = || LedgerError::BalanceOverflow {
            user: self.user.clone(),
            payer: event.payer().to_string(),
        };
        let user_total = state
            .user_total
            .checked_add(event.points())
            .ok_or_else(overflow)?;
        let payer_total = match state.payer_totals.get(event.payer()) {
            Some(total) => {
                if total.points().checked_add(event.points()).is_none() {
                    return Err(overflow());
                }
                total.merge(&event)?
            }
            None => event.clone(),
        };
        if state.events.contains_key(event.order_key()) {
            return Err(LedgerError::Inconsistent(format!(
                "order key {} is already taken",
                event.order_key()
            )));
        }

        tracing::info!(
            user = %self.user,
            payer = event.payer(),
            points = event.points(),
            key = %event.order_key(),
            "added points"
        );
        state.user_total = user_total;
        state
            .payer_totals
            .insert(event.payer().to_string(), payer_total);
        state.events.insert(*event.order_key(), event);
        Ok(())
    }

    /// Removes `amount` points from the oldest matching events.
    ///
    /// Callers must have verified that the relevant totals cover `amount`.
    fn deduct(
        &self,
        state: &mut LedgerState,
        payer: Option<&str>,
        amount: i64,
    ) -> Result<Vec<PointEvent>, LedgerError> {
        let plan = plan_deduction(state, payer, amount);
        if plan.shortfall > 0 {
            let err = LedgerError::Inconsistent(format!(
                "user `{}` totals promised {amount} points but events only held {}",
                self.user,
                amount - plan.shortfall
            ));
            tracing::error!(user = %self.user, ?payer, amount, "{err}");
            return Err(err);
        }
        if let Some(missing) = plan
            .removed
            .iter()
            .find(|slice| !state.payer_totals.contains_key(slice.payer()))
        {
            let err = LedgerError::Inconsistent(format!(
                "payer `{}` has events but no running total",
                missing.payer()
            ));
            tracing::error!(user = %self.user, "{err}");
            return Err(err);
        }

        for key in &plan.consumed {
            state.events.remove(key);
        }
        for slice in &plan.removed {
            if let Some(total) = state.payer_totals.get_mut(slice.payer()) {
                *total = total.with_points(total.points() + slice.points());
            }
        }
        if let Some(remainder) = plan.remainder {
            state.events.insert(*remainder.order_key(), remainder);
        }
        state.user_total -= amount;

        Ok(plan.removed)
    }
}

/// Walks the events oldest first and decides which slices cover `amount`.
fn plan_deduction(state: &LedgerState, payer: Option<&str>, amount: i64) -> DeductionPlan {
    let mut plan = DeductionPlan::default();
    let mut remaining = amount;

    let candidates = state
        .events
        .values()
        .filter(|event| payer.is_none_or(|p| event.payer() == p));
    for event in candidates {
        if remaining == 0 {
            break;
        }
        plan.consumed.push(*event.order_key());
        if event.points() <= remaining {
            plan.removed.push(event.with_points(-event.points()));
            remaining -= event.points();
        } else {
            plan.removed.push(event.with_points(-remaining));
            plan.remainder = Some(event.with_points(event.points() - remaining));
            remaining = 0;
        }
    }

    plan.shortfall = remaining;
    plan
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;

    fn at(payer: &str, points: i64, millis: i64) -> PointEvent {
        PointEvent::new(payer, points, OrderKey::new(millis, 0, uuid::Uuid::new_v4()))
    }

    fn pairs(events: &[PointEvent]) -> Vec<(&str, i64)> {
        events.iter().map(|e| (e.payer(), e.points())).collect()
    }

    fn assert_consistent(ledger: &Ledger) {
        let total = ledger.user_total();
        let by_payer: i64 = ledger.balances().iter().map(PointEvent::points).sum();
        let by_event: i64 = ledger.events().iter().map(PointEvent::points).sum();
        assert_eq!(total, by_payer);
        assert_eq!(total, by_event);
        assert!(total >= 0);
        assert!(ledger.balances().iter().all(|b| b.points() >= 0));
        assert!(ledger.events().iter().all(|e| e.points() > 0));
    }

    fn add(ledger: &Ledger, event: PointEvent) {
        if let Err(err) = ledger.add_points(event) {
            panic!("add_points failed: {err}");
        }
    }

    #[test]
    fn canonical_scenario() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("DANNON", 300, 0));
        add(&ledger, at("UNILEVER", 200, 1));
        add(&ledger, at("DANNON", -200, 2));
        add(&ledger, at("MILLER COORS", 10_000, 3));
        add(&ledger, at("DANNON", 1000, 4));

        assert_eq!(
            pairs(&ledger.balances()),
            vec![("DANNON", 1100), ("UNILEVER", 200), ("MILLER COORS", 10_000)]
        );
        assert_eq!(ledger.user_total(), 11_300);

        let Ok(removed) = ledger.deduct_points(5000) else {
            panic!("deduction should succeed");
        };
        assert_eq!(
            pairs(&removed),
            vec![("DANNON", -100), ("UNILEVER", -200), ("MILLER COORS", -4700)]
        );
        assert_eq!(
            pairs(&ledger.balances()),
            vec![("DANNON", 1000), ("UNILEVER", 0), ("MILLER COORS", 5300)]
        );
        assert_consistent(&ledger);
    }

    #[test]
    fn negative_points_on_empty_ledger_are_rejected() {
        let ledger = Ledger::new("bob");
        let result = ledger.add_points(at("A", -100, 1));
        assert_eq!(
            result,
            Err(LedgerError::InvalidDeduction {
                scope: DeductionScope::Payer,
                user: "bob".to_string(),
                payer: Some("A".to_string()),
                amount: 100,
            })
        );
        assert!(ledger.balances().is_empty());
        assert_eq!(ledger.user_total(), 0);
        assert_eq!(ledger.event_count(), 0);
    }

    #[test]
    fn negative_points_beyond_payer_total_are_rejected() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("A", 100, 1));
        add(&ledger, at("B", 500, 2));

        let result = ledger.add_points(at("A", -101, 3));
        assert!(matches!(
            result,
            Err(LedgerError::InvalidDeduction {
                scope: DeductionScope::Payer,
                ..
            })
        ));
        assert_eq!(pairs(&ledger.balances()), vec![("A", 100), ("B", 500)]);
    }

    #[test]
    fn user_deduction_beyond_total_is_rejected() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("A", 1, 1));
        add(&ledger, at("A", 2, 2));
        add(&ledger, at("A", 3, 3));

        let result = ledger.deduct_points(7);
        assert_eq!(
            result,
            Err(LedgerError::InvalidDeduction {
                scope: DeductionScope::User,
                user: "bob".to_string(),
                payer: None,
                amount: 7,
            })
        );
        assert_eq!(pairs(&ledger.balances()), vec![("A", 6)]);
        assert_eq!(ledger.event_count(), 3);
    }

    #[test]
    fn non_positive_deduction_is_rejected() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("A", 10, 1));
        assert_eq!(
            ledger.deduct_points(0),
            Err(LedgerError::NonPositiveDeduction(0))
        );
        assert_eq!(
            ledger.deduct_points(-1),
            Err(LedgerError::NonPositiveDeduction(-1))
        );
        assert_eq!(ledger.user_total(), 10);
    }

    #[test]
    fn remainder_keeps_original_order_key() {
        let ledger = Ledger::new("bob");
        let t3 = at("A", 30, 3);
        let t3_key = *t3.order_key();
        add(&ledger, t3);
        add(&ledger, at("A", 10, 1));
        add(&ledger, at("A", 20, 2));

        let Ok(removed) = ledger.deduct_points(35) else {
            panic!("deduction should succeed");
        };
        assert_eq!(pairs(&removed), vec![("A", -10), ("A", -20), ("A", -5)]);
        assert_eq!(*removed[2].order_key(), t3_key);

        let events = ledger.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].points(), 25);
        assert_eq!(*events[0].order_key(), t3_key);

        // A newer event must still be consumed after the remainder.
        add(&ledger, at("B", 5, 4));
        let Ok(removed) = ledger.deduct_points(26) else {
            panic!("deduction should succeed");
        };
        assert_eq!(pairs(&removed), vec![("A", -25), ("B", -1)]);
        assert_consistent(&ledger);
    }

    #[test]
    fn zero_points_change_nothing() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("A", 0, 1));
        assert!(ledger.balances().is_empty());
        assert_eq!(ledger.event_count(), 0);

        add(&ledger, at("A", 5, 2));
        add(&ledger, at("B", 0, 0));
        assert_eq!(pairs(&ledger.balances()), vec![("A", 5)]);
        assert_eq!(ledger.event_count(), 1);
    }

    #[test]
    fn payer_scoped_deduction_skips_other_payers() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("B", 50, 1));
        add(&ledger, at("A", 30, 2));
        add(&ledger, at("A", 40, 3));

        add(&ledger, at("A", -50, 4));
        let events = ledger.events();
        assert_eq!(pairs(&events), vec![("B", 50), ("A", 20)]);
        assert_eq!(events[1].order_key().epoch_millis(), 3);
        assert_eq!(pairs(&ledger.balances()), vec![("B", 50), ("A", 20)]);
        assert_eq!(ledger.user_total(), 70);
    }

    #[test]
    fn user_deduction_may_draw_unevenly_across_payers() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("A", 10, 1));
        add(&ledger, at("B", 100, 2));

        // More than A alone holds; the user total is what matters.
        let Ok(removed) = ledger.deduct_points(60) else {
            panic!("deduction should succeed");
        };
        assert_eq!(pairs(&removed), vec![("A", -10), ("B", -50)]);
        assert_eq!(pairs(&ledger.balances()), vec![("A", 0), ("B", 50)]);
    }

    #[test]
    fn exact_deduction_leaves_no_remainder() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("A", 10, 1));
        add(&ledger, at("B", 20, 2));
        let Ok(removed) = ledger.deduct_points(30) else {
            panic!("deduction should succeed");
        };
        assert_eq!(pairs(&removed), vec![("A", -10), ("B", -20)]);
        assert_eq!(ledger.event_count(), 0);
        assert_eq!(ledger.user_total(), 0);
        assert_consistent(&ledger);
    }

    #[test]
    fn fifo_is_independent_of_insertion_order() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("A", 30, 30));
        add(&ledger, at("C", 100, -1_000));
        add(&ledger, at("B", 3, 31));
        add(&ledger, at("A", 10, 10));
        add(&ledger, at("B", 1, 11));
        add(&ledger, at("A", 20, 20));
        add(&ledger, at("B", 2, 21));

        assert_eq!(
            pairs(&ledger.balances()),
            vec![("C", 100), ("A", 60), ("B", 6)]
        );
        let Ok(removed) = ledger.deduct_points(166) else {
            panic!("deduction should succeed");
        };
        assert_eq!(
            pairs(&removed),
            vec![
                ("C", -100),
                ("A", -10),
                ("B", -1),
                ("A", -20),
                ("B", -2),
                ("A", -30),
                ("B", -3),
            ]
        );
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("A", i64::MAX, 1));
        let result = ledger.add_points(at("B", 1, 2));
        assert_eq!(
            result,
            Err(LedgerError::BalanceOverflow {
                user: "bob".to_string(),
                payer: "B".to_string(),
            })
        );
        assert_eq!(pairs(&ledger.balances()), vec![("A", i64::MAX)]);
    }

    #[test]
    fn most_negative_points_are_rejected() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("A", 10, 1));
        let result = ledger.add_points(at("A", i64::MIN, 2));
        assert!(matches!(
            result,
            Err(LedgerError::InvalidDeduction { .. })
        ));
        assert_eq!(ledger.user_total(), 10);
    }

    #[test]
    fn duplicate_order_key_is_rejected() {
        let ledger = Ledger::new("bob");
        let key = OrderKey::new(1, 0, uuid::Uuid::nil());
        add(&ledger, PointEvent::new("A", 10, key));
        let result = ledger.add_points(PointEvent::new("A", 5, key));
        assert!(matches!(result, Err(LedgerError::Inconsistent(_))));
        assert_eq!(ledger.user_total(), 10);
        assert_consistent(&ledger);
    }

    fn snapshot(ledger: &Ledger) -> (Vec<(String, i64, OrderKey)>, Vec<(String, i64)>, i64) {
        let events = ledger
            .events()
            .iter()
            .map(|e| (e.payer().to_string(), e.points(), *e.order_key()))
            .collect();
        let balances = ledger
            .balances()
            .iter()
            .map(|b| (b.payer().to_string(), b.points()))
            .collect();
        (events, balances, ledger.user_total())
    }

    #[test]
    fn totals_exceeding_events_fail_without_mutation() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("A", 10, 1));
        add(&ledger, at("B", 5, 2));
        {
            let mut state = ledger.state();
            state.user_total = 50;
            if let Some(total) = state.payer_totals.get_mut("A") {
                *total = total.with_points(45);
            }
        }
        let before = snapshot(&ledger);

        // The totals allow 30, but the events only hold 15.
        let result = ledger.deduct_points(30);
        assert!(matches!(result, Err(LedgerError::Inconsistent(_))));
        assert_eq!(snapshot(&ledger), before);

        let result = ledger.add_points(at("A", -20, 3));
        assert!(matches!(result, Err(LedgerError::Inconsistent(_))));
        assert_eq!(snapshot(&ledger), before);
    }

    #[test]
    fn events_without_payer_total_fail_without_mutation() {
        let ledger = Ledger::new("bob");
        add(&ledger, at("A", 10, 1));
        add(&ledger, at("B", 20, 2));
        let dropped = ledger.state().payer_totals.remove("A");
        assert!(dropped.is_some());
        let before = snapshot(&ledger);

        let result = ledger.deduct_points(5);
        assert!(matches!(result, Err(LedgerError::Inconsistent(_))));
        assert_eq!(snapshot(&ledger), before);
        assert_eq!(ledger.event_count(), 2);
    }

    #[test]
    fn concurrent_additions_sum_exactly() {
        let ledger = Arc::new(Ledger::new("bob"));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let payer = if worker % 2 == 0 { "EVEN" } else { "ODD" };
                        let _ = ledger.add_points(PointEvent::new(payer, 1, OrderKey::now()));
                        if i % 10 == 0 {
                            let _ = ledger.deduct_points(1);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            let _ = handle.join();
        }
        assert_eq!(ledger.user_total(), 800 - 80);
        assert_consistent(&ledger);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add { payer: usize, points: i64, millis: i64 },
        Deduct(i64),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..3, -200i64..500, 0i64..50)
                .prop_map(|(payer, points, millis)| Op::Add { payer, points, millis }),
            (1i64..400).prop_map(Op::Deduct),
        ]
    }

    proptest! {
        #[test]
        fn totals_agree_and_never_go_negative(ops in prop::collection::vec(arb_op(), 1..60)) {
            const PAYERS: [&str; 3] = ["A", "B", "C"];
            let ledger = Ledger::new("prop");
            for op in ops {
                let before = ledger.user_total();
                match op {
                    Op::Add { payer, points, millis } => {
                        let name = PAYERS.get(payer).copied().unwrap_or("A");
                        match ledger.add_points(at(name, points, millis)) {
                            Ok(()) => prop_assert_eq!(ledger.user_total(), before + points),
                            Err(_) => prop_assert_eq!(ledger.user_total(), before),
                        }
                    }
                    Op::Deduct(amount) => match ledger.deduct_points(amount) {
                        Ok(removed) => {
                            let taken: i64 = removed.iter().map(PointEvent::points).sum();
                            prop_assert_eq!(taken, -amount);
                            prop_assert!(removed.windows(2).all(|w| w[0] < w[1]));
                            prop_assert_eq!(ledger.user_total(), before - amount);
                        }
                        Err(_) => {
                            prop_assert!(amount > before);
                            prop_assert_eq!(ledger.user_total(), before);
                        }
                    },
                }

                let total = ledger.user_total();
                let by_payer: i64 = ledger.balances().iter().map(PointEvent::points).sum();
                let by_event: i64 = ledger.events().iter().map(PointEvent::points).sum();
                prop_assert_eq!(total, by_payer);
                prop_assert_eq!(total, by_event);
                prop_assert!(total >= 0);
                prop_assert!(ledger.balances().iter().all(|b| b.points() >= 0));
            }
        }

        #[test]
        fn deduction_consumes_oldest_events_first(
            amounts in prop::collection::vec(1i64..100, 1..20),
            take in 1i64..500,
        ) {
            let ledger = Ledger::new("prop");
            // Insert newest first so insertion order is the reverse of time order.
            for (i, points) in amounts.iter().enumerate().rev() {
                #[allow(clippy::cast_possible_wrap)]
                let millis = i as i64;
                let _ = ledger.add_points(at("A", *points, millis));
            }
            let total: i64 = amounts.iter().sum();
            let take = take.min(total);
            let before = ledger.events();
            let Ok(removed) = ledger.deduct_points(take) else {
                return Err(TestCaseError::fail("deduction within total must succeed"));
            };
            prop_assert!(removed.len() <= before.len());
            for (slice, original) in removed.iter().zip(before.iter()) {
                prop_assert_eq!(slice.order_key(), original.order_key());
            }
            if let Some((last, prefix)) = removed.split_last() {
                for (slice, original) in prefix.iter().zip(before.iter()) {
                    prop_assert_eq!(slice.points(), -original.points());
                }
                prop_assert!(-last.points() <= before[prefix.len()].points());
            }
        }
    }
}
