//! Profit allocator — splits the contracted daily target across legs.
//!
//! All profit arithmetic is exact integer cents: the daily target is
//! divided evenly with the remainder distributed one cent at a time, so
//! the legs always sum to the target exactly. Randomness never touches
//! these figures; it only flavors display prices in the universe.

use common::{Error, PlanTier, Result};

/// Hard cap on operations per run, bounding scheduler load.
pub const MAX_OPERATIONS: usize = 8;

pub struct ProfitAllocator;

impl ProfitAllocator {
    /// Contracted daily yield in cents: `capital × rate / 100`.
    pub fn daily_target_cents(capital_cents: i64, daily_rate_pct: f64) -> Result<i64> {
        if capital_cents < 0 {
            return Err(Error::InvalidAllocation(format!(
                "capital must be non-negative, got {}¢",
                capital_cents
            )));
        }
        if !daily_rate_pct.is_finite() || daily_rate_pct < 0.0 {
            return Err(Error::InvalidAllocation(format!(
                "daily rate must be non-negative, got {}",
                daily_rate_pct
            )));
        }
        Ok((capital_cents as f64 * daily_rate_pct / 100.0).round() as i64)
    }

    /// Split the daily target across `operation_count` legs.
    ///
    /// Violations are programming errors and fail fast before a run
    /// starts; they are never retried.
    pub fn allocate(
        capital_cents: i64,
        daily_rate_pct: f64,
        operation_count: usize,
    ) -> Result<Vec<i64>> {
        if operation_count == 0 || operation_count > MAX_OPERATIONS {
            return Err(Error::InvalidAllocation(format!(
                "operation count must be 1..={}, got {}",
                MAX_OPERATIONS, operation_count
            )));
        }
        let target = Self::daily_target_cents(capital_cents, daily_rate_pct)?;
        Ok(Self::split_exact(target, operation_count))
    }

    /// Profit for one cadence-gated single operation.
    ///
    /// The daily target is split across the day's `cap` slots with the
    /// same remainder rule, so `cap` accruals sum exactly to the target.
    /// `slot` is the 0-based index of the operation within the window.
    pub fn single_operation_profit(
        capital_cents: i64,
        daily_rate_pct: f64,
        cap: u32,
        slot: u32,
    ) -> Result<i64> {
        if cap == 0 {
            return Err(Error::InvalidAllocation(
                "daily operation cap must be at least 1".into(),
            ));
        }
        let target = Self::daily_target_cents(capital_cents, daily_rate_pct)?;
        let shares = Self::split_exact(target, cap as usize);
        let idx = (slot as usize).min(shares.len() - 1);
        Ok(shares[idx])
    }

    /// Operation count for a full run: tier base count boosted by the
    /// user's other concurrently active plans, capped at the hard max.
    pub fn operation_count(tier: PlanTier, other_active_plans: usize) -> usize {
        (tier.base_operation_count() + other_active_plans).min(MAX_OPERATIONS)
    }

    /// Even split with remainder cents distributed to the first legs.
    fn split_exact(total_cents: i64, parts: usize) -> Vec<i64> {
        let n = parts as i64;
        let base = total_cents / n;
        let remainder = total_cents % n;
        (0..n).map(|i| base + i64::from(i < remainder)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split_hundred_dollars_at_two_and_half_pct() {
        // capital=$100, rate=2.5%, 2 legs → $1.25 each, $2.50 total.
        let shares = ProfitAllocator::allocate(10_000, 2.5, 2).unwrap();
        assert_eq!(shares, vec![125, 125]);
        assert_eq!(shares.iter().sum::<i64>(), 250);
    }

    #[test]
    fn test_uneven_split_preserves_exact_sum() {
        let shares = ProfitAllocator::allocate(10_000, 2.5, 3).unwrap();
        assert_eq!(shares.iter().sum::<i64>(), 250);
        assert_eq!(shares, vec![84, 83, 83]);
    }

    #[test]
    fn test_sum_invariant_across_counts() {
        for count in 1..=MAX_OPERATIONS {
            let shares = ProfitAllocator::allocate(123_457, 1.9, count).unwrap();
            let target = ProfitAllocator::daily_target_cents(123_457, 1.9).unwrap();
            assert_eq!(
                shares.iter().sum::<i64>(),
                target,
                "allocation for {} legs must sum to the daily target",
                count
            );
            let max = shares.iter().max().unwrap();
            let min = shares.iter().min().unwrap();
            assert!(max - min <= 1, "split must be even within one cent");
        }
    }

    #[test]
    fn test_zero_capital_allocates_zero() {
        let shares = ProfitAllocator::allocate(0, 2.5, 4).unwrap();
        assert_eq!(shares, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_invalid_operation_count_fails_fast() {
        assert!(ProfitAllocator::allocate(10_000, 2.5, 0).is_err());
        assert!(ProfitAllocator::allocate(10_000, 2.5, MAX_OPERATIONS + 1).is_err());
    }

    #[test]
    fn test_negative_inputs_fail_fast() {
        assert!(ProfitAllocator::allocate(-1, 2.5, 2).is_err());
        assert!(ProfitAllocator::allocate(10_000, -0.1, 2).is_err());
        assert!(ProfitAllocator::allocate(10_000, f64::NAN, 2).is_err());
    }

    #[test]
    fn test_operation_count_boost_capped() {
        assert_eq!(ProfitAllocator::operation_count(PlanTier::Starter, 0), 2);
        assert_eq!(ProfitAllocator::operation_count(PlanTier::Growth, 1), 4);
        assert_eq!(ProfitAllocator::operation_count(PlanTier::Pro, 10), MAX_OPERATIONS);
    }

    #[test]
    fn test_single_operation_slots_sum_to_target() {
        // Half the daily rate per operation at cap=2.
        let first = ProfitAllocator::single_operation_profit(10_000, 2.5, 2, 0).unwrap();
        let second = ProfitAllocator::single_operation_profit(10_000, 2.5, 2, 1).unwrap();
        assert_eq!(first, 125);
        assert_eq!(second, 125);

        // Odd target: the first slot carries the extra cent.
        let a = ProfitAllocator::single_operation_profit(10_020, 2.505, 2, 0).unwrap();
        let b = ProfitAllocator::single_operation_profit(10_020, 2.505, 2, 1).unwrap();
        let target = ProfitAllocator::daily_target_cents(10_020, 2.505).unwrap();
        assert_eq!(a + b, target);
    }

    #[test]
    fn test_single_operation_zero_cap_fails_fast() {
        assert!(ProfitAllocator::single_operation_profit(10_000, 2.5, 0, 0).is_err());
    }
}
