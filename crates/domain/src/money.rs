//! Monetary amounts.

use serde::{Deserialize, Serialize};

/// An amount of money in integer minor units.
///
/// The currency lives on the owning aggregate (a wallet's currency tag);
/// `Money` itself is just a signed count so arithmetic never rounds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from minor units.
    pub const fn from_minor(units: i64) -> Self {
        Self(units)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in minor units.
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns `None` when the result does not fit in an `i64`.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Sums the amounts, or `None` on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Money {
    fn from(units: i64) -> Self {
        Self(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(250);

        assert_eq!(a.checked_add(b), Some(Money::from_minor(1250)));
        assert_eq!(a.checked_sub(b), Some(Money::from_minor(750)));
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let max = Money::from_minor(i64::MAX);

        assert_eq!(max.checked_add(Money::from_minor(1)), None);
        assert_eq!(Money::from_minor(i64::MIN).checked_sub(Money::from_minor(1)), None);
        assert_eq!(Money::checked_sum([max, Money::from_minor(1)]), None);
    }

    #[test]
    fn sign_checks() {
        assert!(Money::from_minor(1).is_positive());
        assert!(!Money::zero().is_positive());
        assert!(Money::from_minor(-1).is_negative());
    }

    #[test]
    fn sums_items() {
        let total = Money::checked_sum([100, 250, 0].into_iter().map(Money::from_minor));
        assert_eq!(total, Some(Money::from_minor(350)));
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&Money::from_minor(150000)).unwrap();
        assert_eq!(json, "150000");
    }
}
