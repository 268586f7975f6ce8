use num_traits::{CheckedAdd, CheckedSub};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Sub},
};

/// Unified precision monetary amount with precision 8.
///
/// Amounts are stored as the number of `10^-8` units, so the smallest
/// representable value is a hundred-millionth of the currency unit and all
/// arithmetic stays exact. Budget comparisons must never be subject to
/// floating point rounding.
#[derive(Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnifiedNum(u64);

impl UnifiedNum {
    pub const PRECISION: u8 = 8;
    /// The whole-unit multiplier, i.e. `10^PRECISION`.
    pub const MULTIPLIER: u64 = 100_000_000;
    pub const ZERO: UnifiedNum = UnifiedNum(0);

    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// A whole number of currency units, i.e. `from_whole(5)` is `5.00000000`.
    pub const fn from_whole(whole: u64) -> Self {
        Self(whole * Self::MULTIPLIER)
    }

    pub const fn to_u64(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Floored division by a plain integer, used e.g. for the per-impression
    /// price of a CPM rate (`cpm / 1000`).
    pub const fn div_floor(self, by: u64) -> Self {
        Self(self.0 / by)
    }

    /// Lossy conversion for percentages and reports, never for accounting.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::MULTIPLIER as f64
    }

    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl From<u64> for UnifiedNum {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for UnifiedNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut string_value = self.0.to_string();
        let value_length = string_value.len();
        let precision: usize = Self::PRECISION.into();

        if value_length > precision {
            string_value.insert(value_length - precision, '.');

            f.write_str(&string_value)
        } else {
            write!(f, "0.{:0>8}", string_value)
        }
    }
}

impl fmt::Debug for UnifiedNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnifiedNum({})", self)
    }
}

impl Add<UnifiedNum> for UnifiedNum {
    type Output = UnifiedNum;

    fn add(self, rhs: UnifiedNum) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Add<&UnifiedNum> for &UnifiedNum {
    type Output = UnifiedNum;

    fn add(self, rhs: &UnifiedNum) -> Self::Output {
        UnifiedNum(self.0 + rhs.0)
    }
}

impl AddAssign<UnifiedNum> for UnifiedNum {
    fn add_assign(&mut self, rhs: UnifiedNum) {
        self.0 += rhs.0
    }
}

impl Sub<UnifiedNum> for UnifiedNum {
    type Output = UnifiedNum;

    fn sub(self, rhs: UnifiedNum) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl CheckedAdd for UnifiedNum {
    fn checked_add(&self, v: &Self) -> Option<Self> {
        self.0.checked_add(v.0).map(Self)
    }
}

impl CheckedSub for UnifiedNum {
    fn checked_sub(&self, v: &Self) -> Option<Self> {
        self.0.checked_sub(v.0).map(Self)
    }
}

impl Sum<UnifiedNum> for UnifiedNum {
    fn sum<I: Iterator<Item = UnifiedNum>>(iter: I) -> Self {
        Self(iter.map(|unified| unified.0).sum())
    }
}

impl<'a> Sum<&'a UnifiedNum> for UnifiedNum {
    fn sum<I: Iterator<Item = &'a UnifiedNum>>(iter: I) -> Self {
        Self(iter.map(|unified| unified.0).sum())
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use super::UnifiedNum;
    use bytes::BytesMut;
    use postgres_types::{accepts, to_sql_checked, FromSql, IsNull, ToSql, Type};
    use std::error::Error;

    impl<'a> FromSql<'a> for UnifiedNum {
        fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
            let value = <i64 as FromSql>::from_sql(ty, raw)?;

            Ok(UnifiedNum(u64::try_from(value)?))
        }

        accepts!(INT8);
    }

    impl ToSql for UnifiedNum {
        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
            i64::try_from(self.0)?.to_sql(ty, w)
        }

        accepts!(INT8);
        to_sql_checked!();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unified_num_displays_correctly() {
        let one = UnifiedNum::from_u64(100_000_000);
        let zero_point_one = UnifiedNum::from_u64(10_000_000);
        let smallest_value = UnifiedNum::from_u64(1);
        let random_value = UnifiedNum::from_u64(144_903_000_567_000);

        assert_eq!("1.00000000", &one.to_string());
        assert_eq!("0.10000000", &zero_point_one.to_string());
        assert_eq!("0.00000001", &smallest_value.to_string());
        assert_eq!("1449030.00567000", &random_value.to_string());
    }

    #[test]
    fn from_whole_uses_the_precision_multiplier() {
        assert_eq!(UnifiedNum::from_u64(500_000_000), UnifiedNum::from_whole(5));
        assert_eq!("5.00000000", &UnifiedNum::from_whole(5).to_string());
    }

    #[test]
    fn checked_arithmetic() {
        let max = UnifiedNum::from_u64(u64::MAX);
        let one = UnifiedNum::from_u64(1);

        assert_eq!(None, max.checked_add(&one), "Should overflow");
        assert_eq!(None, one.checked_sub(&max), "Should underflow");
        assert_eq!(
            Some(UnifiedNum::from_u64(2)),
            one.checked_add(&one),
            "Should add"
        );
    }

    #[test]
    fn div_floor_for_cpm_pricing() {
        // $5 CPM -> $0.005 per single impression
        let cpm = UnifiedNum::from_whole(5);
        assert_eq!(UnifiedNum::from_u64(500_000), cpm.div_floor(1000));
        assert_eq!("0.00500000", &cpm.div_floor(1000).to_string());
    }
}
