
use num::{One, Zero};
use num::pow::Pow;
use num::rational::Rational32;

use std::collections::BTreeMap;
use std::fmt::{self, Formatter, Display};
use std::ops::{Mul, Div};

/// An independent physical quantity axis, such as length or mass.
/// Base dimensions are opaque handles created by
/// [`UnitSystem::new_dimension`](crate::units::system::UnitSystem::new_dimension)
/// and are only meaningful relative to the system that created them.
///
/// The ordering on base dimensions is their registration order, which
/// doubles as the canonical factor order in formatted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BaseDimension(pub(crate) usize);

/// A dimension is a formal product and quotient of zero or more
/// [`BaseDimension`] values, each raised to a rational power. Zero
/// powers are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dimension {
  powers: BTreeMap<BaseDimension, Rational32>,
}

impl Dimension {
  pub fn singleton(base: BaseDimension) -> Self {
    let mut powers = BTreeMap::new();
    powers.insert(base, Rational32::one());
    Self { powers }
  }

  /// The power of the given base dimension, zero if absent.
  pub fn get(&self, base: BaseDimension) -> Rational32 {
    self.powers.get(&base).copied().unwrap_or_else(Rational32::zero)
  }

  /// A simple dimension consists of exactly one base dimension raised
  /// to the power one.
  pub fn is_simple(&self) -> bool {
    self.powers.len() == 1 && self.powers.values().all(|p| p.is_one())
  }

  /// Nonzero components in registration order.
  pub fn components(&self) -> impl Iterator<Item = (BaseDimension, Rational32)> + '_ {
    self.powers.iter().map(|(base, power)| (*base, *power))
  }

  /// Largest absolute numerator or denominator appearing among the
  /// powers. Used to enforce the exponent ceiling.
  pub fn max_power_magnitude(&self) -> i32 {
    self.powers.values()
      .map(|p| p.numer().abs().max(p.denom().abs()))
      .max()
      .unwrap_or(0)
  }

  fn insert_nonzero(&mut self, base: BaseDimension, power: Rational32) {
    if power.is_zero() {
      self.powers.remove(&base);
    } else {
      self.powers.insert(base, power);
    }
  }
}

impl From<BaseDimension> for Dimension {
  fn from(base: BaseDimension) -> Self {
    Dimension::singleton(base)
  }
}

impl Pow<Rational32> for &Dimension {
  type Output = Dimension;

  fn pow(self, power: Rational32) -> Dimension {
    let mut result = Dimension::one();
    for (base, p) in self.components() {
      result.insert_nonzero(base, p * power);
    }
    result
  }
}

impl Pow<i32> for &Dimension {
  type Output = Dimension;

  fn pow(self, power: i32) -> Dimension {
    self.pow(Rational32::from_integer(power))
  }
}

impl Mul for Dimension {
  type Output = Self;

  fn mul(self, rhs: Self) -> Self {
    let mut result = self;
    for (base, power) in rhs.components() {
      let sum = result.get(base) + power;
      result.insert_nonzero(base, sum);
    }
    result
  }
}

impl Div for Dimension {
  type Output = Self;

  fn div(self, rhs: Self) -> Self {
    let mut result = self;
    for (base, power) in rhs.components() {
      let diff = result.get(base) - power;
      result.insert_nonzero(base, diff);
    }
    result
  }
}

impl One for Dimension {
  fn one() -> Self {
    Self { powers: BTreeMap::new() }
  }

  fn is_one(&self) -> bool {
    self.powers.is_empty()
  }
}

impl Display for Dimension {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    if self.is_one() {
      return write!(f, "1");
    }
    let mut first = true;
    for (base, power) in self.components() {
      if !first {
        write!(f, " ")?;
      }
      first = false;
      if power.is_one() {
        write!(f, "dim{}", base.0)?;
      } else {
        write!(f, "dim{}^{}", base.0, power)?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dim(index: usize) -> BaseDimension {
    BaseDimension(index)
  }

  #[test]
  fn test_singleton() {
    let value = Dimension::singleton(dim(1));
    assert_eq!(value.get(dim(1)), Rational32::from_integer(1));
    assert_eq!(value.get(dim(0)), Rational32::from_integer(0));
    assert!(value.is_simple());
  }

  #[test]
  fn test_mul_sums_powers() {
    let a = Dimension::singleton(dim(0)) * Dimension::singleton(dim(0));
    assert_eq!(a.get(dim(0)), Rational32::from_integer(2));
    let b = a * Dimension::singleton(dim(1));
    assert_eq!(b.get(dim(0)), Rational32::from_integer(2));
    assert_eq!(b.get(dim(1)), Rational32::from_integer(1));
  }

  #[test]
  fn test_div_cancels_to_one() {
    let a = Dimension::singleton(dim(0)) * Dimension::singleton(dim(1));
    let b = a.clone() / a;
    assert!(b.is_one());
  }

  #[test]
  fn test_zero_powers_are_dropped() {
    let a = Dimension::singleton(dim(2)) / Dimension::singleton(dim(2));
    assert_eq!(a.components().count(), 0);
  }

  #[test]
  fn test_pow() {
    let a = (&Dimension::singleton(dim(0))).pow(3);
    assert_eq!(a.get(dim(0)), Rational32::from_integer(3));
    let b = (&a).pow(-2);
    assert_eq!(b.get(dim(0)), Rational32::from_integer(-6));
    let c = (&a).pow(0);
    assert!(c.is_one());
  }

  #[test]
  fn test_pow_rational() {
    let a = (&Dimension::singleton(dim(0))).pow(Rational32::new(1, 2));
    assert_eq!(a.get(dim(0)), Rational32::new(1, 2));
    let b = (&a).pow(2);
    assert!(b.is_simple());
  }

  #[test]
  fn test_components_in_registration_order() {
    let a = Dimension::singleton(dim(3)) * Dimension::singleton(dim(1)) * Dimension::singleton(dim(2));
    let order: Vec<usize> = a.components().map(|(base, _)| base.0).collect();
    assert_eq!(order, vec![1, 2, 3]);
  }

  #[test]
  fn test_max_power_magnitude() {
    assert_eq!(Dimension::one().max_power_magnitude(), 0);
    let a = (&Dimension::singleton(dim(0))).pow(-7) * Dimension::singleton(dim(1));
    assert_eq!(a.max_power_magnitude(), 7);
  }

  #[test]
  fn test_is_simple() {
    assert!(!Dimension::one().is_simple());
    assert!(Dimension::singleton(dim(0)).is_simple());
    assert!(!(&Dimension::singleton(dim(0))).pow(2).is_simple());
    assert!(!(Dimension::singleton(dim(0)) * Dimension::singleton(dim(1))).is_simple());
  }
}
