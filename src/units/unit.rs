
use super::dimension::{BaseDimension, Dimension};

use approx::AbsDiffEq;
use num::One;
use num::pow::Pow;
use num::rational::Rational32;
use thiserror::Error;

/// Largest absolute value permitted for any numerator or denominator
/// of a dimension power. Expressions which would push a power past
/// this ceiling are rejected as exponent overflow.
pub const MAX_EXPONENT: i32 = 99;

/// A unit is a scaled, possibly offset, possibly logarithmic
/// combination of base dimension powers.
///
/// Units are immutable; every operation returns a new value. The
/// scale relates one of this unit to the canonical unit of its
/// dimension, and the offset (zero when absent) is an additive origin
/// expressed in canonical terms. Logarithmic units carry no
/// multiplicative structure of their own; they wrap a reference unit
/// and participate only in formatting and reference lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
  dimension: Dimension,
  scale: f64,
  offset: f64,
  log: Option<LogRef>,
}

/// The logarithmic part of a log unit: the base of the logarithm and
/// the reference unit the logarithm is taken against.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRef {
  pub base: LogBase,
  pub reference: Box<Unit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogBase {
  Two,
  E,
  Ten,
}

/// Errors produced by the unit algebra itself, as opposed to the
/// expression grammar. These correspond to physically meaningless
/// combinations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AlgebraError {
  #[error("shifted unit cannot be combined multiplicatively")]
  ShiftedOperand,
  #[error("logarithmic unit cannot be combined algebraically")]
  LogOperand,
  #[error("logarithmic reference cannot itself be logarithmic")]
  NestedLog,
  #[error("exponent magnitude exceeds the ceiling of {MAX_EXPONENT}")]
  ExponentOverflow,
  #[error("timestamp origin requires a unit of time")]
  NotTimeDimension,
}

impl Unit {
  pub fn new(dimension: Dimension, scale: f64) -> Self {
    Self { dimension, scale, offset: 0.0, log: None }
  }

  /// The canonical unit of a single base dimension.
  pub fn base(dimension: BaseDimension) -> Self {
    Self::new(Dimension::singleton(dimension), 1.0)
  }

  /// A dimensionless scalar, such as a bare number in an expression.
  pub fn scalar(value: f64) -> Self {
    Self::new(Dimension::one(), value)
  }

  /// The dimensionless unit "1".
  pub fn one() -> Self {
    Self::scalar(1.0)
  }

  pub fn is_one(&self) -> bool {
    self.dimension.is_one() && self.scale == 1.0 && self.offset == 0.0 && self.log.is_none()
  }

  pub fn dimension(&self) -> &Dimension {
    &self.dimension
  }

  pub fn scale(&self) -> f64 {
    self.scale
  }

  pub fn offset(&self) -> f64 {
    self.offset
  }

  pub fn log(&self) -> Option<&LogRef> {
    self.log.as_ref()
  }

  pub fn is_shifted(&self) -> bool {
    self.offset != 0.0
  }

  pub fn is_log(&self) -> bool {
    self.log.is_some()
  }

  /// A copy of this unit with the given additive origin, in canonical
  /// terms, replacing any existing origin. Used when building named
  /// units such as celsius from a database definition.
  pub fn with_offset(self, offset: f64) -> Self {
    Self { offset, ..self }
  }

  /// A copy of this unit with the scale multiplied by `factor`. Used
  /// by metric prefixes.
  pub fn scaled(self, factor: f64) -> Self {
    Self { scale: self.scale * factor, ..self }
  }

  pub fn multiply(&self, other: &Unit) -> Result<Unit, AlgebraError> {
    self.check_multiplicative()?;
    other.check_multiplicative()?;
    let result = Unit::new(
      self.dimension.clone() * other.dimension.clone(),
      self.scale * other.scale,
    );
    result.check_exponents()?;
    Ok(result)
  }

  pub fn divide(&self, other: &Unit) -> Result<Unit, AlgebraError> {
    self.multiply(&other.invert()?)
  }

  /// The reciprocal unit: all powers negated, scale reciprocated.
  pub fn invert(&self) -> Result<Unit, AlgebraError> {
    self.check_multiplicative()?;
    Ok(Unit::new((&self.dimension).pow(-1), self.scale.recip()))
  }

  /// Raises this unit to a rational power. Raising any valid unit to
  /// the zeroth power yields the dimensionless unit.
  pub fn pow(&self, power: Rational32) -> Result<Unit, AlgebraError> {
    use num::Zero;
    if power.is_zero() {
      return Ok(Unit::one());
    }
    self.check_multiplicative()?;
    let exponent = *power.numer() as f64 / *power.denom() as f64;
    let result = Unit::new((&self.dimension).pow(power), self.scale.powf(exponent));
    result.check_exponents()?;
    Ok(result)
  }

  /// Shifts the unit by an origin expressed in the unit's own scale.
  /// The origin composes onto any existing offset, so a unit defined
  /// with an offset (celsius) can still be anchored to a point on its
  /// own scale.
  pub fn shifted(&self, origin: f64) -> Result<Unit, AlgebraError> {
    if self.is_log() {
      return Err(AlgebraError::LogOperand);
    }
    Ok(self.clone().with_offset(self.offset + origin * self.scale))
  }

  /// Anchors a pure time unit to an absolute instant, in seconds
  /// relative to the Unix epoch. `time` names the time axis of the
  /// owning system.
  pub fn shifted_to_instant(&self, instant: f64, time: BaseDimension) -> Result<Unit, AlgebraError> {
    if self.is_log() {
      return Err(AlgebraError::LogOperand);
    }
    if self.dimension != Dimension::singleton(time) {
      return Err(AlgebraError::NotTimeDimension);
    }
    Ok(self.clone().with_offset(instant))
  }

  /// Wraps a reference unit as a logarithmic unit in the given base.
  pub fn log_ref(base: LogBase, reference: Unit) -> Result<Unit, AlgebraError> {
    if reference.is_log() {
      return Err(AlgebraError::NestedLog);
    }
    if reference.is_shifted() {
      return Err(AlgebraError::ShiftedOperand);
    }
    Ok(Unit {
      dimension: reference.dimension.clone(),
      scale: 1.0,
      offset: 0.0,
      log: Some(LogRef { base, reference: Box::new(reference) }),
    })
  }

  fn check_multiplicative(&self) -> Result<(), AlgebraError> {
    if self.is_shifted() {
      Err(AlgebraError::ShiftedOperand)
    } else if self.is_log() {
      Err(AlgebraError::LogOperand)
    } else {
      Ok(())
    }
  }

  fn check_exponents(&self) -> Result<(), AlgebraError> {
    if self.dimension.max_power_magnitude() > MAX_EXPONENT {
      Err(AlgebraError::ExponentOverflow)
    } else {
      Ok(())
    }
  }
}

impl LogBase {
  pub fn value(self) -> f64 {
    match self {
      LogBase::Two => 2.0,
      LogBase::E => std::f64::consts::E,
      LogBase::Ten => 10.0,
    }
  }

  /// The function-name spelling used in the expression grammar.
  pub fn tag(self) -> &'static str {
    match self {
      LogBase::Two => "lb",
      LogBase::E => "ln",
      LogBase::Ten => "lg",
    }
  }
}

impl AbsDiffEq for Unit {
  type Epsilon = f64;

  fn default_epsilon() -> f64 {
    f64::default_epsilon()
  }

  fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
    self.dimension == other.dimension
      && self.scale.abs_diff_eq(&other.scale, epsilon)
      && self.offset.abs_diff_eq(&other.offset, epsilon)
      && match (&self.log, &other.log) {
        (None, None) => true,
        (Some(a), Some(b)) => a.base == b.base && a.reference.abs_diff_eq(&b.reference, epsilon),
        _ => false,
      }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_abs_diff_eq;

  fn length() -> BaseDimension {
    BaseDimension(0)
  }

  fn time() -> BaseDimension {
    BaseDimension(1)
  }

  fn meter() -> Unit {
    Unit::base(length())
  }

  fn second() -> Unit {
    Unit::base(time())
  }

  #[test]
  fn test_multiply_divide_round_trip() {
    let a = Unit::new(Dimension::singleton(length()), 2.5);
    let b = Unit::new(Dimension::singleton(time()), 60.0);
    let product = a.multiply(&b).unwrap();
    let back = product.divide(&b).unwrap();
    assert_abs_diff_eq!(back, a, epsilon = 1e-12);
  }

  #[test]
  fn test_divide_negates_powers() {
    let speed = meter().divide(&second()).unwrap();
    assert_eq!(speed.dimension().get(length()), Rational32::from_integer(1));
    assert_eq!(speed.dimension().get(time()), Rational32::from_integer(-1));
  }

  #[test]
  fn test_pow_zero_is_one() {
    let u = meter().multiply(&second()).unwrap().scaled(42.0);
    assert!(u.pow(Rational32::from_integer(0)).unwrap().is_one());
    // Even a shifted unit collapses to "1" under the zeroth power.
    let shifted = second().shifted(20.0).unwrap();
    assert!(shifted.pow(Rational32::from_integer(0)).unwrap().is_one());
  }

  #[test]
  fn test_pow_squares_scale() {
    let u = meter().scaled(5.0).pow(Rational32::from_integer(2)).unwrap();
    assert_abs_diff_eq!(u.scale(), 25.0);
    assert_eq!(u.dimension().get(length()), Rational32::from_integer(2));
  }

  #[test]
  fn test_pow_overflow() {
    let err = meter().pow(Rational32::from_integer(999)).unwrap_err();
    assert_eq!(err, AlgebraError::ExponentOverflow);
    assert!(meter().pow(Rational32::from_integer(99)).is_ok());
  }

  #[test]
  fn test_multiply_overflow() {
    let big = meter().pow(Rational32::from_integer(99)).unwrap();
    let err = big.multiply(&meter()).unwrap_err();
    assert_eq!(err, AlgebraError::ExponentOverflow);
  }

  #[test]
  fn test_shift_composes() {
    let celsius = Unit::base(time()).with_offset(273.15);
    let shifted = celsius.shifted(20.0).unwrap();
    assert_abs_diff_eq!(shifted.offset(), 293.15);
  }

  #[test]
  fn test_shift_scales_origin() {
    let day = second().scaled(86400.0);
    let shifted = day.shifted(2.0).unwrap();
    assert_abs_diff_eq!(shifted.offset(), 172800.0);
  }

  #[test]
  fn test_multiply_rejects_shifted_operand() {
    let celsius = Unit::base(time()).with_offset(273.15);
    assert_eq!(celsius.multiply(&meter()).unwrap_err(), AlgebraError::ShiftedOperand);
    assert_eq!(meter().multiply(&celsius).unwrap_err(), AlgebraError::ShiftedOperand);
  }

  #[test]
  fn test_multiply_rejects_log_operand() {
    let log = Unit::log_ref(LogBase::Ten, Unit::one()).unwrap();
    assert_eq!(log.multiply(&meter()).unwrap_err(), AlgebraError::LogOperand);
    assert_eq!(meter().divide(&log).unwrap_err(), AlgebraError::LogOperand);
  }

  #[test]
  fn test_no_nested_logs() {
    let log = Unit::log_ref(LogBase::Ten, Unit::one()).unwrap();
    assert_eq!(Unit::log_ref(LogBase::Two, log).unwrap_err(), AlgebraError::NestedLog);
  }

  #[test]
  fn test_log_rejects_shifted_reference() {
    let shifted = second().shifted(5.0).unwrap();
    assert_eq!(Unit::log_ref(LogBase::E, shifted).unwrap_err(), AlgebraError::ShiftedOperand);
  }

  #[test]
  fn test_timestamp_requires_time_dimension() {
    let err = meter().shifted_to_instant(946684800.0, time()).unwrap_err();
    assert_eq!(err, AlgebraError::NotTimeDimension);
    let ok = second().shifted_to_instant(946684800.0, time()).unwrap();
    assert_abs_diff_eq!(ok.offset(), 946684800.0);
  }

  #[test]
  fn test_one_is_canonical() {
    let u = meter().divide(&meter()).unwrap();
    assert!(u.is_one());
    assert_eq!(u, Unit::one());
  }
}
