
use super::unit::Unit;

/// A metric prefix, spelled either by name ("nano") or by symbol
/// ("n"). Prefix names combine with unit names and prefix symbols
/// with unit symbols; the two spellings never mix.
#[derive(Debug, Clone, Copy)]
pub struct MetricPrefix {
  pub name: &'static str,
  pub symbol: &'static str,
  pub exponent: i32,
}

impl MetricPrefix {
  /// Applies this prefix to a unit by scaling it by the appropriate
  /// power of ten.
  pub fn apply(&self, unit: Unit) -> Unit {
    unit.scaled(10f64.powi(self.exponent))
  }
}

pub const SI_PREFIXES: [MetricPrefix; 25] = [
  MetricPrefix { name: "quetta", symbol: "Q", exponent: 30 },
  MetricPrefix { name: "ronna", symbol: "R", exponent: 27 },
  MetricPrefix { name: "yotta", symbol: "Y", exponent: 24 },
  MetricPrefix { name: "zetta", symbol: "Z", exponent: 21 },
  MetricPrefix { name: "exa", symbol: "E", exponent: 18 },
  MetricPrefix { name: "peta", symbol: "P", exponent: 15 },
  MetricPrefix { name: "tera", symbol: "T", exponent: 12 },
  MetricPrefix { name: "giga", symbol: "G", exponent: 9 },
  MetricPrefix { name: "mega", symbol: "M", exponent: 6 },
  MetricPrefix { name: "kilo", symbol: "k", exponent: 3 },
  MetricPrefix { name: "hecto", symbol: "h", exponent: 2 },
  MetricPrefix { name: "deka", symbol: "da", exponent: 1 },
  MetricPrefix { name: "deci", symbol: "d", exponent: -1 },
  MetricPrefix { name: "centi", symbol: "c", exponent: -2 },
  MetricPrefix { name: "milli", symbol: "m", exponent: -3 },
  // Both "u" and "µ" are accepted for micro.
  MetricPrefix { name: "micro", symbol: "u", exponent: -6 },
  MetricPrefix { name: "micro", symbol: "µ", exponent: -6 },
  MetricPrefix { name: "nano", symbol: "n", exponent: -9 },
  MetricPrefix { name: "pico", symbol: "p", exponent: -12 },
  MetricPrefix { name: "femto", symbol: "f", exponent: -15 },
  MetricPrefix { name: "atto", symbol: "a", exponent: -18 },
  MetricPrefix { name: "zepto", symbol: "z", exponent: -21 },
  MetricPrefix { name: "yocto", symbol: "y", exponent: -24 },
  MetricPrefix { name: "ronto", symbol: "r", exponent: -27 },
  MetricPrefix { name: "quecto", symbol: "q", exponent: -30 },
];

#[cfg(test)]
mod tests {
  use super::*;
  use crate::units::dimension::BaseDimension;
  use approx::assert_abs_diff_eq;

  #[test]
  fn test_apply() {
    let kilo = SI_PREFIXES.iter().find(|p| p.name == "kilo").unwrap();
    let meter = Unit::base(BaseDimension(0));
    let kilometer = kilo.apply(meter);
    assert_abs_diff_eq!(kilometer.scale(), 1000.0);
  }

  #[test]
  fn test_table_spans_quetta_to_quecto() {
    assert_eq!(SI_PREFIXES.first().map(|p| p.name), Some("quetta"));
    assert_eq!(SI_PREFIXES.last().map(|p| p.name), Some("quecto"));
    assert_eq!(SI_PREFIXES.last().map(|p| p.exponent), Some(-30));
  }

  #[test]
  fn test_apply_negative_exponent() {
    let nano = SI_PREFIXES.iter().find(|p| p.name == "nano").unwrap();
    let second = Unit::base(BaseDimension(1));
    let nanosecond = nano.apply(second);
    assert_abs_diff_eq!(nanosecond.scale(), 1e-9);
  }
}
