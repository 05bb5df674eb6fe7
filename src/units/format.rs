
use super::system::UnitSystem;
use super::unit::Unit;

use itertools::Itertools;

/// Output encodings for formatted units. `Symbolic` renders exponents
/// with Unicode superscripts and separates factors with a middle dot;
/// `Ascii` sticks to `^` exponents and spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFormat {
  Symbolic,
  Ascii,
}

type Strategy = fn(&UnitSystem, &Unit) -> Option<String>;

// Ordered fallback chain per mode. Rendering tries each strategy in
// turn and takes the first that succeeds, so formatting as a whole
// never fails: the symbolic encoding declines values it cannot
// represent, the ASCII encoding handles everything, and the terminal
// strategy emits the dimensionless "1".
const SYMBOLIC_CHAIN: &[Strategy] = &[render_symbolic, render_ascii, render_one];
const ASCII_CHAIN: &[Strategy] = &[render_ascii, render_one];

/// Renders a unit to its canonical string form. Factors appear in
/// dimension registration order, preceded by the scale when it is not
/// one and followed by the origin when the unit is shifted.
pub fn format_unit(system: &UnitSystem, unit: &Unit, mode: UnitFormat) -> String {
  let chain = match mode {
    UnitFormat::Symbolic => SYMBOLIC_CHAIN,
    UnitFormat::Ascii => ASCII_CHAIN,
  };
  for strategy in chain {
    if let Some(rendered) = strategy(system, unit) {
      return rendered;
    }
  }
  unreachable!("render_one accepts every unit");
}

fn render_symbolic(system: &UnitSystem, unit: &Unit) -> Option<String> {
  if let Some(log) = unit.log() {
    let reference = render_symbolic(system, &log.reference)?;
    return Some(format!("{}(re {})", log.base.tag(), reference));
  }
  let mut pieces: Vec<String> = Vec::new();
  if unit.scale() != 1.0 {
    pieces.push(format!("{}", unit.scale()));
  }
  let mut factors: Vec<String> = Vec::new();
  for (base, power) in unit.dimension().components() {
    let symbol = system.dimension_symbol(base)?;
    if power.is_integer() {
      let n = *power.numer();
      if n == 1 {
        factors.push(symbol.to_owned());
      } else {
        factors.push(format!("{}{}", symbol, superscript(n)));
      }
    } else {
      // No superscript form for rational powers.
      return None;
    }
  }
  if !factors.is_empty() {
    pieces.push(factors.iter().join("·"));
  }
  if pieces.is_empty() {
    pieces.push("1".to_owned());
  }
  let mut out = pieces.iter().join(" ");
  if unit.is_shifted() {
    out.push_str(&format!(" @ {}", unit.offset()));
  }
  Some(out)
}

fn render_ascii(system: &UnitSystem, unit: &Unit) -> Option<String> {
  if let Some(log) = unit.log() {
    let reference = render_ascii(system, &log.reference)?;
    return Some(format!("{}(re {})", log.base.tag(), reference));
  }
  let mut pieces: Vec<String> = Vec::new();
  if unit.scale() != 1.0 {
    pieces.push(format!("{}", unit.scale()));
  }
  for (base, power) in unit.dimension().components() {
    let symbol = system.dimension_symbol(base)?;
    if power.is_integer() {
      let n = *power.numer();
      if n == 1 {
        pieces.push(symbol.to_owned());
      } else {
        pieces.push(format!("{}^{}", symbol, n));
      }
    } else {
      pieces.push(format!("{}^{}|{}", symbol, power.numer(), power.denom()));
    }
  }
  if pieces.is_empty() {
    pieces.push("1".to_owned());
  }
  let mut out = pieces.iter().join(" ");
  if unit.is_shifted() {
    out.push_str(&format!(" @ {}", unit.offset()));
  }
  Some(out)
}

fn render_one(_system: &UnitSystem, _unit: &Unit) -> Option<String> {
  Some("1".to_owned())
}

fn superscript(n: i32) -> String {
  const DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];
  let mut out = String::new();
  if n < 0 {
    out.push('⁻');
  }
  for c in n.abs().to_string().chars() {
    // to_digit cannot fail on the output of i32's Display.
    let digit = c.to_digit(10).unwrap_or(0) as usize;
    out.push(DIGITS[digit]);
  }
  out
}
