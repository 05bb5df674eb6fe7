
use super::source::SourceOffset;
use super::timestamp::resolve_packed_date;
use super::tokenizer::{Keyword, Token, TokenKind, TokenizeError, TokenizeErrorKind, tokenize};
use crate::units::dimension::Dimension;
use crate::units::system::{Status, UnitSystem};
use crate::units::unit::{AlgebraError, LogBase, Unit};

use num::rational::Rational32;
use thiserror::Error;

/// A structured parse failure: what went wrong and where. Callers
/// that only care about success can collapse this to a sentinel; the
/// detail is still available for direct testing.
#[derive(Debug, Clone, Error, PartialEq)]
#[non_exhaustive]
pub enum ParseError {
  #[error("syntax error at position {position}: {kind}")]
  Syntax {
    kind: SyntaxErrorKind,
    position: SourceOffset,
  },
  #[error("unknown unit '{name}' at position {position}")]
  UnknownUnit {
    name: String,
    position: SourceOffset,
  },
  #[error("{source} (at position {position})")]
  Algebra {
    source: AlgebraError,
    position: SourceOffset,
  },
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SyntaxErrorKind {
  #[error("expression is only whitespace")]
  EmptyExpression,
  #[error("unexpected token")]
  UnexpectedToken,
  #[error("unexpected end of expression")]
  UnexpectedEnd,
  #[error("unclosed parenthesis")]
  UnclosedParen,
  #[error("missing exponent")]
  MissingExponent,
  #[error("only one shift operator is allowed")]
  DoubleShift,
  #[error("missing shift origin")]
  MissingShiftOrigin,
  #[error("missing logarithmic reference")]
  MissingLogReference,
  #[error("unrecognized character")]
  BadCharacter,
  #[error("malformed date/time literal")]
  BadDate,
}

impl ParseError {
  fn syntax(kind: SyntaxErrorKind, position: SourceOffset) -> Self {
    ParseError::Syntax { kind, position }
  }

  /// The coarse status code for the polling-style accessor.
  pub fn status(&self) -> Status {
    match self {
      ParseError::Syntax { .. } => Status::Syntax,
      ParseError::UnknownUnit { .. } => Status::UnknownUnit,
      ParseError::Algebra { .. } => Status::Dimension,
    }
  }
}

impl From<TokenizeError> for ParseError {
  fn from(err: TokenizeError) -> Self {
    let kind = match err.kind {
      TokenizeErrorKind::BadCharacter => SyntaxErrorKind::BadCharacter,
      TokenizeErrorKind::BadDate => SyntaxErrorKind::BadDate,
    };
    ParseError::syntax(kind, err.position)
  }
}

/// Parses a unit expression against the given system's registry,
/// producing a normalized unit value.
///
/// The empty string is the dimensionless unit "1"; a whitespace-only
/// string is a syntax error. One historical quirk is preserved on
/// purpose: stray closing parentheses at the end of the expression
/// are accepted, as in `kg)`.
pub fn parse_expression(system: &UnitSystem, input: &str) -> Result<Unit, ParseError> {
  if input.is_empty() {
    return Ok(Unit::one());
  }
  let tokens = tokenize(input)?;
  if tokens.is_empty() {
    return Err(ParseError::syntax(SyntaxErrorKind::EmptyExpression, SourceOffset(0)));
  }
  let mut parser = Parser {
    system,
    tokens,
    pos: 0,
    end: SourceOffset(input.len()),
    shift_seen: false,
  };
  let unit = parser.parse_shift()?;
  while parser.peek_kind() == Some(&TokenKind::CloseParen) {
    parser.pos += 1;
  }
  match parser.peek() {
    Some(token) => Err(ParseError::syntax(SyntaxErrorKind::UnexpectedToken, token.span.start)),
    None => Ok(unit),
  }
}

struct Parser<'a> {
  system: &'a UnitSystem,
  tokens: Vec<Token>,
  pos: usize,
  end: SourceOffset,
  shift_seen: bool,
}

impl<'a> Parser<'a> {
  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn peek_kind(&self) -> Option<&TokenKind> {
    self.peek().map(|t| &t.kind)
  }

  fn peek_start(&self) -> SourceOffset {
    self.peek().map_or(self.end, |t| t.span.start)
  }

  fn bump(&mut self) -> Option<Token> {
    let token = self.tokens.get(self.pos).cloned();
    if token.is_some() {
      self.pos += 1;
    }
    token
  }

  fn peek_is_shift_op(&self) -> bool {
    matches!(
      self.peek_kind(),
      Some(TokenKind::At)
        | Some(TokenKind::Keyword(Keyword::After))
        | Some(TokenKind::Keyword(Keyword::From))
        | Some(TokenKind::Keyword(Keyword::Since))
    )
  }

  // Shift: Product [shift-op origin]. At most one shift operator may
  // appear in the whole expression.
  fn parse_shift(&mut self) -> Result<Unit, ParseError> {
    let unit = self.parse_product()?;
    if !self.peek_is_shift_op() {
      return Ok(unit);
    }
    let op_pos = self.peek_start();
    if self.shift_seen {
      return Err(ParseError::syntax(SyntaxErrorKind::DoubleShift, op_pos));
    }
    self.shift_seen = true;
    self.pos += 1;
    let shifted = self.parse_shift_origin(unit, op_pos)?;
    if self.peek_is_shift_op() {
      return Err(ParseError::syntax(SyntaxErrorKind::DoubleShift, self.peek_start()));
    }
    Ok(shifted)
  }

  fn parse_shift_origin(&mut self, unit: Unit, op_pos: SourceOffset) -> Result<Unit, ParseError> {
    let origin_pos = self.peek_start();
    match self.peek_kind().cloned() {
      Some(TokenKind::Number(value)) => {
        self.pos += 1;
        self.apply_numeric_origin(unit, value, origin_pos)
      }
      Some(TokenKind::Minus) => {
        self.pos += 1;
        match self.peek_kind().cloned() {
          Some(TokenKind::Number(value)) => {
            self.pos += 1;
            unit.shifted(-value)
              .map_err(|source| ParseError::Algebra { source, position: origin_pos })
          }
          _ => Err(ParseError::syntax(SyntaxErrorKind::MissingShiftOrigin, origin_pos)),
        }
      }
      Some(TokenKind::Date(instant)) => {
        self.pos += 1;
        self.apply_instant_origin(unit, instant, origin_pos)
      }
      Some(_) if self.peek_is_shift_op() => {
        Err(ParseError::syntax(SyntaxErrorKind::DoubleShift, origin_pos))
      }
      _ => Err(ParseError::syntax(SyntaxErrorKind::MissingShiftOrigin, op_pos)),
    }
  }

  // A numeric origin that reads as a packed YYYYMMDD date anchors a
  // time unit to that instant; anything else is a plain offset on the
  // unit's own scale.
  fn apply_numeric_origin(&self, unit: Unit, value: f64, position: SourceOffset) -> Result<Unit, ParseError> {
    if let Some(time) = self.system.time_dimension() {
      if unit.dimension() == &Dimension::singleton(time) {
        if let Some(instant) = resolve_packed_date(value) {
          return unit.shifted_to_instant(instant, time)
            .map_err(|source| ParseError::Algebra { source, position });
        }
      }
    }
    unit.shifted(value)
      .map_err(|source| ParseError::Algebra { source, position })
  }

  fn apply_instant_origin(&self, unit: Unit, instant: f64, position: SourceOffset) -> Result<Unit, ParseError> {
    let Some(time) = self.system.time_dimension() else {
      return Err(ParseError::Algebra {
        source: AlgebraError::NotTimeDimension,
        position,
      });
    };
    unit.shifted_to_instant(instant, time)
      .map_err(|source| ParseError::Algebra { source, position })
  }

  // Product: juxtaposition terms joined by `*`, `/` or `per`.
  fn parse_product(&mut self) -> Result<Unit, ParseError> {
    let mut unit = self.parse_juxtaposition()?;
    loop {
      let op_pos = self.peek_start();
      match self.peek_kind() {
        Some(TokenKind::Star) => {
          self.pos += 1;
          let rhs = self.parse_juxtaposition()?;
          unit = unit.multiply(&rhs)
            .map_err(|source| ParseError::Algebra { source, position: op_pos })?;
        }
        Some(TokenKind::Slash) | Some(TokenKind::Keyword(Keyword::Per)) => {
          self.pos += 1;
          let rhs = self.parse_juxtaposition()?;
          unit = unit.divide(&rhs)
            .map_err(|source| ParseError::Algebra { source, position: op_pos })?;
        }
        _ => break,
      }
    }
    Ok(unit)
  }

  // Juxtaposition: power terms separated by whitespace, `.` or `-`
  // multiply. Binds tighter than `*` and `/`.
  fn parse_juxtaposition(&mut self) -> Result<Unit, ParseError> {
    let mut unit = self.parse_power()?;
    loop {
      let op_pos = self.peek_start();
      match self.peek_kind() {
        Some(TokenKind::Dot) | Some(TokenKind::Minus) => {
          self.pos += 1;
          let rhs = self.parse_power()?;
          unit = unit.multiply(&rhs)
            .map_err(|source| ParseError::Algebra { source, position: op_pos })?;
        }
        Some(kind) if starts_primary(kind) => {
          let rhs = self.parse_power()?;
          unit = unit.multiply(&rhs)
            .map_err(|source| ParseError::Algebra { source, position: op_pos })?;
        }
        _ => break,
      }
    }
    Ok(unit)
  }

  // Power: Primary [^ SignedInteger]*, plus the superscript-style
  // form where a digit directly suffixes an identifier (`m2`).
  fn parse_power(&mut self) -> Result<Unit, ParseError> {
    let primary_index = self.pos;
    let mut unit = self.parse_primary()?;
    let bare_identifier = self.pos == primary_index + 1
      && matches!(self.tokens[primary_index].kind, TokenKind::Identifier(_));
    if bare_identifier {
      if let Some(TokenKind::Number(value)) = self.peek_kind().cloned() {
        let previous_end = self.tokens[primary_index].span.end;
        let adjacent = self.peek().map(|t| t.span.start) == Some(previous_end);
        if adjacent {
          let position = self.peek_start();
          self.pos += 1;
          let exponent = integer_exponent(value, false, position)?;
          unit = unit.pow(Rational32::from_integer(exponent))
            .map_err(|source| ParseError::Algebra { source, position })?;
        }
      }
    }
    while self.peek_kind() == Some(&TokenKind::Caret) {
      let op_pos = self.peek_start();
      self.pos += 1;
      let exponent = self.parse_signed_exponent(op_pos)?;
      unit = unit.pow(Rational32::from_integer(exponent))
        .map_err(|source| ParseError::Algebra { source, position: op_pos })?;
    }
    Ok(unit)
  }

  fn parse_signed_exponent(&mut self, op_pos: SourceOffset) -> Result<i32, ParseError> {
    let negative = if self.peek_kind() == Some(&TokenKind::Minus) {
      self.pos += 1;
      true
    } else {
      false
    };
    match self.peek_kind().cloned() {
      Some(TokenKind::Number(value)) => {
        let position = self.peek_start();
        self.pos += 1;
        integer_exponent(value, negative, position)
      }
      _ => Err(ParseError::syntax(SyntaxErrorKind::MissingExponent, op_pos)),
    }
  }

  fn parse_primary(&mut self) -> Result<Unit, ParseError> {
    let position = self.peek_start();
    match self.peek_kind().cloned() {
      None => Err(ParseError::syntax(SyntaxErrorKind::UnexpectedEnd, position)),
      Some(TokenKind::Number(value)) => {
        self.pos += 1;
        Ok(Unit::scalar(value))
      }
      Some(TokenKind::Minus) => {
        self.pos += 1;
        match self.peek_kind().cloned() {
          Some(TokenKind::Number(value)) => {
            self.pos += 1;
            Ok(Unit::scalar(-value))
          }
          _ => Err(ParseError::syntax(SyntaxErrorKind::UnexpectedToken, position)),
        }
      }
      Some(TokenKind::Identifier(name)) => {
        if let Some(base) = log_base(&name) {
          if self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::OpenParen) {
            return self.parse_log_reference(base);
          }
        }
        self.pos += 1;
        self.system.lookup(&name)
          .ok_or(ParseError::UnknownUnit { name, position })
      }
      Some(TokenKind::OpenParen) => {
        self.pos += 1;
        let unit = self.parse_shift()?;
        if self.peek_kind() == Some(&TokenKind::CloseParen) {
          self.pos += 1;
          Ok(unit)
        } else {
          Err(ParseError::syntax(SyntaxErrorKind::UnclosedParen, position))
        }
      }
      Some(_) => Err(ParseError::syntax(SyntaxErrorKind::UnexpectedToken, position)),
    }
  }

  // Log-reference: lg|ln|lb '(' 're' NUMBER [Product] ')'. The
  // number is mandatory; the product defaults to dimensionless.
  fn parse_log_reference(&mut self, base: LogBase) -> Result<Unit, ParseError> {
    let name_pos = self.peek_start();
    self.pos += 1; // function name
    let open_pos = self.peek_start();
    self.pos += 1; // open paren
    if self.peek_kind() != Some(&TokenKind::Keyword(Keyword::Re)) {
      return Err(ParseError::syntax(SyntaxErrorKind::MissingLogReference, self.peek_start()));
    }
    self.pos += 1;
    let mut reference = match self.peek_kind().cloned() {
      Some(TokenKind::Number(value)) => {
        self.pos += 1;
        Unit::scalar(value)
      }
      _ => {
        return Err(ParseError::syntax(SyntaxErrorKind::MissingLogReference, self.peek_start()));
      }
    };
    if self.peek_kind().is_some_and(starts_primary) {
      let product_pos = self.peek_start();
      let product = self.parse_product()?;
      reference = reference.multiply(&product)
        .map_err(|source| ParseError::Algebra { source, position: product_pos })?;
    }
    if self.peek_kind() != Some(&TokenKind::CloseParen) {
      return Err(ParseError::syntax(SyntaxErrorKind::UnclosedParen, open_pos));
    }
    self.pos += 1;
    Unit::log_ref(base, reference)
      .map_err(|source| ParseError::Algebra { source, position: name_pos })
  }
}

fn starts_primary(kind: &TokenKind) -> bool {
  matches!(
    kind,
    TokenKind::Number(_) | TokenKind::Identifier(_) | TokenKind::OpenParen,
  )
}

fn log_base(name: &str) -> Option<LogBase> {
  match name {
    "lg" => Some(LogBase::Ten),
    "ln" => Some(LogBase::E),
    "lb" => Some(LogBase::Two),
    _ => None,
  }
}

fn integer_exponent(value: f64, negative: bool, position: SourceOffset) -> Result<i32, ParseError> {
  if value.fract() != 0.0 {
    return Err(ParseError::syntax(SyntaxErrorKind::UnexpectedToken, position));
  }
  if value.abs() > 1000.0 {
    return Err(ParseError::Algebra {
      source: AlgebraError::ExponentOverflow,
      position,
    });
  }
  let magnitude = value as i32;
  Ok(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::units::system::si_system;
  use crate::units::unit::MAX_EXPONENT;
  use approx::assert_abs_diff_eq;

  fn parse(input: &str) -> Result<Unit, ParseError> {
    let system = si_system();
    parse_expression(&system, input)
  }

  fn assert_parses(input: &str) {
    if let Err(err) = parse(input) {
      panic!("expected '{}' to parse, got {}", input, err);
    }
  }

  fn assert_rejects(input: &str) {
    if parse(input).is_ok() {
      panic!("expected '{}' to be rejected", input);
    }
  }

  #[test]
  fn test_basic_valid_expressions() {
    for input in ["meter", "m", "kg", "second", "celsius", "1", "42",
                  "3.14159", "-5", "ns", "nanoseconds"] {
      assert_parses(input);
    }
  }

  #[test]
  fn test_multiplication_operators() {
    for input in ["kg*m", "kg.m", "kg-m", "kg m", "kg*m*s"] {
      assert_parses(input);
    }
    let star = parse("kg*m").unwrap();
    for input in ["kg.m", "kg-m", "kg m"] {
      assert_abs_diff_eq!(parse(input).unwrap(), star);
    }
  }

  #[test]
  fn test_division_operators() {
    for input in ["m/s", "m per s", "m PER s", "m Per s",
                  "3 perch m", "3 m perch", "perch per m"] {
      assert_parses(input);
    }
    assert_abs_diff_eq!(parse("m per s").unwrap(), parse("m/s").unwrap());
  }

  #[test]
  fn test_exponentiation() {
    for input in ["m^2", "m**2", "m^-1", "m^0", "m^1", "m2"] {
      assert_parses(input);
    }
    assert_rejects("m^999");
  }

  #[test]
  fn test_exponent_matches_repeated_multiplication() {
    let system = si_system();
    let squared = parse_expression(&system, "m^2").unwrap();
    let meter = system.lookup("meter").unwrap();
    let product = meter.multiply(&meter).unwrap();
    assert_abs_diff_eq!(squared, product);
  }

  #[test]
  fn test_superscript_style_exponent() {
    assert_abs_diff_eq!(parse("m2").unwrap(), parse("m^2").unwrap());
    // With a gap, the digit is a factor instead.
    assert_abs_diff_eq!(parse("m 2").unwrap(), parse("2 m").unwrap());
  }

  #[test]
  fn test_zero_exponent_is_dimensionless() {
    assert!(parse("m^0").unwrap().is_one());
  }

  #[test]
  fn test_parentheses() {
    for input in ["(kg*m)", "(kg*m)/s", "kg*(m/s)", "((kg))"] {
      assert_parses(input);
    }
    assert_rejects("(kg");
  }

  #[test]
  fn test_stray_close_paren_quirk() {
    // Historical permissiveness, preserved deliberately.
    assert_parses("kg)");
    assert_abs_diff_eq!(parse("kg)").unwrap(), parse("kg").unwrap());
  }

  #[test]
  fn test_logarithmic_references() {
    for input in ["lg(re 1)", "lg(re 1 mW)", "ln(re 1 K)", "lb(re 1 Hz)"] {
      assert_parses(input);
    }
    assert_rejects("lg(re)");
    assert_rejects("lg(re 1");
  }

  #[test]
  fn test_log_names_fall_back_to_units() {
    // "lb" without a following paren is the pound.
    let pound = parse("lb").unwrap();
    assert!(pound.log().is_none());
    assert_abs_diff_eq!(pound.scale(), 0.45359237);
  }

  #[test]
  fn test_shift_operations() {
    for input in ["celsius @ 20", "celsius after 20", "celsius AFTER 20",
                  "celsius from 0", "celsius since 273.15", "K @ 273.15"] {
      assert_parses(input);
    }
    let shifted = parse("celsius @ 20").unwrap();
    assert_abs_diff_eq!(shifted.offset(), 293.15);
  }

  #[test]
  fn test_negative_shift_origin() {
    let shifted = parse("K @ -5").unwrap();
    assert_abs_diff_eq!(shifted.offset(), -5.0);
  }

  #[test]
  fn test_timestamps() {
    for input in ["seconds since 2000-01-01", "days since 1990-1-1",
                  "hours since 2023-12-25", "minutes since 2000-01-01 12:00:00",
                  "seconds since 2000-01-01T12:00:00", "days since 20231225"] {
      assert_parses(input);
    }
    let epoch2000 = parse("seconds since 2000-01-01").unwrap();
    assert_abs_diff_eq!(epoch2000.offset(), 946_684_800.0);
  }

  #[test]
  fn test_packed_date_matches_dashed_date() {
    assert_abs_diff_eq!(
      parse("days since 20231225").unwrap(),
      parse("days since 2023-12-25").unwrap(),
    );
  }

  #[test]
  fn test_date_origin_needs_time_unit() {
    let err = parse("kg since 2000-01-01").unwrap_err();
    assert!(matches!(
      err,
      ParseError::Algebra { source: AlgebraError::NotTimeDimension, .. },
    ));
  }

  #[test]
  fn test_invalid_expressions() {
    for input in ["foobar", "kg**", "m^", "kg*/m", " ", "kg @ @ 20", "since"] {
      assert_rejects(input);
    }
  }

  #[test]
  fn test_empty_string_is_dimensionless() {
    assert!(parse("").unwrap().is_one());
  }

  #[test]
  fn test_whitespace_only_is_syntax_error() {
    let err = parse(" ").unwrap_err();
    assert!(matches!(
      err,
      ParseError::Syntax { kind: SyntaxErrorKind::EmptyExpression, .. },
    ));
  }

  #[test]
  fn test_double_shift_is_syntax_error() {
    let err = parse("kg @ @ 20").unwrap_err();
    assert!(matches!(err, ParseError::Syntax { kind: SyntaxErrorKind::DoubleShift, .. }));
    let err = parse("celsius @ 20 @ 30").unwrap_err();
    assert!(matches!(err, ParseError::Syntax { kind: SyntaxErrorKind::DoubleShift, .. }));
    let err = parse("(K @ 5) @ 6").unwrap_err();
    assert!(matches!(err, ParseError::Syntax { kind: SyntaxErrorKind::DoubleShift, .. }));
  }

  #[test]
  fn test_missing_exponent_kind() {
    let err = parse("m^").unwrap_err();
    assert!(matches!(err, ParseError::Syntax { kind: SyntaxErrorKind::MissingExponent, .. }));
    let err = parse("kg**").unwrap_err();
    assert!(matches!(err, ParseError::Syntax { kind: SyntaxErrorKind::MissingExponent, .. }));
  }

  #[test]
  fn test_exponent_ceiling_is_dimension_error() {
    let err = parse("m^999").unwrap_err();
    assert!(matches!(
      err,
      ParseError::Algebra { source: AlgebraError::ExponentOverflow, .. },
    ));
    assert_parses("m^99");
  }

  #[test]
  fn test_unknown_unit_carries_spelling() {
    let err = parse("foobar").unwrap_err();
    assert_eq!(err, ParseError::UnknownUnit {
      name: "foobar".to_owned(),
      position: SourceOffset(0),
    });
  }

  #[test]
  fn test_symbol_case_sensitivity() {
    assert_parses("m");
    assert_rejects("M");
  }

  #[test]
  fn test_name_case_insensitivity() {
    assert_abs_diff_eq!(parse("meter").unwrap(), parse("METER").unwrap());
  }

  #[test]
  fn test_juxtaposition_binds_tighter_than_slash() {
    // "1000 m / 5 s" groups as (1000 m) / (5 s).
    let unit = parse("1000 m / 5 s").unwrap();
    assert_abs_diff_eq!(unit.scale(), 200.0);
  }

  #[test]
  fn test_round_trip_through_ascii_format() {
    use crate::units::format::UnitFormat;
    let system = si_system();
    for input in ["5 m^2", "m/s", "kg m s^-2", "42", "K @ 273.15", "lg(re 1)"] {
      let unit = parse_expression(&system, input).unwrap();
      let rendered = system.format(&unit, UnitFormat::Ascii);
      let reparsed = parse_expression(&system, &rendered).unwrap();
      assert_abs_diff_eq!(reparsed, unit, epsilon = 1e-9);
    }
  }

  #[test]
  fn test_division_round_trip() {
    let system = si_system();
    let a = parse_expression(&system, "5 kg m").unwrap();
    let b = parse_expression(&system, "3 s^2").unwrap();
    let back = a.multiply(&b).unwrap().divide(&b).unwrap();
    assert_abs_diff_eq!(back, a, epsilon = 1e-12);
  }

  #[test]
  fn test_log_reference_units() {
    let unit = parse("lg(re 1 mW)").unwrap();
    let log = unit.log().unwrap();
    assert_eq!(log.base, LogBase::Ten);
    assert_abs_diff_eq!(log.reference.scale(), 1e-3);
  }

  #[test]
  fn test_exponent_ceiling_constant_is_respected() {
    assert_rejects(&format!("m^{}", MAX_EXPONENT + 1));
    assert_parses(&format!("m^{}", MAX_EXPONENT));
  }
}
