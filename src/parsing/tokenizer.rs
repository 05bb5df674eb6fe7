
use super::source::{SourceOffset, Span};
use super::timestamp::resolve_date_literal;

use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;
use thiserror::Error;

/// Low-level cursor over the input string. Restartable: all state
/// lives in the value, none across calls.
#[derive(Debug, Clone)]
pub struct TokenizerState<'a> {
  input: &'a str,
  position: SourceOffset,
}

#[derive(Debug, Clone)]
pub struct TokenizerMatch<'a> {
  matched_str: &'a str,
  start: SourceOffset,
  end: SourceOffset,
}

/// A lexical token together with the span of input it came from.
/// Spans matter beyond error reporting: adjacency of an identifier
/// and a number (no gap) is how `m2` is distinguished from `m 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
  Number(f64),
  Identifier(String),
  Keyword(Keyword),
  /// A date/time literal, resolved to seconds since the Unix epoch.
  Date(f64),
  Star,
  Slash,
  Caret,
  Dot,
  Minus,
  At,
  OpenParen,
  CloseParen,
}

/// Word operators. Keyword matching is case-insensitive and applies
/// only to a whole identifier, so `perch` never lexes as `per`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
  Per,
  After,
  From,
  Since,
  Re,
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
  "per" => Keyword::Per,
  "after" => Keyword::After,
  "from" => Keyword::From,
  "since" => Keyword::Since,
  "re" => Keyword::Re,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} at position {position}")]
pub struct TokenizeError {
  pub kind: TokenizeErrorKind,
  pub position: SourceOffset,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TokenizeErrorKind {
  #[error("unrecognized character")]
  BadCharacter,
  #[error("malformed date/time literal")]
  BadDate,
}

/// Lexes a whole expression. Whitespace separates tokens but produces
/// none itself; the parser recovers implicit multiplication from the
/// gaps between spans.
pub fn tokenize(input: &str) -> Result<Vec<Token>, TokenizeError> {
  let mut state = TokenizerState::new(input);
  let mut tokens = Vec::new();
  loop {
    state.consume_spaces();
    if state.is_eof() {
      break;
    }
    tokens.push(next_token(&mut state)?);
  }
  Ok(tokens)
}

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}(?:[T ]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)?").unwrap()
});
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").unwrap()
});
static IDENT_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^[A-Za-z_µμ°]+").unwrap()
});

fn next_token(state: &mut TokenizerState) -> Result<Token, TokenizeError> {
  // The date sub-grammar runs before numbers, so 2000-01-01 is one
  // literal rather than a product of numbers.
  if let Some(m) = state.read_regex(&DATE_RE) {
    let span = m.span();
    let seconds = resolve_date_literal(m.as_str()).ok_or(TokenizeError {
      kind: TokenizeErrorKind::BadDate,
      position: span.start,
    })?;
    return Ok(Token { kind: TokenKind::Date(seconds), span });
  }
  if let Some(m) = state.read_regex(&NUMBER_RE) {
    let span = m.span();
    let value: f64 = m.as_str().parse().map_err(|_| TokenizeError {
      kind: TokenizeErrorKind::BadCharacter,
      position: span.start,
    })?;
    return Ok(Token { kind: TokenKind::Number(value), span });
  }
  if let Some(m) = state.read_regex(&IDENT_RE) {
    let span = m.span();
    let kind = match KEYWORDS.get(m.as_str().to_lowercase().as_str()) {
      Some(keyword) => TokenKind::Keyword(*keyword),
      None => TokenKind::Identifier(m.as_str().to_owned()),
    };
    return Ok(Token { kind, span });
  }
  if let Some(m) = state.read_literal("**") {
    return Ok(Token { kind: TokenKind::Caret, span: m.span() });
  }
  let position = state.current_pos();
  let kind = match state.peek() {
    Some('*') => TokenKind::Star,
    Some('/') => TokenKind::Slash,
    Some('^') => TokenKind::Caret,
    Some('.') => TokenKind::Dot,
    Some('-') => TokenKind::Minus,
    Some('@') => TokenKind::At,
    Some('(') => TokenKind::OpenParen,
    Some(')') => TokenKind::CloseParen,
    _ => {
      return Err(TokenizeError { kind: TokenizeErrorKind::BadCharacter, position });
    }
  };
  let m = state.advance(1);
  Ok(Token { kind, span: m.span() })
}

impl<'a> TokenizerState<'a> {
  pub fn new(input: &'a str) -> Self {
    Self { input, position: SourceOffset(0) }
  }

  pub fn is_eof(&self) -> bool {
    self.input.is_empty()
  }

  pub fn peek(&self) -> Option<char> {
    self.input.chars().next()
  }

  pub fn current_pos(&self) -> SourceOffset {
    self.position
  }

  /// Advances the position of `self` by `amount`, truncated at the
  /// end of the input. Returns the substring skipped over.
  pub fn advance(&mut self, mut amount: usize) -> TokenizerMatch<'a> {
    amount = amount.min(self.input.len());
    let match_pos = self.position;
    let (prefix, suffix) = self.input.split_at(amount);
    self.position += amount;
    self.input = suffix;
    TokenizerMatch {
      matched_str: prefix,
      start: match_pos,
      end: match_pos + amount,
    }
  }

  pub fn read_literal(&mut self, literal: &str) -> Option<TokenizerMatch<'a>> {
    self.input.starts_with(literal).then(|| {
      self.advance(literal.len())
    })
  }

  /// If the current position of the string matches the given regex,
  /// returns the matched string and advances the tokenizer state. If
  /// not, returns `None`.
  ///
  /// The regex MUST be anchored at the start of the input. This
  /// function may panic if that precondition is not satisfied.
  pub fn read_regex(&mut self, regex: &Regex) -> Option<TokenizerMatch<'a>> {
    let m = regex.find(self.input)?;
    assert_eq!(m.start(), 0, "Regex must be anchored at the start of the input");
    Some(self.advance(m.len()))
  }

  pub fn consume_spaces(&mut self) {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*").unwrap());
    self.read_regex(&RE).expect("regex should not fail");
  }
}

impl<'a> TokenizerMatch<'a> {
  pub fn as_str(&self) -> &'a str {
    self.matched_str
  }
  pub fn start(&self) -> SourceOffset {
    self.start
  }
  pub fn end(&self) -> SourceOffset {
    self.end
  }
  pub fn span(&self) -> Span {
    Span::new(self.start, self.end)
  }
}
