
use super::prefix::SI_PREFIXES;
use super::unit::Unit;

use thiserror::Error;

use std::collections::HashMap;

/// Whether a registry entry is a symbol ("m") or a full name
/// ("meter"). Symbols match case-sensitively; names match
/// case-insensitively and also answer to a trailing plural "s".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
  Name,
  Symbol,
}

/// The name/symbol lookup table owned by a unit system. The registry
/// is append-only: entries can be added but never removed or rebound.
/// Registration requires `&mut` access and lookups take `&`, so the
/// borrow checker enforces the reader-writer discipline the engine
/// needs.
#[derive(Debug, Clone, Default)]
pub struct Registry {
  symbols: HashMap<String, Unit>,
  // Keyed by the lowercased spelling.
  names: HashMap<String, Unit>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegisterError {
  #[error("'{0}' is already bound to a different unit")]
  AlreadyExists(String),
  #[error("'{0}' is not a valid unit spelling")]
  InvalidName(String),
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Binds a spelling to a unit. Re-registering an identical
  /// definition is accepted as a no-op; binding an existing spelling
  /// to a different unit is an error.
  pub fn register(&mut self, spelling: &str, kind: NameKind, unit: Unit) -> Result<(), RegisterError> {
    if !is_valid_spelling(spelling) {
      return Err(RegisterError::InvalidName(spelling.to_owned()));
    }
    let (table, key) = match kind {
      NameKind::Symbol => (&mut self.symbols, spelling.to_owned()),
      NameKind::Name => (&mut self.names, spelling.to_lowercase()),
    };
    match table.get(&key) {
      Some(existing) if *existing == unit => Ok(()),
      Some(_) => Err(RegisterError::AlreadyExists(spelling.to_owned())),
      None => {
        table.insert(key, unit);
        Ok(())
      }
    }
  }

  /// Resolves an identifier to a unit. Tries, in order: exact symbol
  /// match, case-insensitive name match, plural name match, and
  /// finally metric-prefix splits (prefix symbols against symbols,
  /// prefix names against names).
  pub fn lookup(&self, ident: &str) -> Option<Unit> {
    if let Some(unit) = self.lookup_symbol(ident) {
      return Some(unit);
    }
    self.lookup_name(&ident.to_lowercase())
  }

  fn lookup_symbol(&self, ident: &str) -> Option<Unit> {
    if let Some(unit) = self.symbols.get(ident) {
      return Some(unit.clone());
    }
    for prefix in &SI_PREFIXES {
      if let Some(rest) = ident.strip_prefix(prefix.symbol) {
        if !rest.is_empty() {
          if let Some(unit) = self.lookup_symbol(rest) {
            return Some(prefix.apply(unit));
          }
        }
      }
    }
    None
  }

  // `lower` must already be lowercased.
  fn lookup_name(&self, lower: &str) -> Option<Unit> {
    if let Some(unit) = self.names.get(lower) {
      return Some(unit.clone());
    }
    if let Some(singular) = lower.strip_suffix('s') {
      if let Some(unit) = self.names.get(singular) {
        return Some(unit.clone());
      }
    }
    for prefix in &SI_PREFIXES {
      if let Some(rest) = lower.strip_prefix(prefix.name) {
        if !rest.is_empty() {
          if let Some(unit) = self.lookup_name(rest) {
            return Some(prefix.apply(unit));
          }
        }
      }
    }
    None
  }
}

fn is_valid_spelling(spelling: &str) -> bool {
  !spelling.is_empty()
    && spelling.chars().all(|c| c.is_alphabetic() || c == '_' || c == '°' || c == 'µ')
}
