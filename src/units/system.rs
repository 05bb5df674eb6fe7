
use super::dimension::{BaseDimension, Dimension};
use super::format::{UnitFormat, format_unit};
use super::registry::{NameKind, RegisterError, Registry};
use super::unit::Unit;
use crate::parsing::parser::{ParseError, parse_expression};

use thiserror::Error;

use std::cell::Cell;

/// A unit system owns the base dimensions and the name registry that
/// expressions are parsed against.
///
/// Registration takes `&mut self` and parsing/lookup take `&self`, so
/// exclusive access during mutation is enforced by the borrow
/// checker. The last-status slot for polling-style callers uses a
/// `Cell`, which makes the type `!Sync`; sharing a system across
/// threads requires external synchronization, matching the engine's
/// single-writer contract.
#[derive(Debug)]
pub struct UnitSystem {
  dimensions: Vec<DimensionInfo>,
  time_dimension: Option<BaseDimension>,
  registry: Registry,
  last_status: Cell<Status>,
}

#[derive(Debug, Clone)]
struct DimensionInfo {
  name: String,
  symbol: String,
}

/// Coarse status codes mirroring the polling-style error retrieval of
/// the classic C interface. Every fallible operation also returns a
/// structured error; the status slot merely remembers the kind of the
/// most recent outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Success,
  Syntax,
  UnknownUnit,
  Dimension,
  Exists,
  BadArg,
}

/// An externally loaded named-unit table. The XML reader that
/// produces one of these lives outside the engine; the engine only
/// consumes the finished table.
#[derive(Debug, Clone, Default)]
pub struct UnitDatabase {
  pub dimensions: Vec<DimensionDef>,
  pub entries: Vec<EntryDef>,
}

#[derive(Debug, Clone)]
pub struct DimensionDef {
  pub name: String,
  pub symbol: String,
  pub is_time: bool,
}

#[derive(Debug, Clone)]
pub struct EntryDef {
  pub spelling: String,
  pub kind: NameKind,
  pub definition: UnitDef,
}

/// How a database entry defines its unit: as the canonical unit of a
/// named base dimension, or derived from an expression over entries
/// registered earlier in the table.
#[derive(Debug, Clone)]
pub enum UnitDef {
  Base { dimension: String },
  Derived { expression: String, offset: Option<f64> },
}

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InitError {
  #[error("unknown base dimension '{0}'")]
  UnknownDimension(String),
  #[error("{0}")]
  Parse(#[from] ParseError),
  #[error("{0}")]
  Register(#[from] RegisterError),
}

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum DefineError {
  #[error("unit definition must contain '='")]
  MissingEquals,
  #[error("{0}")]
  Parse(#[from] ParseError),
  #[error("{0}")]
  Register(#[from] RegisterError),
}

impl UnitSystem {
  pub fn new() -> Self {
    Self {
      dimensions: Vec::new(),
      time_dimension: None,
      registry: Registry::new(),
      last_status: Cell::new(Status::Success),
    }
  }

  /// Builds a unit system from an externally loaded database. Derived
  /// entries are parsed in table order, so an entry may reference any
  /// entry defined before it.
  pub fn init(database: UnitDatabase) -> Result<UnitSystem, InitError> {
    let mut system = UnitSystem::new();
    for def in &database.dimensions {
      let dim = system.new_dimension(&def.name, &def.symbol);
      if def.is_time {
        system.time_dimension = Some(dim);
      }
    }
    for entry in &database.entries {
      let unit = match &entry.definition {
        UnitDef::Base { dimension } => {
          let dim = system.find_dimension(dimension)
            .ok_or_else(|| InitError::UnknownDimension(dimension.clone()))?;
          Unit::base(dim)
        }
        UnitDef::Derived { expression, offset } => {
          let parsed = system.parse(expression)?;
          match offset {
            Some(origin) => parsed.with_offset(*origin),
            None => parsed,
          }
        }
      };
      system.register_named(&entry.spelling, entry.kind, unit)?;
    }
    system.last_status.set(Status::Success);
    Ok(system)
  }

  /// Creates a fresh base dimension. The symbol names the canonical
  /// unit of the dimension in formatted output.
  pub fn new_dimension(&mut self, name: &str, symbol: &str) -> BaseDimension {
    let handle = BaseDimension(self.dimensions.len());
    self.dimensions.push(DimensionInfo {
      name: name.to_owned(),
      symbol: symbol.to_owned(),
    });
    handle
  }

  /// Marks a base dimension as the time axis, enabling timestamp
  /// shift units.
  pub fn set_time_dimension(&mut self, dimension: BaseDimension) {
    self.time_dimension = Some(dimension);
  }

  pub fn time_dimension(&self) -> Option<BaseDimension> {
    self.time_dimension
  }

  pub fn dimension_symbol(&self, dimension: BaseDimension) -> Option<&str> {
    self.dimensions.get(dimension.0).map(|info| info.symbol.as_str())
  }

  pub fn dimension_name(&self, dimension: BaseDimension) -> Option<&str> {
    self.dimensions.get(dimension.0).map(|info| info.name.as_str())
  }

  pub fn find_dimension(&self, name: &str) -> Option<BaseDimension> {
    self.dimensions.iter()
      .position(|info| info.name == name)
      .map(BaseDimension)
  }

  /// Parses a unit expression against this system's registry.
  pub fn parse(&self, input: &str) -> Result<Unit, ParseError> {
    let result = parse_expression(self, input);
    self.last_status.set(match &result {
      Ok(_) => Status::Success,
      Err(err) => err.status(),
    });
    result
  }

  pub fn lookup(&self, ident: &str) -> Option<Unit> {
    self.registry.lookup(ident)
  }

  pub fn register_named(&mut self, spelling: &str, kind: NameKind, unit: Unit) -> Result<(), RegisterError> {
    let result = self.registry.register(spelling, kind, unit);
    self.last_status.set(match &result {
      Ok(()) => Status::Success,
      Err(RegisterError::AlreadyExists(_)) => Status::Exists,
      Err(_) => Status::BadArg,
    });
    result
  }

  /// Registers a custom unit from a definition string of the form
  /// `"name = expression"`: the string is split on the first `=`, the
  /// name is trimmed, the right-hand side is parsed, and the trimmed
  /// name is registered to the result.
  pub fn define(&mut self, definition: &str) -> Result<(), DefineError> {
    let Some((name, expression)) = definition.split_once('=') else {
      self.last_status.set(Status::BadArg);
      return Err(DefineError::MissingEquals);
    };
    let unit = self.parse(expression.trim())?;
    self.register_named(name.trim(), NameKind::Name, unit)?;
    Ok(())
  }

  pub fn format(&self, unit: &Unit, mode: UnitFormat) -> String {
    format_unit(self, unit, mode)
  }

  /// The status of the most recent fallible operation.
  pub fn status(&self) -> Status {
    self.last_status.get()
  }
}

impl Default for UnitSystem {
  fn default() -> Self {
    Self::new()
  }
}

/// A built-in SI-flavored unit table, standing in for the external
/// database loader. Covers the seven SI base dimensions plus a set of
/// common named and derived units.
pub fn si_system() -> UnitSystem {
  use num::pow::Pow;

  let mut system = UnitSystem::new();
  let length = system.new_dimension("length", "m");
  let mass = system.new_dimension("mass", "kg");
  let time = system.new_dimension("time", "s");
  let temperature = system.new_dimension("temperature", "K");
  let current = system.new_dimension("current", "A");
  let intensity = system.new_dimension("luminous intensity", "cd");
  let amount = system.new_dimension("amount of substance", "mol");
  system.set_time_dimension(time);

  let meter = Unit::base(length);
  let kilogram = Unit::base(mass);
  let second = Unit::base(time);
  let kelvin = Unit::base(temperature);
  let length_dim = Dimension::singleton(length);
  let mass_dim = Dimension::singleton(mass);
  let time_dim = Dimension::singleton(time);

  let energy = (&length_dim).pow(2) * mass_dim.clone() * (&time_dim).pow(-2);
  let force = length_dim.clone() * mass_dim * (&time_dim).pow(-2);
  let power = energy.clone() * (&time_dim).pow(-1);
  let pressure = force.clone() * (&length_dim).pow(-2);
  let frequency = (&time_dim).pow(-1);
  let volume = (&length_dim).pow(3);

  let entries: Vec<(&str, NameKind, Unit)> = vec![
    // Base units
    ("m", NameKind::Symbol, meter.clone()),
    ("meter", NameKind::Name, meter.clone()),
    ("metre", NameKind::Name, meter.clone()),
    ("g", NameKind::Symbol, kilogram.clone().scaled(1e-3)),
    ("gram", NameKind::Name, kilogram.clone().scaled(1e-3)),
    ("s", NameKind::Symbol, second.clone()),
    ("second", NameKind::Name, second.clone()),
    ("sec", NameKind::Name, second.clone()),
    ("K", NameKind::Symbol, kelvin.clone()),
    ("kelvin", NameKind::Name, kelvin.clone()),
    ("A", NameKind::Symbol, Unit::base(current)),
    ("ampere", NameKind::Name, Unit::base(current)),
    ("cd", NameKind::Symbol, Unit::base(intensity)),
    ("candela", NameKind::Name, Unit::base(intensity)),
    ("mol", NameKind::Symbol, Unit::base(amount)),
    ("mole", NameKind::Name, Unit::base(amount)),
    // Time units
    ("min", NameKind::Symbol, second.clone().scaled(60.0)),
    ("minute", NameKind::Name, second.clone().scaled(60.0)),
    ("h", NameKind::Symbol, second.clone().scaled(3600.0)),
    ("hour", NameKind::Name, second.clone().scaled(3600.0)),
    ("hr", NameKind::Name, second.clone().scaled(3600.0)),
    ("d", NameKind::Symbol, second.clone().scaled(86400.0)),
    ("day", NameKind::Name, second.clone().scaled(86400.0)),
    ("year", NameKind::Name, second.clone().scaled(31557600.0)),
    // Shifted temperature scales
    ("degC", NameKind::Symbol, kelvin.clone().with_offset(273.15)),
    ("celsius", NameKind::Name, kelvin.clone().with_offset(273.15)),
    ("fahrenheit", NameKind::Name, kelvin.clone().scaled(5.0 / 9.0).with_offset(45967.0 / 180.0)),
    // Derived units
    ("Hz", NameKind::Symbol, Unit::new(frequency.clone(), 1.0)),
    ("hertz", NameKind::Name, Unit::new(frequency, 1.0)),
    ("N", NameKind::Symbol, Unit::new(force.clone(), 1.0)),
    ("newton", NameKind::Name, Unit::new(force, 1.0)),
    ("J", NameKind::Symbol, Unit::new(energy.clone(), 1.0)),
    ("joule", NameKind::Name, Unit::new(energy, 1.0)),
    ("W", NameKind::Symbol, Unit::new(power.clone(), 1.0)),
    ("watt", NameKind::Name, Unit::new(power, 1.0)),
    ("Pa", NameKind::Symbol, Unit::new(pressure.clone(), 1.0)),
    ("pascal", NameKind::Name, Unit::new(pressure, 1.0)),
    ("L", NameKind::Symbol, Unit::new(volume.clone(), 1e-3)),
    ("liter", NameKind::Name, Unit::new(volume, 1e-3)),
    // Customary units
    ("lb", NameKind::Symbol, kilogram.clone().scaled(0.45359237)),
    ("pound", NameKind::Name, kilogram.clone().scaled(0.45359237)),
    ("in", NameKind::Symbol, meter.clone().scaled(0.0254)),
    ("inch", NameKind::Name, meter.clone().scaled(0.0254)),
    ("ft", NameKind::Symbol, meter.clone().scaled(0.3048)),
    ("foot", NameKind::Name, meter.clone().scaled(0.3048)),
    ("mi", NameKind::Symbol, meter.clone().scaled(1609.344)),
    ("mile", NameKind::Name, meter.clone().scaled(1609.344)),
    ("perch", NameKind::Name, meter.clone().scaled(5.0292)),
  ];
  for (spelling, kind, unit) in entries {
    // The static table contains no conflicts or invalid spellings.
    system.register_named(spelling, kind, unit)
      .expect("built-in unit table is well-formed");
  }
  system.last_status.set(Status::Success);
  system
}
