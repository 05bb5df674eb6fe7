//! Parser and symbolic algebra engine for units of measure.
//!
//! A [`units::system::UnitSystem`] owns a set of base dimensions and a
//! registry of named units. Expressions such as `kg m s^-2`, `m/s`,
//! `celsius @ 20` or `seconds since 2000-01-01` are parsed against the
//! system into [`units::unit::Unit`] values, which can be combined
//! with the algebra operations and rendered back to canonical strings.
//!
//! ```
//! use unitexpr::units::format::UnitFormat;
//! use unitexpr::units::system::si_system;
//!
//! let system = si_system();
//! let speed = system.parse("km/h").unwrap();
//! assert_eq!(system.format(&speed, UnitFormat::Ascii), "0.2777777777777778 m s^-1");
//! ```

pub mod parsing;
pub mod units;

pub use parsing::parser::{ParseError, parse_expression};
pub use units::format::UnitFormat;
pub use units::system::{Status, UnitSystem, si_system};
pub use units::unit::Unit;
