//! The symbolic unit algebra engine: base dimensions, unit values and
//! their operations, the name registry, and canonical formatting.

pub mod dimension;
pub mod format;
pub mod prefix;
pub mod registry;
pub mod system;
pub mod unit;
