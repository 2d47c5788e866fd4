//! Outer surfaces: CSV action replay and cart output.

pub mod csv;
pub mod replay;
