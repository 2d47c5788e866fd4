//! Domain layer: value objects, entities and the ports the engine talks through.

pub mod cart;
pub mod checkout;
pub mod money;
pub mod order;
pub mod ports;
pub mod product;
pub mod session;
