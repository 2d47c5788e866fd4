//! Application layer orchestrating carts, sessions and checkout.
//!
//! `CartService` owns the displayed cart and reconciles it with the
//! authoritative store for the current identity. `CheckoutFlow` drives a
//! single purchase from customer details to a placed order.

pub mod cart_service;
pub mod checkout;
pub mod local_cart;
pub mod session;
