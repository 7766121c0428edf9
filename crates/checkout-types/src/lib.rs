//! checkout-types: domain model and outbound ports for the checkout engine.

pub mod domain;
pub mod ports;
