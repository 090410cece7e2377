//! Domain layer: value types, the payment session state machine and the
//! ports the machine talks to.

pub mod denomination;
pub mod drink;
pub mod event;
pub mod money;
pub mod ports;
pub mod session;
