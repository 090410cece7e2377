//! Application layer driving the machine at runtime.
//!
//! `VendingMachine` is the single entry point for customer operations. It
//! owns the payment session behind a `tokio` mutex and hands all delayed work
//! (card countdown, simulated charge, resets) to `SessionTimers`, which
//! cancels it by epoch when the session moves on.

pub mod machine;
pub mod timers;
