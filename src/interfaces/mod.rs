//! Adapters between the outside world and the machine: CSV scripts and
//! catalogs in, status lines and inventory reports out.

pub mod console;
pub mod csv;
