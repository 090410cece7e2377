pub mod catalog_reader;
pub mod event_reader;
pub mod inventory_writer;
