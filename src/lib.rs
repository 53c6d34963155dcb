pub mod config;
pub mod detection_core;
pub mod sqlite_pragma;
