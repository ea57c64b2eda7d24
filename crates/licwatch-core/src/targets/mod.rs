//! Monitored license servers, read from a flat `name,server,port` list.

mod loader;

pub use loader::{load_targets, parse_targets, LicenseTarget};
