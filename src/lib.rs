// src/lib.rs
pub mod sqli;

pub use sqli::config::ScanConfig;
pub use sqli::error::ScanError;
pub use sqli::report::{OutputFormat, ScanReport};
pub use sqli::{scan_target, ScanState, Scanner};
