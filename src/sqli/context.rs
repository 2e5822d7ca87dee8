// src/sqli/context.rs
use crate::sqli::types::{BaselineSnapshot, DatabaseDialect};
use tracing::info;

/// Scan-wide state handed to each technique.
///
/// The detected dialect is the only value techniques may change, and it only
/// ever moves from `Unknown` to a concrete dialect.
#[derive(Debug, Clone)]
pub struct ScanContext {
    baseline: BaselineSnapshot,
    dialect: DatabaseDialect,
    waf: Option<String>,
    discovery_attempted: bool,
}

impl ScanContext {
    pub fn new(baseline: BaselineSnapshot, dialect: DatabaseDialect, waf: Option<String>) -> Self {
        Self {
            baseline,
            dialect,
            waf,
            discovery_attempted: false,
        }
    }

    pub fn baseline(&self) -> &BaselineSnapshot {
        &self.baseline
    }

    pub fn dialect(&self) -> DatabaseDialect {
        self.dialect
    }

    pub fn waf(&self) -> Option<&str> {
        self.waf.as_deref()
    }

    /// Returns true if the dialect changed
    pub fn record_dialect(&mut self, dialect: DatabaseDialect) -> bool {
        if self.dialect.is_known() || !dialect.is_known() {
            return false;
        }
        info!("Database detected: {}", dialect);
        self.dialect = dialect;
        true
    }

    /// Discovery probes run at most once per scan
    pub fn begin_discovery(&mut self) -> bool {
        if self.discovery_attempted {
            return false;
        }
        self.discovery_attempted = true;
        true
    }
}
