// src/sqli/mod.rs
// SQL injection scanner: baseline capture, fingerprinting and differential detection
// SAFETY: for AUTHORIZED testing only

pub mod config;
pub mod context;
pub mod error;
pub mod fingerprint;
pub mod heuristics;
pub mod http_client;
pub mod payloads;
pub mod report;
pub mod tester;
pub mod types;

use config::ScanConfig;
use context::ScanContext;
use error::ScanError;
use fingerprint::{DatabaseFingerprinter, WafDetector};
use report::ScanReport;
use std::sync::Arc;
use tester::SqliTester;
use tokio::sync::watch;
use tracing::{error, info, warn};
use types::{Parameter, ScanTarget};

/// Lifecycle of a single scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Initializing,
    BaselineCaptured,
    PerParameterScanning,
    Completed,
    Aborted,
}

/// Drives one scan: baseline, fingerprinting, then every parameter through
/// every technique, in order.
pub struct Scanner {
    config: Arc<ScanConfig>,
    target: Arc<ScanTarget>,
    tester: SqliTester,
    state: ScanState,
}

impl Scanner {
    /// Validates configuration and builds the shared HTTP client.
    /// `cancel` flips to `true` to stop at the next payload boundary.
    pub fn new(config: ScanConfig, cancel: watch::Receiver<bool>) -> Result<Self, ScanError> {
        config.validate()?;
        let target = Arc::new(config.target()?);
        let config = Arc::new(config);
        let tester = SqliTester::new(config.clone(), target.clone(), cancel)?;

        Ok(Self {
            config,
            target,
            tester,
            state: ScanState::Initializing,
        })
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        self.target.parameters()
    }

    pub async fn run(&mut self) -> Result<ScanReport, ScanError> {
        info!("🔍 Starting SQL injection scan");
        info!("Target: {} ({})", self.config.url, self.config.method);

        let parameters = self.parameters();
        info!(
            "Parameters: {:?}",
            parameters.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
        );

        let baseline = match self.tester.capture_baseline().await {
            Ok(baseline) => baseline,
            Err(e) => {
                error!("Cannot connect to target: {}", e);
                return Err(self.abort(e));
            }
        };
        self.state = ScanState::BaselineCaptured;
        info!(
            "Baseline: status {}, {:.2}s, {} bytes",
            baseline.status(),
            baseline.elapsed,
            baseline.length
        );

        let waf = if self.config.detect_waf {
            WafDetector::detect(&baseline.response)
        } else {
            None
        };
        if let Some(vendor) = &waf {
            warn!("WAF detected: {}", vendor);
        }

        let dialect = DatabaseFingerprinter::detect(&baseline.response.body);
        if dialect.is_known() {
            info!("Database detected from baseline: {}", dialect);
        }

        let mut ctx = ScanContext::new(baseline, dialect, waf);
        self.state = ScanState::PerParameterScanning;

        if parameters.is_empty() {
            warn!("No parameters found to test");
        }

        let mut results = Vec::new();
        for parameter in &parameters {
            if self.tester.is_cancelled() {
                break;
            }
            info!("TESTING: {} ({})", parameter.name, parameter.kind);
            match self.tester.test_parameter(&mut ctx, parameter).await {
                Ok(found) => results.extend(found),
                Err(e) => {
                    error!("Scan aborted while testing '{}': {}", parameter.name, e);
                    return Err(self.abort(e));
                }
            }
        }

        if self.tester.is_cancelled() {
            warn!("Scan interrupted, reporting {} results collected so far", results.len());
        }

        self.state = ScanState::Completed;
        let report = ScanReport::build(&self.config, &ctx, results);
        info!(
            "✅ Scan complete: {} tests, {} vulnerabilities",
            report.summary.total_tests, report.summary.vulnerabilities_found
        );
        Ok(report)
    }

    fn abort(&mut self, error: ScanError) -> ScanError {
        self.state = ScanState::Aborted;
        error
    }
}

/// Runs a scan that cannot be interrupted
pub async fn scan_target(config: ScanConfig) -> Result<ScanReport, ScanError> {
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    Scanner::new(config, cancel_rx)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> Scanner {
        let config = ScanConfig {
            url: "http://example.com/item?id=1".to_string(),
            ..ScanConfig::default()
        };
        let (_tx, rx) = watch::channel(false);
        Scanner::new(config, rx).unwrap()
    }

    #[test]
    fn test_new_scanner_is_initializing() {
        let scanner = scanner();
        assert_eq!(scanner.state(), ScanState::Initializing);
        assert_eq!(scanner.parameters().len(), 1);
    }

    #[test]
    fn test_technique_error_aborts_scan() {
        let mut scanner = scanner();
        scanner.state = ScanState::PerParameterScanning;

        let err = scanner.abort(ScanError::Render("missing value for {delay}".to_string()));

        assert!(matches!(err, ScanError::Render(_)));
        assert_eq!(scanner.state(), ScanState::Aborted);
    }
}
