// src/sqli/tester.rs
use crate::sqli::config::ScanConfig;
use crate::sqli::context::ScanContext;
use crate::sqli::error::ScanError;
use crate::sqli::fingerprint::{find_sql_error, DatabaseFingerprinter};
use crate::sqli::heuristics::{BooleanMeasurement, Heuristics};
use crate::sqli::http_client::HttpClient;
use crate::sqli::payloads::{render, PayloadCatalog, RenderContext};
use crate::sqli::types::*;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

pub const TIME_PAYLOADS_PER_DIALECT: usize = 3;
pub const ERROR_PAYLOAD_LIMIT: usize = 8;
pub const BOOLEAN_PAIR_LIMIT: usize = 5;
pub const BYPASS_PAYLOAD_LIMIT: usize = 8;

/// Runs the detection techniques against one parameter at a time.
///
/// Requests are strictly sequential: one in flight at any moment, so a slow
/// response can only come from the payload under test.
pub struct SqliTester {
    http_client: HttpClient,
    config: Arc<ScanConfig>,
    cancel: watch::Receiver<bool>,
}

impl SqliTester {
    pub fn new(
        config: Arc<ScanConfig>,
        target: Arc<ScanTarget>,
        cancel: watch::Receiver<bool>,
    ) -> Result<Self, ScanError> {
        PayloadCatalog::validate()?;
        let http_client = HttpClient::new(config.clone(), target)?;

        Ok(Self {
            http_client,
            config,
            cancel,
        })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Sends the unmodified request. Failure here ends the scan.
    pub async fn capture_baseline(&self) -> Result<BaselineSnapshot, ScanError> {
        let probe = self.http_client.baseline().await;
        match probe.outcome {
            ProbeOutcome::Response(response) => Ok(BaselineSnapshot::new(response, probe.elapsed)),
            ProbeOutcome::Unreachable(reason) => Err(ScanError::TargetUnreachable(reason.to_string())),
        }
    }

    /// Every technique, in fixed order. Union and bypass need deep-scan mode.
    pub async fn test_parameter(
        &self,
        ctx: &mut ScanContext,
        parameter: &Parameter,
    ) -> Result<Vec<TestResult>, ScanError> {
        let mut results = Vec::new();

        results.extend(self.test_time_based(ctx, parameter).await?);
        results.extend(self.test_error_based(ctx, parameter).await?);
        results.extend(self.test_boolean_based(ctx, parameter).await?);

        if self.config.deep_scan {
            results.extend(self.test_union_based(ctx, parameter).await?);
            results.extend(self.test_bypass(ctx, parameter).await?);
        }

        Ok(results)
    }

    /// Fingerprints error pages provoked by a few dialect-specific probes.
    /// Produces no results; at most once per scan.
    pub async fn discover_dialect(&self, ctx: &mut ScanContext, parameter: &Parameter) {
        if ctx.dialect().is_known() || !ctx.begin_discovery() {
            return;
        }

        debug!("Probing '{}' to identify the database", parameter.name);
        for (i, payload) in PayloadCatalog::dialect_discovery().iter().enumerate() {
            if self.is_cancelled() {
                return;
            }
            self.pace(i).await;

            let probe = self.http_client.probe(parameter, payload.template).await;
            let Some(response) = probe.response() else {
                self.log_unreachable(parameter, "dialect discovery", payload.template, &probe);
                continue;
            };

            if ctx.record_dialect(DatabaseFingerprinter::detect(&response.body)) {
                return;
            }
        }

        info!("Could not detect specific database");
    }

    pub async fn test_time_based(
        &self,
        ctx: &mut ScanContext,
        parameter: &Parameter,
    ) -> Result<Vec<TestResult>, ScanError> {
        let mut results = Vec::new();
        info!("[TIME-BASED] Testing '{}' ({})", parameter.name, parameter.kind);

        self.discover_dialect(ctx, parameter).await;

        let delay = self.config.delay_secs;
        let candidates: Vec<DatabaseDialect> = if ctx.dialect().is_known() {
            vec![ctx.dialect()]
        } else {
            DatabaseDialect::ALL.to_vec()
        };

        let mut sent = 0;
        for dialect in candidates {
            for payload in PayloadCatalog::time_based(dialect)
                .iter()
                .take(TIME_PAYLOADS_PER_DIALECT)
            {
                if self.is_cancelled() {
                    return Ok(results);
                }
                self.pace(sent).await;
                sent += 1;

                let rendered = render(
                    payload.template,
                    &RenderContext::new(&parameter.original_value, Some(delay)),
                )?;
                let probe = self.http_client.probe(parameter, &rendered).await;

                let mut details = format!("[{}] {}", dialect, payload.label);
                if let ProbeOutcome::Unreachable(reason) = &probe.outcome {
                    if *reason == ProbeFailure::Timeout {
                        details.push_str(" (timed out)");
                    }
                    self.log_unreachable(parameter, "time-based", &rendered, &probe);
                }

                let vulnerable = Heuristics::time_delay_observed(probe.elapsed, delay);
                self.log_verdict(parameter, InjectionType::TimeBased, &details, vulnerable);

                results.push(
                    TestResult::new(parameter, InjectionType::TimeBased, rendered, vulnerable, details)
                        .with_response_time(probe.elapsed)
                        .with_database(dialect),
                );

                if vulnerable {
                    ctx.record_dialect(dialect);
                    return Ok(results);
                }
            }
        }

        Ok(results)
    }

    pub async fn test_error_based(
        &self,
        ctx: &mut ScanContext,
        parameter: &Parameter,
    ) -> Result<Vec<TestResult>, ScanError> {
        let mut results = Vec::new();
        info!("[ERROR-BASED] Testing '{}' ({})", parameter.name, parameter.kind);

        self.discover_dialect(ctx, parameter).await;

        let payloads = PayloadCatalog::error_based(ctx.dialect());
        for (i, payload) in payloads.iter().take(ERROR_PAYLOAD_LIMIT).enumerate() {
            if self.is_cancelled() {
                break;
            }
            self.pace(i).await;

            let rendered = render(
                payload.template,
                &RenderContext::new(&parameter.original_value, None),
            )?;
            let probe = self.http_client.probe(parameter, &rendered).await;
            let Some(response) = probe.response() else {
                self.log_unreachable(parameter, "error-based", &rendered, &probe);
                continue;
            };

            let evidence = find_sql_error(&response.body);
            let detected = DatabaseFingerprinter::detect(&response.body);
            let vulnerable = evidence.is_some();

            if vulnerable {
                ctx.record_dialect(detected);
            }
            self.log_verdict(parameter, InjectionType::ErrorBased, payload.label, vulnerable);

            results.push(
                TestResult::new(parameter, InjectionType::ErrorBased, rendered, vulnerable, payload.label)
                    .with_evidence(evidence)
                    .with_response_time(probe.elapsed)
                    .with_database(detected),
            );
        }

        Ok(results)
    }

    pub async fn test_boolean_based(
        &self,
        ctx: &mut ScanContext,
        parameter: &Parameter,
    ) -> Result<Vec<TestResult>, ScanError> {
        let mut results = Vec::new();
        info!("[BOOLEAN-BASED] Testing '{}' ({})", parameter.name, parameter.kind);

        let render_ctx = RenderContext::new(&parameter.original_value, None);
        for (i, pair) in PayloadCatalog::boolean_pairs()
            .iter()
            .take(BOOLEAN_PAIR_LIMIT)
            .enumerate()
        {
            if self.is_cancelled() {
                break;
            }
            self.pace(i).await;

            let true_payload = render(pair.true_template, &render_ctx)?;
            let false_payload = render(pair.false_template, &render_ctx)?;

            let true_probe = self.http_client.probe(parameter, &true_payload).await;
            let false_probe = self.http_client.probe(parameter, &false_payload).await;

            self.log_unreachable(parameter, "boolean-based", &true_payload, &true_probe);
            self.log_unreachable(parameter, "boolean-based", &false_payload, &false_probe);
            let (Some(true_resp), Some(false_resp)) = (true_probe.response(), false_probe.response())
            else {
                continue;
            };

            let m = BooleanMeasurement::new(true_resp.body_len(), false_resp.body_len(), ctx.baseline().length);
            let vulnerable = Heuristics::boolean_differential(&m, true_resp.status, false_resp.status);
            let details = format!(
                "TRUE len: {}, FALSE len: {}, diff: {}",
                m.true_len, m.false_len, m.diff
            );
            self.log_verdict(parameter, InjectionType::BooleanBased, &details, vulnerable);

            results.push(
                TestResult::new(
                    parameter,
                    InjectionType::BooleanBased,
                    format!("TRUE: {}", true_payload),
                    vulnerable,
                    details,
                )
                .with_response_time(true_probe.elapsed)
                .with_database(ctx.dialect()),
            );
        }

        Ok(results)
    }

    pub async fn test_union_based(
        &self,
        ctx: &mut ScanContext,
        parameter: &Parameter,
    ) -> Result<Vec<TestResult>, ScanError> {
        let mut results = Vec::new();
        info!("[UNION-BASED] Testing '{}' ({})", parameter.name, parameter.kind);

        for (i, union) in PayloadCatalog::union_probes().iter().enumerate() {
            if self.is_cancelled() {
                break;
            }
            self.pace(i).await;

            let rendered = render(
                union.template,
                &RenderContext::new(&parameter.original_value, None),
            )?;
            let probe = self.http_client.probe(parameter, &rendered).await;
            let Some(response) = probe.response() else {
                self.log_unreachable(parameter, "union-based", &rendered, &probe);
                continue;
            };

            let vulnerable = Heuristics::union_hit(response, ctx.baseline());
            let details = format!("Columns: {}", union.columns);
            self.log_verdict(parameter, InjectionType::UnionBased, &details, vulnerable);

            results.push(
                TestResult::new(parameter, InjectionType::UnionBased, rendered, vulnerable, details)
                    .with_response_time(probe.elapsed)
                    .with_database(ctx.dialect())
                    .with_columns(union.columns),
            );

            if vulnerable {
                break;
            }
        }

        Ok(results)
    }

    pub async fn test_bypass(
        &self,
        ctx: &mut ScanContext,
        parameter: &Parameter,
    ) -> Result<Vec<TestResult>, ScanError> {
        let mut results = Vec::new();
        info!("[BYPASS] Testing '{}' ({})", parameter.name, parameter.kind);

        for (i, payload) in PayloadCatalog::bypass()
            .iter()
            .take(BYPASS_PAYLOAD_LIMIT)
            .enumerate()
        {
            if self.is_cancelled() {
                break;
            }
            self.pace(i).await;

            let rendered = render(
                payload.template,
                &RenderContext::new(&parameter.original_value, None),
            )?;
            let probe = self.http_client.probe(parameter, &rendered).await;
            let Some(response) = probe.response() else {
                self.log_unreachable(parameter, "bypass", &rendered, &probe);
                continue;
            };

            let vulnerable = Heuristics::bypass_worked(response, ctx.baseline());
            self.log_verdict(parameter, InjectionType::Bypass, payload.label, vulnerable);

            results.push(
                TestResult::new(parameter, InjectionType::Bypass, rendered, vulnerable, payload.label)
                    .with_evidence(find_sql_error(&response.body))
                    .with_response_time(probe.elapsed)
                    .with_database(ctx.dialect()),
            );
        }

        Ok(results)
    }

    /// Pause between payloads so the target is not hammered
    async fn pace(&self, index: usize) {
        if index > 0 && self.config.payload_delay_ms > 0 {
            sleep(Duration::from_millis(self.config.payload_delay_ms)).await;
        }
    }

    /// Logs the probe only if it got no response
    fn log_unreachable(&self, parameter: &Parameter, technique: &str, payload: &str, probe: &ProbeResult) {
        if let ProbeOutcome::Unreachable(reason) = &probe.outcome {
            warn!(
                parameter = %parameter.name,
                technique,
                payload,
                "Probe failed ({}), no signal",
                reason
            );
        }
    }

    fn log_verdict(&self, parameter: &Parameter, technique: InjectionType, what: &str, vulnerable: bool) {
        if vulnerable {
            info!("VULNERABLE: {} on '{}' - {}", technique, parameter.name, what);
        } else {
            debug!("safe: {} on '{}' - {}", technique, parameter.name, what);
        }
    }
}
