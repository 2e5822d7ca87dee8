// src/sqli/report.rs
use crate::sqli::config::ScanConfig;
use crate::sqli::context::ScanContext;
use crate::sqli::error::ScanError;
use crate::sqli::types::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

const PAYLOAD_PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(format!("Unsupported output format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanInfo {
    pub target: String,
    pub method: HttpMethod,
    pub timestamp: String,
    pub database_detected: DatabaseDialect,
    pub waf_detected: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSummary {
    pub total_tests: usize,
    pub vulnerabilities_found: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityEntry {
    pub parameter: String,
    #[serde(rename = "type")]
    pub injection_type: InjectionType,
    pub payload: String,
    pub severity: Severity,
    pub details: String,
    pub evidence: String,
    pub response_time: f64,
    pub database: DatabaseDialect,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub columns: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestEntry {
    pub parameter: String,
    #[serde(rename = "type")]
    pub injection_type: InjectionType,
    pub vulnerable: bool,
    pub severity: Severity,
}

/// Complete scan output. `results` keeps the full ordered sequence in memory;
/// the serialized form carries the stable report fields only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_info: ScanInfo,
    pub summary: ReportSummary,
    pub vulnerabilities: Vec<VulnerabilityEntry>,
    pub all_tests: Vec<TestEntry>,
    #[serde(skip)]
    pub results: Vec<TestResult>,
}

impl ScanReport {
    pub fn build(config: &ScanConfig, ctx: &ScanContext, results: Vec<TestResult>) -> Self {
        let scan_info = ScanInfo {
            target: config.url.clone(),
            method: config.method,
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            database_detected: ctx.dialect(),
            waf_detected: ctx.waf().map(str::to_string),
        };
        Self::from_results(scan_info, results)
    }

    pub fn from_results(scan_info: ScanInfo, results: Vec<TestResult>) -> Self {
        let count = |severity: Severity| {
            results
                .iter()
                .filter(|r| r.vulnerable && r.severity == severity)
                .count()
        };

        let summary = ReportSummary {
            total_tests: results.len(),
            vulnerabilities_found: results.iter().filter(|r| r.vulnerable).count(),
            critical: count(Severity::Critical),
            high: count(Severity::High),
            medium: count(Severity::Medium),
        };

        let vulnerabilities = results
            .iter()
            .filter(|r| r.vulnerable)
            .map(|r| VulnerabilityEntry {
                parameter: r.parameter.clone(),
                injection_type: r.injection_type,
                payload: r.payload.clone(),
                severity: r.severity,
                details: r.details.clone(),
                evidence: r.evidence.clone().unwrap_or_default(),
                response_time: r.response_time,
                database: r.database,
                columns: r.columns,
            })
            .collect();

        let all_tests = results
            .iter()
            .map(|r| TestEntry {
                parameter: r.parameter.clone(),
                injection_type: r.injection_type,
                vulnerable: r.vulnerable,
                severity: r.severity,
            })
            .collect();

        Self {
            scan_info,
            summary,
            vulnerabilities,
            all_tests,
            results,
        }
    }

    /// Vulnerable results, in emission order
    pub fn findings(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.vulnerable)
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, ScanError> {
        Ok(match format {
            OutputFormat::Json => serde_json::to_string_pretty(self)?,
            OutputFormat::Yaml => serde_yaml::to_string(self)?,
        })
    }

    pub fn write(&self, path: &Path, format: OutputFormat) -> Result<(), ScanError> {
        std::fs::write(path, self.render(format)?)?;
        Ok(())
    }

    pub fn default_filename(format: OutputFormat) -> String {
        format!(
            "sqli_report_{}.{}",
            chrono::Local::now().format("%Y%m%d_%H%M%S"),
            format.extension()
        )
    }

    /// Human-readable summary, findings grouped by severity
    pub fn summary_text(&self) -> String {
        let mut out = String::new();
        let rule = "═".repeat(60);

        out.push_str(&format!("\n{}\n", rule));
        out.push_str("                 SCAN SUMMARY\n");
        out.push_str(&format!("{}\n\n", rule));
        out.push_str(&format!("Target: {}\n", self.scan_info.target));
        out.push_str(&format!("Database: {}\n", self.scan_info.database_detected));
        if let Some(waf) = &self.scan_info.waf_detected {
            out.push_str(&format!("WAF: {}\n", waf));
        }
        out.push_str(&format!("Total tests: {}\n", self.summary.total_tests));
        out.push_str(&format!("Vulnerabilities: {}\n", self.summary.vulnerabilities_found));

        if self.summary.vulnerabilities_found > 0 {
            out.push_str("\n⚠️  VULNERABILITIES FOUND:\n");
            out.push_str(&format!("{}\n", "-".repeat(50)));

            for severity in [Severity::Critical, Severity::High, Severity::Medium, Severity::Low] {
                let group: Vec<_> = self.findings().filter(|r| r.severity == severity).collect();
                if group.is_empty() {
                    continue;
                }

                out.push_str(&format!("\n[{}]\n", severity));
                for finding in group {
                    out.push_str(&format!(
                        "  • {} on '{}'\n",
                        finding.injection_type, finding.parameter
                    ));
                    out.push_str(&format!("    Payload: {}\n", preview(&finding.payload)));
                    if let Some(evidence) = &finding.evidence {
                        out.push_str(&format!("    Evidence: {}\n", evidence));
                    }
                }
            }
        }

        out.push_str("\n📋 RECOMMENDATIONS:\n");
        out.push_str(&format!("{}\n", "-".repeat(50)));
        for rec in [
            "1. Use parameterized queries / prepared statements",
            "2. Implement strict input validation (allowlist approach)",
            "3. Use an ORM or query builder with proper escaping",
            "4. Apply least privilege for database accounts",
            "5. Deploy a Web Application Firewall (WAF)",
            "6. Enable database query logging and monitoring",
            "7. Regular security audits and penetration testing",
        ] {
            out.push_str(&format!("   {}\n", rec));
        }

        out
    }

    pub fn print_summary(&self) {
        println!("{}", self.summary_text());
    }
}

fn preview(payload: &str) -> String {
    if payload.chars().count() > PAYLOAD_PREVIEW_CHARS {
        let head: String = payload.chars().take(PAYLOAD_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        payload.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str) -> Parameter {
        Parameter {
            name: name.to_string(),
            kind: ParameterKind::Query,
            original_value: "1".to_string(),
        }
    }

    fn info() -> ScanInfo {
        ScanInfo {
            target: "http://example.com/?id=1".to_string(),
            method: HttpMethod::GET,
            timestamp: "2026-10-18 12:00:00".to_string(),
            database_detected: DatabaseDialect::MySQL,
            waf_detected: None,
        }
    }

    fn results() -> Vec<TestResult> {
        let id = param("id");
        vec![
            TestResult::new(&id, InjectionType::TimeBased, "' OR SLEEP(3)--", true, "[MySQL] SLEEP OR")
                .with_response_time(3.01)
                .with_database(DatabaseDialect::MySQL),
            TestResult::new(&id, InjectionType::ErrorBased, "'", true, "Single quote")
                .with_evidence(Some("SQL syntax".to_string())),
            TestResult::new(&id, InjectionType::ErrorBased, "\"", false, "Double quote"),
            TestResult::new(&id, InjectionType::Bypass, "' oR 1=1--", true, "Mixed case"),
            TestResult::new(&id, InjectionType::UnionBased, "' UNION SELECT NULL,NULL--", true, "Columns: 2")
                .with_columns(2),
        ]
    }

    #[test]
    fn test_summary_counts() {
        let report = ScanReport::from_results(info(), results());
        assert_eq!(
            report.summary,
            ReportSummary {
                total_tests: 5,
                vulnerabilities_found: 4,
                critical: 1,
                high: 2,
                medium: 1,
            }
        );
        assert_eq!(report.vulnerabilities.len(), 4);
        assert_eq!(report.all_tests.len(), 5);
    }

    #[test]
    fn test_json_field_names() {
        let report = ScanReport::from_results(info(), results());
        let value: serde_json::Value =
            serde_json::from_str(&report.render(OutputFormat::Json).unwrap()).unwrap();

        assert_eq!(value["scan_info"]["database_detected"], "MySQL");
        assert!(value["scan_info"]["waf_detected"].is_null());
        assert_eq!(value["summary"]["vulnerabilities_found"], 4);

        let first = &value["vulnerabilities"][0];
        assert_eq!(first["type"], "Time-based Blind");
        assert_eq!(first["severity"], "CRITICAL");
        assert_eq!(first["evidence"], "");
        assert!(first.get("columns").is_none());
        assert_eq!(value["vulnerabilities"][3]["columns"], 2);

        assert_eq!(value["all_tests"][2]["vulnerable"], false);
        assert_eq!(value["all_tests"][2]["severity"], "INFO");
        assert!(value.get("results").is_none());
    }

    #[test]
    fn test_yaml_render() {
        let report = ScanReport::from_results(info(), results());
        let yaml = report.render(OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("scan_info:"));
        assert!(yaml.contains("type: Comment Bypass"));
    }

    #[test]
    fn test_summary_text_groups_by_severity() {
        let text = ScanReport::from_results(info(), results()).summary_text();
        let critical = text.find("[CRITICAL]").unwrap();
        let high = text.find("[HIGH]").unwrap();
        let medium = text.find("[MEDIUM]").unwrap();
        assert!(critical < high && high < medium);
        assert!(!text.contains("[INFO]"));
        assert!(text.contains("Evidence: SQL syntax"));
    }

    #[test]
    fn test_payload_preview_truncates() {
        let long = "A".repeat(80);
        assert_eq!(preview(&long).len(), 63);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("YAML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
