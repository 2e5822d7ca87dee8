use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Database engine inferred from response text or from a successful delay payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DatabaseDialect {
    #[serde(rename = "PostgreSQL")]
    PostgreSQL,
    #[serde(rename = "MySQL")]
    MySQL,
    #[serde(rename = "Microsoft SQL Server")]
    MSSQL,
    #[serde(rename = "Oracle")]
    Oracle,
    #[serde(rename = "SQLite")]
    SQLite,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl DatabaseDialect {
    /// Every concrete dialect, in catalog declaration order
    pub const ALL: [DatabaseDialect; 5] = [
        DatabaseDialect::PostgreSQL,
        DatabaseDialect::MySQL,
        DatabaseDialect::MSSQL,
        DatabaseDialect::Oracle,
        DatabaseDialect::SQLite,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DatabaseDialect::PostgreSQL => "PostgreSQL",
            DatabaseDialect::MySQL => "MySQL",
            DatabaseDialect::MSSQL => "Microsoft SQL Server",
            DatabaseDialect::Oracle => "Oracle",
            DatabaseDialect::SQLite => "SQLite",
            DatabaseDialect::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, DatabaseDialect::Unknown)
    }
}

impl fmt::Display for DatabaseDialect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Finding severity, most severe first
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detection technique that produced a result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InjectionType {
    #[serde(rename = "Time-based Blind")]
    TimeBased,
    #[serde(rename = "Error-based")]
    ErrorBased,
    #[serde(rename = "UNION-based")]
    UnionBased,
    #[serde(rename = "Boolean-based")]
    BooleanBased,
    #[serde(rename = "Comment Bypass")]
    Bypass,
}

impl InjectionType {
    pub fn label(&self) -> &'static str {
        match self {
            InjectionType::TimeBased => "Time-based Blind",
            InjectionType::ErrorBased => "Error-based",
            InjectionType::UnionBased => "UNION-based",
            InjectionType::BooleanBased => "Boolean-based",
            InjectionType::Bypass => "Comment Bypass",
        }
    }

    /// Severity is a pure function of technique and verdict
    pub fn severity(&self, vulnerable: bool) -> Severity {
        if !vulnerable {
            return Severity::Info;
        }
        match self {
            InjectionType::TimeBased => Severity::Critical,
            InjectionType::ErrorBased | InjectionType::UnionBased | InjectionType::BooleanBased => {
                Severity::High
            }
            InjectionType::Bypass => Severity::Medium,
        }
    }
}

impl fmt::Display for InjectionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HttpMethod {
    GET,
    POST,
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::GET),
            "POST" => Ok(HttpMethod::POST),
            other => Err(format!("Unsupported HTTP method: {}", other)),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HttpMethod::GET => f.write_str("GET"),
            HttpMethod::POST => f.write_str("POST"),
        }
    }
}

/// Where a testable parameter lives in the request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Query,
    Body,
    Cookie,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParameterKind::Query => f.write_str("url"),
            ParameterKind::Body => f.write_str("post"),
            ParameterKind::Cookie => f.write_str("cookie"),
        }
    }
}

/// A parameter that can be tested
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub original_value: String,
}

/// The request under test. Built once from configuration and never mutated.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    /// Scheme, host and path without the query string
    pub base_url: String,
    pub method: HttpMethod,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Map<String, serde_json::Value>>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
}

impl ScanTarget {
    /// Testable parameters: query string, then string-valued body fields, then cookies
    pub fn parameters(&self) -> Vec<Parameter> {
        let mut params: Vec<Parameter> = self
            .query
            .iter()
            .map(|(name, value)| Parameter {
                name: name.clone(),
                kind: ParameterKind::Query,
                original_value: value.clone(),
            })
            .collect();

        if let Some(body) = &self.body {
            for (name, value) in body {
                if let serde_json::Value::String(s) = value {
                    params.push(Parameter {
                        name: name.clone(),
                        kind: ParameterKind::Body,
                        original_value: s.clone(),
                    });
                }
            }
        }

        params.extend(self.cookies.iter().map(|(name, value)| Parameter {
            name: name.clone(),
            kind: ParameterKind::Cookie,
            original_value: value.clone(),
        }));

        params
    }
}

/// Why a probe produced no response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    Timeout,
    Connection(String),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProbeFailure::Timeout => f.write_str("timeout"),
            ProbeFailure::Connection(e) => write!(f, "connection error: {}", e),
        }
    }
}

/// Response captured for a single probe
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

impl ProbeResponse {
    /// Body length in bytes
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}

#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    Response(ProbeResponse),
    Unreachable(ProbeFailure),
}

/// One request/response exchange and how long it took
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub outcome: ProbeOutcome,
    /// Seconds. Equals the configured timeout when the probe timed out.
    pub elapsed: f64,
}

impl ProbeResult {
    pub fn response(&self) -> Option<&ProbeResponse> {
        match &self.outcome {
            ProbeOutcome::Response(r) => Some(r),
            ProbeOutcome::Unreachable(_) => None,
        }
    }
}

/// The unmodified request's response, captured once before any payload is sent
#[derive(Debug, Clone)]
pub struct BaselineSnapshot {
    pub response: ProbeResponse,
    pub length: usize,
    pub elapsed: f64,
}

impl BaselineSnapshot {
    pub fn new(response: ProbeResponse, elapsed: f64) -> Self {
        let length = response.body_len();
        Self {
            response,
            length,
            elapsed,
        }
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }
}

/// Verdict for one payload (or one true/false pair) against one parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResult {
    pub parameter: String,
    pub kind: ParameterKind,
    pub injection_type: InjectionType,
    pub payload: String,
    pub vulnerable: bool,
    pub severity: Severity,
    pub details: String,
    pub evidence: Option<String>,
    pub response_time: f64,
    pub database: DatabaseDialect,
    /// UNION column count that produced the verdict
    pub columns: Option<usize>,
}

impl TestResult {
    pub fn new(
        parameter: &Parameter,
        injection_type: InjectionType,
        payload: impl Into<String>,
        vulnerable: bool,
        details: impl Into<String>,
    ) -> Self {
        Self {
            parameter: parameter.name.clone(),
            kind: parameter.kind,
            injection_type,
            payload: payload.into(),
            vulnerable,
            severity: injection_type.severity(vulnerable),
            details: details.into(),
            evidence: None,
            response_time: 0.0,
            database: DatabaseDialect::Unknown,
            columns: None,
        }
    }

    pub fn with_evidence(mut self, evidence: Option<String>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_response_time(mut self, elapsed: f64) -> Self {
        self.response_time = elapsed;
        self
    }

    pub fn with_database(mut self, database: DatabaseDialect) -> Self {
        self.database = database;
        self
    }

    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = Some(columns);
        self
    }
}
