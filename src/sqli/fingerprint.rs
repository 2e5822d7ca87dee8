// src/sqli/fingerprint.rs
//! Regex banks for database, WAF and SQL error recognition

use crate::sqli::types::{DatabaseDialect, ProbeResponse};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Status codes a filtering layer typically answers with
pub const BLOCK_STATUSES: [u16; 5] = [403, 406, 419, 429, 503];

const BLOCK_WORDS: [&str; 4] = ["blocked", "forbidden", "denied", "firewall"];

fn compile(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("invalid built-in pattern {:?}: {}", pattern, e))
}

static DB_FINGERPRINTS: Lazy<Vec<(DatabaseDialect, Vec<Regex>)>> = Lazy::new(|| {
    let bank: [(DatabaseDialect, &[&str]); 5] = [
        (
            DatabaseDialect::PostgreSQL,
            &[
                r"postgresql",
                r"pg_",
                r"psql",
                r"pgsql",
                r"unterminated quoted string",
                r"invalid input syntax for type",
                r"current transaction is aborted",
            ],
        ),
        (
            DatabaseDialect::MySQL,
            &[
                r"mysql",
                r"mysqli",
                r"mariadb",
                r"you have an error in your sql syntax",
                r"supplied argument is not a valid mysql",
                r"unknown column",
                r"check the manual that corresponds to your mysql",
            ],
        ),
        (
            DatabaseDialect::MSSQL,
            &[
                r"microsoft sql server",
                r"mssql",
                r"sqlsrv",
                r"unclosed quotation mark",
                r"incorrect syntax near",
                r"the multi-part identifier",
                r"cannot insert duplicate key",
            ],
        ),
        (
            DatabaseDialect::Oracle,
            &[
                r"oracle",
                r"ora-\d{5}",
                r"quoted string not properly terminated",
                r"missing expression",
                r"table or view does not exist",
            ],
        ),
        (
            DatabaseDialect::SQLite,
            &[
                r"sqlite",
                r"sqlite3",
                r"unable to open database",
                r#"near ".*": syntax error"#,
                r"no such table",
            ],
        ),
    ];

    bank.iter()
        .map(|(dialect, patterns)| (*dialect, patterns.iter().map(|p| compile(p)).collect()))
        .collect()
});

static WAF_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"cloudflare", "Cloudflare"),
        (r"akamai", "Akamai"),
        (r"imperva|incapsula", "Imperva/Incapsula"),
        (r"f5 big-?ip", "F5 BIG-IP"),
        (r"mod_security|modsecurity", "ModSecurity"),
        (r"aws.*waf|waf.*aws", "AWS WAF"),
        (r"barracuda", "Barracuda"),
        (r"sucuri", "Sucuri"),
        (r"wordfence", "Wordfence"),
        (r"comodo", "Comodo WAF"),
    ]
    .into_iter()
    .map(|(pattern, vendor)| (compile(pattern), vendor))
    .collect()
});

static SQL_ERROR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"sql syntax",
        r"syntax error",
        r"unexpected token",
        r"unterminated string",
        r"quoted string not properly terminated",
        r"column.*does not exist",
        r"table.*does not exist",
        r"relation.*does not exist",
        r"invalid.*identifier",
        r"ORA-\d+",
        r"PLS-\d+",
        r"SQLSTATE",
        r"driver.*error",
        r"division by zero",
        r"conversion failed",
        r"data type mismatch",
        r"operand type clash",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

/// Maps response text to the database engine that produced it
pub struct DatabaseFingerprinter;

impl DatabaseFingerprinter {
    /// First dialect (in bank order) with any matching pattern
    pub fn detect(text: &str) -> DatabaseDialect {
        DB_FINGERPRINTS
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(text)))
            .map(|(dialect, _)| *dialect)
            .unwrap_or(DatabaseDialect::Unknown)
    }
}

/// Identifies a filtering layer in front of the target
pub struct WafDetector;

impl WafDetector {
    pub fn detect(response: &ProbeResponse) -> Option<String> {
        let mut combined = String::new();
        let mut names: Vec<_> = response.headers.iter().collect();
        names.sort();
        for (name, value) in names {
            combined.push_str(name);
            combined.push_str(": ");
            combined.push_str(value);
            combined.push('\n');
        }
        combined.push_str(&response.body);

        if let Some((_, vendor)) = WAF_PATTERNS.iter().find(|(re, _)| re.is_match(&combined)) {
            return Some(vendor.to_string());
        }

        if is_block_status(response.status) {
            let body = response.body.to_lowercase();
            if BLOCK_WORDS.iter().any(|word| body.contains(word)) {
                return Some("Generic WAF".to_string());
            }
        }

        None
    }
}

pub fn is_block_status(status: u16) -> bool {
    BLOCK_STATUSES.contains(&status)
}

/// First SQL error pattern (in bank order) that matches, as the matched text
pub fn find_sql_error(text: &str) -> Option<String> {
    SQL_ERROR_PATTERNS
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().to_string())
}
