use clap::Parser;
use sqlisweep::sqli::config::{parse_cookies, parse_headers, parse_post_data, ScanConfig};
use sqlisweep::sqli::report::{OutputFormat, ScanReport};
use sqlisweep::sqli::types::HttpMethod;
use sqlisweep::sqli::Scanner;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlisweep")]
#[command(version = "2.0.0")]
#[command(about = "Differential SQL injection scanner - AUTHORIZED testing only", long_about = None)]
struct Cli {
    /// Target URL, query parameters included
    url: String,

    /// HTTP method
    #[arg(short, long, default_value = "GET")]
    method: HttpMethod,

    /// POST data as a JSON object
    #[arg(short, long)]
    data: Option<String>,

    /// Custom header "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Cookies "key=value; key2=value2"
    #[arg(short, long)]
    cookie: Option<String>,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Sleep duration for time-based payloads in seconds
    #[arg(long, default_value = "3")]
    delay: u64,

    /// Also run UNION and comment-bypass techniques
    #[arg(long)]
    deep: bool,

    /// Worker count (1-20)
    #[arg(long, default_value = "5")]
    threads: usize,

    /// Skip WAF detection on the baseline response
    #[arg(long)]
    no_waf_detect: bool,

    /// Do not follow redirects
    #[arg(long)]
    no_redirects: bool,

    /// Verify TLS certificates
    #[arg(long)]
    verify_tls: bool,

    /// Custom User-Agent
    #[arg(long)]
    user_agent: Option<String>,

    /// Pause between payloads in milliseconds
    #[arg(long, default_value = "0")]
    payload_delay: u64,

    /// Report format
    #[arg(short, long, default_value = "json", value_parser = ["json", "yaml"])]
    output_format: String,

    /// Report path (default: sqli_report_<timestamp>.<format>)
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Do not write a report file
    #[arg(long)]
    no_report: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Setup graceful shutdown: the scan stops at the next payload and reports what it has
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("\nReceived shutdown signal, finishing current request...");
                let _ = cancel_tx.send(true);
            }
            Err(e) => {
                eprintln!("Error setting up signal handler: {}", e);
            }
        }
    });

    let format: OutputFormat = match cli.output_format.parse() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[-] {}", e);
            std::process::exit(1);
        }
    };

    let config = build_config(&cli);

    print_banner(&config);

    let mut scanner = match Scanner::new(config, cancel_rx) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[-] {}", e);
            std::process::exit(1);
        }
    };

    let report = match scanner.run().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[-] Scan failed: {}", e);
            std::process::exit(1);
        }
    };

    report.print_summary();

    if !cli.no_report {
        let path = cli
            .output_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(ScanReport::default_filename(format)));

        match report.write(&path, format) {
            Ok(()) => println!("📄 Report saved: {}", path.display()),
            Err(e) => {
                eprintln!("[-] Failed to write report to '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }
}

fn build_config(cli: &Cli) -> ScanConfig {
    let data = cli.data.as_deref().map(|raw| {
        parse_post_data(raw).unwrap_or_else(|e| {
            eprintln!("[-] {}", e);
            std::process::exit(1);
        })
    });

    let defaults = ScanConfig::default();

    ScanConfig {
        url: cli.url.clone(),
        method: cli.method,
        data,
        headers: parse_headers(&cli.headers),
        cookies: cli.cookie.as_deref().map(parse_cookies).unwrap_or_default(),
        timeout_secs: cli.timeout,
        delay_secs: cli.delay,
        threads: cli.threads,
        deep_scan: cli.deep,
        detect_waf: !cli.no_waf_detect,
        follow_redirects: !cli.no_redirects,
        verify_tls: cli.verify_tls,
        user_agent: cli.user_agent.clone().unwrap_or(defaults.user_agent),
        payload_delay_ms: cli.payload_delay,
    }
}

fn print_banner(config: &ScanConfig) {
    println!("\n{}", "═".repeat(70));
    println!("  SQL INJECTION SCANNER - AUTHORIZED USE ONLY");
    println!("{}", "═".repeat(70));
    println!("⚠️  WARNING: Use only on systems you own or have permission to test");
    println!("   Unauthorized testing is illegal.");
    println!("{}\n", "═".repeat(70));

    println!("[*] Target: {}", config.url);
    println!("[*] Method: {}", config.method);
    println!("[*] Timeout: {}s, delay: {}s", config.timeout_secs, config.delay_secs);
    println!(
        "[*] Mode: {}",
        if config.deep_scan { "deep" } else { "standard" }
    );
    if config.payload_delay_ms > 0 {
        println!("[*] Payload delay: {}ms", config.payload_delay_ms);
    }
}
