// src/bin/cli.rs
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use taskcheck::config::TaskFile;
use taskcheck::errors::{Result, VerifyError};
use taskcheck::expression::DEFAULT_MAX_SOURCE_LEN;
use taskcheck::fetcher::HttpFetcher;
use taskcheck::request_builder;
use taskcheck::runner;
use taskcheck::self_test;

/// Checks a wallet address against an off-chain task verification endpoint.
#[derive(Parser, Debug)]
#[command(name = "taskcheck-cli", version, about)]
struct Cli {
    /// Task definition file (TOML)
    task: PathBuf,

    /// Wallet address to test; read from stdin when omitted
    wallet_address: Option<String>,

    /// Only run the expression against the sample cases
    #[arg(long)]
    self_test_only: bool,

    /// Outbound request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let task = TaskFile::load(&cli.task)?;

    let report = self_test::self_test(&task.expression, DEFAULT_MAX_SOURCE_LEN);
    if report.valid {
        println!("✅ Expression passes the sample cases");
        if let Some(export) = &report.export {
            println!("\nFunction for the task configuration:\n{}\n", export);
        }
    } else {
        println!("⚠️  Expression does not pass the sample cases");
        if let Some(error) = &report.error {
            println!("   {}", error);
        }
        for case in report.cases.iter().filter(|c| !c.passed) {
            println!(
                "   response {} expected {} got {}",
                case.response,
                case.expected,
                case.actual.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "undefined".to_string())
            );
        }
    }
    if cli.self_test_only {
        return Ok(report.valid);
    }

    let wallet_address = match cli.wallet_address.or_else(|| task.wallet_address.clone()) {
        Some(address) => address,
        None => prompt("Please enter a wallet address to test: ")?,
    };
    if wallet_address.is_empty() {
        return Err(VerifyError::Config("a wallet address is required".to_string()));
    }

    let request = task.request_for(&wallet_address);
    let built = request_builder::build(&request.api_url, &request.wallet_address, &request.auth);
    println!("Testing URL: {}", built.url);

    let fetcher = HttpFetcher::with_timeout(Duration::from_secs(cli.timeout))?;
    let result = runner::run_verification(&fetcher, &request, DEFAULT_MAX_SOURCE_LEN).await?;

    if let Some(data) = &result.data {
        println!("\nAPI Response: {}", serde_json::to_string_pretty(data)?);
    }
    if let Some(error) = &result.evaluation_error {
        println!("\n⚠️  Expression error: {}", error);
    }
    let verdict = result
        .is_valid
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "undefined".to_string());
    println!("\nVerification Result: {}", verdict);
    match result.status {
        Some(status) => println!("Status: {}", status),
        None => println!("Status: unknown"),
    }

    Ok(result.is_valid_verdict())
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
