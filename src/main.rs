use anyhow::{Context, Result};
use env_logger::Builder;
use log::{info, LevelFilter};
use solana_tx_guard::{parse_transaction, Guard, GuardConfig, OperationMode, RiskTolerance};
use std::io::Write;
use std::path::PathBuf;

fn print_usage(program: &str) {
    println!("Solana Transaction Guard v{}", solana_tx_guard::VERSION);
    println!("\nUsage:");
    println!("  {} <ENCODED_TX> [--config PATH] [--tolerance LEVEL] [--mode MODE]", program);
    println!("  {} --version", program);
    println!("\nOptions:");
    println!("  --config, -c PATH      Load guard settings from a JSON file");
    println!("  --tolerance, -t LEVEL  strict, moderate or permissive (default: moderate)");
    println!("  --mode, -m MODE        block or warn (default: block)");
    println!("  --version, -v          Show version information");
    println!("\nThe transaction may be base58, base64 or raw bincode. Risk assessment is");
    println!("skipped: this command validates offline.");
}

// Simple CLI without clap
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default(),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && (args[1] == "--version" || args[1] == "-v") {
        println!("Solana Transaction Guard v{}", solana_tx_guard::VERSION);
        return Ok(());
    }

    if args.len() < 2 || args[1].starts_with('-') {
        print_usage(&args[0]);
        return Ok(());
    }

    let encoded = &args[1];
    let mut config_path: Option<PathBuf> = None;
    let mut tolerance: Option<RiskTolerance> = None;
    let mut mode: Option<OperationMode> = None;

    let mut i = 2;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--config" | "-c", Some(v)) => config_path = Some(PathBuf::from(v)),
            ("--tolerance" | "-t", Some(v)) => tolerance = Some(v.parse()?),
            ("--mode" | "-m", Some(v)) => mode = Some(v.parse()?),
            (flag, None) if flag.starts_with('-') => {
                anyhow::bail!("Missing value for {}", flag);
            }
            (other, _) => {
                println!("Unknown argument: {}", other);
                i += 1;
                continue;
            }
        }
        i += 2;
    }

    let mut config = match &config_path {
        Some(path) => GuardConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => GuardConfig::default(),
    };
    if let Some(tolerance) = tolerance {
        config.risk_tolerance = tolerance;
    }
    if let Some(mode) = mode {
        config.mode = mode;
    }
    // No gateway is attached offline
    config.risk_gateway.enabled = false;

    let transaction = parse_transaction(encoded.as_bytes()).context("Failed to decode transaction")?;
    info!(
        "Validating transaction {} ({} instructions)",
        transaction.id,
        transaction.instructions.len()
    );

    let guard = Guard::new(config)?;
    let result = guard.validate_transaction(&transaction).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_valid {
        std::process::exit(1);
    }
    Ok(())
}
