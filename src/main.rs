use dotenv::dotenv;
use log::{error, info};
use rust_decimal::Decimal;
use std::env;
use std::process;
use std::str::FromStr;

use solana_swap_executor::{SolanaConfig, SwapAmount, SwapExecutor};

const USAGE: &str = "usage: swap-executor <input-mint> <output-mint> <amount|all> [slippage-bps]";
const DEFAULT_SLIPPAGE_BPS: u16 = 50;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (input_mint, output_mint, amount, slippage_bps) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            process::exit(2);
        }
    };

    let config = SolanaConfig::from_env()?;
    info!(
        "Starting swap executor (rpc {}, primary {})",
        config.rpc_url, config.primary
    );
    let executor = SwapExecutor::from_config(&config);

    let outcome = executor
        .swap(&input_mint, &output_mint, amount, slippage_bps)
        .await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.success {
        error!("swap did not complete");
        process::exit(1);
    }
    Ok(())
}

fn parse_args(args: &[String]) -> Result<(String, String, SwapAmount, u16), String> {
    let [input, output, amount, rest @ ..] = args else {
        return Err("missing arguments".to_string());
    };

    let amount = if amount.eq_ignore_ascii_case("all") {
        SwapAmount::All
    } else {
        let ui = Decimal::from_str(amount).map_err(|_| format!("invalid amount: {amount}"))?;
        SwapAmount::Ui(ui)
    };

    let slippage_bps = match rest {
        [] => DEFAULT_SLIPPAGE_BPS,
        [slippage] => slippage
            .parse()
            .map_err(|_| format!("invalid slippage: {slippage}"))?,
        _ => return Err("too many arguments".to_string()),
    };

    Ok((input.clone(), output.clone(), amount, slippage_bps))
}
