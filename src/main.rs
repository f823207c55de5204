// src/main.rs

use repobatch::{cli, logging, run};

#[tokio::main]
async fn main() {
    let code = match run_main().await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            eprintln!("repobatch error: {err:?}");
            1
        }
    };
    // Exit right away: the prompt loop may still be parked on stdin.
    std::process::exit(code);
}

async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    let summary = run(args).await?;
    Ok(summary.is_success())
}
