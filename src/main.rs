// src/main.rs

use winchman::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("winchman error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> winchman::errors::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
