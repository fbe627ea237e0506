use anyhow::Result;
use clap::Parser;
use pbix_doc::{cli, error::exit_code};
use tracing::error;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        error!("{:#}", err);
        eprintln!("error: {:#}", err);
        std::process::exit(exit_code(&err));
    }
    Ok(())
}
