use anyhow::Result;
use clap::Parser;
use inspection_report::{cli, render::RenderError};
use tracing::error;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        error!("{:#}", err);
        eprintln!("error: {:#}", err);
        let missing = err
            .downcast_ref::<RenderError>()
            .is_some_and(RenderError::is_missing_dependency);
        std::process::exit(if missing { 2 } else { 1 });
    }
    Ok(())
}
