use clap::Parser;

use synopsis_cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    run(&args)?;
    Ok(())
}
