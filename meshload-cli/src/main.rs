//! meshload - inspect and convert OBJ and STL meshes
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::Result;
use meshload_cli::{Args, Command, USAGE};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Args::parse(std::env::args().skip(1)) {
        Ok(Command::Run(args)) => meshload_cli::run(&args),
        Ok(Command::Help) => {
            println!("{USAGE}");
            Ok(())
        }
        Err(e) => {
            eprintln!("{USAGE}\n");
            Err(e)
        }
    }
}
