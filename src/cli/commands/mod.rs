//! Command dispatch.

pub mod serve;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::config::load_config;
use crate::error::WordSpyError;

/// Routes the parsed CLI to its command implementation.
///
/// # Errors
///
/// Propagates command failures for exit-code mapping in `main`.
pub async fn dispatch(cli: Cli) -> Result<(), WordSpyError> {
    match cli.command {
        Commands::Serve(args) => serve::run(args).await,
        Commands::Check(args) => {
            let config = load_config(Some(&args.config))?;
            println!("configuration OK: {}", args.config.display());
            println!("  bind: {}", config.server.bind);
            println!("  room ttl: {}s", config.rooms.ttl_secs);
            Ok(())
        }
        Commands::Version(_) => {
            version::print();
            Ok(())
        }
    }
}
