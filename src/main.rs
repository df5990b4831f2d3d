//! catalog-export command-line tool
//!
//! Manages export profiles and produces catalog exports from them.
//!
//! # Usage
//!
//! ```bash
//! # See what can be exported
//! catalog-export fields
//!
//! # Save a profile and get its download hash
//! catalog-export profile create --owner 1 --name "Price list" --format csv \
//!     --field id --field name --field base_price
//!
//! # Download through the hash
//! catalog-export download <HASH> -o prices.csv
//! ```

use tracing::Level;

use catalog_export::cli::CliInterface;
use catalog_export::error::Result;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = CliInterface::new()?;
    initialize_logging(&cli);
    cli.run().await
}

/// Initialize logging system based on verbosity level
///
/// Logs go to stderr so exported documents on stdout stay clean.
fn initialize_logging(cli: &CliInterface) {
    let level = if cli.args().very_verbose {
        Level::TRACE
    } else if cli.args().verbose {
        Level::DEBUG
    } else {
        cli.config().logging.level.to_tracing_level()
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
