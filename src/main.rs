use anyhow::{Context, Result};
use nvfand::{arg_parser::ArgsOptions, daemon, logger};
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse the command line arguments
    let args_options = ArgsOptions::parse();

    logger::init_logging(args_options.log_file.as_deref())
        .with_context(|| "Failed to open the log file")?;

    if let Err(err) = daemon::run(&args_options.config_file_path).await {
        let err = anyhow::Error::from(err);

        for e in err.chain() {
            error!("{e}");
        }

        return Err(err);
    }

    Ok(())
}
