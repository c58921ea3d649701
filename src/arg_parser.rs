use std::path::PathBuf;

use argparse::{ArgumentParser, Print, Store, StoreOption};

pub struct ArgsOptions {
    pub config_file_path: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl ArgsOptions {
    pub fn parse() -> Self {
        let mut options = ArgsOptions::default();

        {
            let mut parser = ArgumentParser::new();
            parser.set_description("Nvidia GPU fan control daemon");

            // Configuration file path
            parser.refer(&mut options.config_file_path).add_option(
                &["-c", "--config"],
                Store,
                "The file path of the configuration file",
            );

            // Log file, stdout when not given
            parser.refer(&mut options.log_file).add_option(
                &["-l", "--log-file"],
                StoreOption,
                "Append the logs to this file instead of stdout",
            );

            // Show daemon version
            parser.add_option(
                &["-V", "--version"],
                Print(env!("CARGO_PKG_VERSION").to_string()),
                "Show the daemon version"
            );

            parser.parse_args_or_exit();
        }

        options
    }
}

impl Default for ArgsOptions {
    fn default() -> Self {
        Self {
            config_file_path: PathBuf::from("config.json"),
            log_file: None,
        }
    }
}
