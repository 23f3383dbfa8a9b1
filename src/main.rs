use clap::Parser;
use sinker_lib::commands::{dispatch, Cli};
use sinker_lib::config::{config_dir, ConnectionConfig, CONFIG_FILE};
use sinker_lib::logging::{self, get_log_dir};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_file = cli
        .global
        .config
        .clone()
        .unwrap_or_else(|| config_dir().join(CONFIG_FILE));
    let _guard = logging::init(
        &config_file,
        &get_log_dir(&config_dir()),
        cli.global.verbose,
    );

    let result = match ConnectionConfig::load(&config_file) {
        Ok(config) => dispatch(cli.command, &config.merge(cli.global.overrides())).await,
        Err(e) => Err(e),
    };

    // 唯一的错误出口
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("错误: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
