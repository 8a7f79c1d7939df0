use clap::Parser;
use log::error;

mod cli;

#[tokio::main]
async fn main() {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    let args = cli::Cli::parse();
    let config = finpano::Config::from_env();
    if let Err(err) = cli::run(args, config).await {
        error!("{}", err);
        std::process::exit(1);
    }
}
