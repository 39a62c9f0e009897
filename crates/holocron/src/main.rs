use clap::Parser;
use holocron_utils::{ok, AnyResult};
use log::LevelFilter;

fn main() -> AnyResult {
    let cli = holocron::Cli::parse_from(wild::args());

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    pretty_env_logger::formatted_builder()
        .format_indent(None)
        .format_timestamp(None)
        .filter_level(level)
        .parse_env("RUST_LOG")
        .init();

    holocron::run(cli)?;
    ok()
}
