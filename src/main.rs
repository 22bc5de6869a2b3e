use clap::Parser;
use logsanitizer::cli::Cli;
use logsanitizer::commands::run_sanitize;
use logsanitizer::logging::init_tracing;

fn main() {
    let cli = Cli::parse();

    let result = init_tracing(cli.verbose).and_then(|_| run_sanitize(&cli));

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
