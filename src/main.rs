// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, set up logging, run the command.
// - Any failure becomes one `Error: ...` line on stderr and a nonzero exit.

use clap::Parser;
use open_notebook_cli::cli::{self, Args};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() {
    let args = Args::parse();

    // Logging goes to stderr so `--json` output on stdout stays parseable.
    let lvl = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(lvl)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: failed to initialise logging: {e}");
    }

    if let Err(err) = cli::run(args) {
        let line = format!("{err:#}").replace('\n', " ");
        eprintln!("Error: {line}");
        std::process::exit(cli::exit_code(&err));
    }
}
