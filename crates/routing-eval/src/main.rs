mod case;
mod cli;
mod engine;
mod fixture_io;

use cli::{CliError, CliOptions};
use engine::run_eval;

#[tokio::main]
async fn main() {
    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    match run_eval(&options).await {
        Ok(summary) => {
            summary.print();
            if summary.has_failures() {
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("failed to run routing eval harness: {err}");
            std::process::exit(2);
        }
    }
}

fn print_usage() {
    eprintln!(
        "Usage: cargo run -p routing-eval -- [--commands <path>] [--cases <dir>]\n\
         \n\
         Runs each case's utterance through the command router and compares the\n\
         resolved category, action, parameters and handler with the expectations.\n\
         \n\
         Options:\n\
         - --commands <path>  Trigger configuration (default: bundled fixtures/commands.json)\n\
         - --cases <dir>      Directory of case files (default: bundled fixtures/cases)\n\
         - --help             Show this help text"
    );
}
