/// uvo command-line tool
///
/// Compiles schema files and validates JSON documents against them, without
/// writing any Rust.
use uvo_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
