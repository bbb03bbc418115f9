use std::env;
use std::process;

use fm301check::cli;

fn main() {
    let args: Vec<String> = env::args().collect();
    process::exit(cli::run_with_args(&args));
}
