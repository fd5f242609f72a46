use clap::Parser as _;
use duc::{run, Args};

fn main() {
    let args = Args::parse();
    std::process::exit(run(args));
}
