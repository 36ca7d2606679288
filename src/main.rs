use clap::Parser;
use colored::Colorize;

fn main() {
    let cli = shex_typegen::cli::CommandLineInterface::parse();
    if let Err(err) = cli.run() {
        eprintln!("{} {err:?}", "error:".red().bold());
        std::process::exit(1);
    }
}
