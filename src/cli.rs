//! Command line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use crate::build;
use crate::typing::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "shex-typegen", version, about = "Compile ShEx shapes into TypeScript typings and runtime schemas")]
pub struct CommandLineInterface {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile every ShExJ document in a directory.
    Build {
        /// Directory containing `.shex.json` / `.shexj` sources.
        #[arg(short, long)]
        input: PathBuf,
        /// Directory the artifacts are written to.
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value = "compact")]
        format: FormatArg,
    },
    /// Compile one document and print its typings to stdout.
    Typings {
        /// A single `.shex.json` / `.shexj` source file.
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value = "compact")]
        format: FormatArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Legacy `@ldo/ldo` artifacts.
    Ldo,
    /// Compact artifacts with a flattened schema document.
    Compact,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Ldo => OutputFormat::Ldo,
            FormatArg::Compact => OutputFormat::Compact,
        }
    }
}

impl CommandLineInterface {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Build {
                input,
                output,
                format,
            } => {
                let summary = build::build(&input, &output, format.into())?;
                let compiled = format!("{} compiled", summary.compiled).green().bold();
                if summary.skipped == 0 {
                    eprintln!("{compiled}");
                } else {
                    let skipped = format!("{} skipped", summary.skipped).yellow().bold();
                    eprintln!("{compiled}, {skipped}");
                }
                if summary.skipped > 0 {
                    anyhow::bail!("{} source file(s) failed to compile", summary.skipped);
                }
                Ok(())
            }
            Command::Typings { input, format } => {
                let name = build::schema_name(&input);
                let src = std::fs::read_to_string(&input)?;
                let schema = crate::path_de::from_str_with_path(&src)?;
                let output = crate::emit::compile_schema(&schema, &name, format.into())?;
                print!("{}", output.typings);
                Ok(())
            }
        }
    }
}
