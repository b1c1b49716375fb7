//! CLI to inspect entity definitions.
use clap::{Parser, Subcommand};
use clap_stdin::{FileOrStdin, FileOrStdout};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Mapping parameters, e.g. `naming=snake_case,strict=true`.
    #[arg(short, long, env = "DOCMAP_CONFIG", default_value = "")]
    pub config: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render the index mapping of an entity definition.
    Mapping {
        #[arg(default_value = "-")]
        input: FileOrStdin,
        #[arg(default_value = "-")]
        output: FileOrStdout,
    },
    /// Render the index settings of an entity definition.
    Settings {
        #[arg(default_value = "-")]
        input: FileOrStdin,
        #[arg(default_value = "-")]
        output: FileOrStdout,
    },
    /// Report field name diagnostics. Exits with an error if any diagnostic is an error.
    Validate {
        #[arg(default_value = "-")]
        input: FileOrStdin,
    },
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Args, Command};

    #[test]
    fn test_args() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_config() {
        let args = Args::try_parse_from(["docmap", "--config", "strict=true", "validate"]).unwrap();
        assert_eq!(args.config, "strict=true");
        assert!(matches!(args.command, Command::Validate { .. }));
    }
}
