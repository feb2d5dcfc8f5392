pub mod cli;
pub mod definition;
pub mod loader;
pub mod project_config;

#[cfg(feature = "cli")]
pub use self::args::{CliConfig, Command, GenerateArgs, ProjectArgs, PublishArgs};

#[cfg(feature = "cli")]
mod args {
    use crate::utils::error::Result;
    use crate::utils::validation::{
        validate_non_empty_string, validate_path, validate_url, Validate,
    };
    use clap::{Args, Parser, Subcommand};
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "grit", version)]
    #[command(about = "Grid Toolkit for Grafana: dashboards and alerts from TOML definitions")]
    pub struct CliConfig {
        #[arg(short, long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, global = true, help = "Emit log lines as JSON")]
        pub json_logs: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Print the project's folders and variations as JSON
        Inspect(ProjectArgs),
        /// Render variations into JSON files
        Generate(GenerateArgs),
        /// Upload one variation to Grafana
        Publish(PublishArgs),
    }

    #[derive(Debug, Clone, Args)]
    pub struct ProjectArgs {
        #[arg(short = 'p', long = "project", default_value = ".")]
        pub project: PathBuf,
    }

    #[derive(Debug, Clone, Args)]
    pub struct GenerateArgs {
        #[command(flatten)]
        pub project: ProjectArgs,

        /// Variation to render; repeat for several, omit for all
        #[arg(long = "variation")]
        pub variations: Vec<String>,

        /// Overrides `[output] path`
        #[arg(short, long)]
        pub output: Option<String>,

        #[arg(long, help = "Also write <env>.zip")]
        pub bundle: bool,

        #[arg(long)]
        pub dry_run: bool,
    }

    #[derive(Debug, Clone, Args)]
    pub struct PublishArgs {
        #[command(flatten)]
        pub project: ProjectArgs,

        #[arg(long)]
        pub variation: String,

        /// Overrides `[grafana] url`
        #[arg(long)]
        pub url: Option<String>,

        /// Overrides `[grafana] token`
        #[arg(long)]
        pub token: Option<String>,

        #[arg(long, help = "Fail instead of replacing existing dashboards")]
        pub no_overwrite: bool,

        #[arg(long)]
        pub dry_run: bool,
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            match &self.command {
                Command::Inspect(args) => {
                    validate_path("project", &args.project.to_string_lossy())?;
                }
                Command::Generate(args) => {
                    validate_path("project", &args.project.project.to_string_lossy())?;
                    if let Some(output) = &args.output {
                        validate_path("output", output)?;
                    }
                    for name in &args.variations {
                        validate_non_empty_string("variation", name)?;
                    }
                }
                Command::Publish(args) => {
                    validate_path("project", &args.project.project.to_string_lossy())?;
                    validate_non_empty_string("variation", &args.variation)?;
                    if let Some(url) = &args.url {
                        validate_url("url", url)?;
                    }
                }
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_generate() {
            let config = CliConfig::parse_from([
                "grit",
                "generate",
                "-p",
                "demos/simple",
                "--variation",
                "prod",
                "--variation",
                "stage",
                "--bundle",
                "-v",
            ]);
            assert!(config.verbose);
            match &config.command {
                Command::Generate(args) => {
                    assert_eq!(args.project.project, PathBuf::from("demos/simple"));
                    assert_eq!(args.variations, vec!["prod", "stage"]);
                    assert!(args.bundle);
                    assert!(!args.dry_run);
                    assert!(args.output.is_none());
                }
                other => panic!("unexpected command {:?}", other),
            }
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_publish_requires_variation() {
            assert!(CliConfig::try_parse_from(["grit", "publish"]).is_err());
        }

        #[test]
        fn test_publish_url_validated() {
            let config = CliConfig::parse_from([
                "grit",
                "publish",
                "--variation",
                "prod",
                "--url",
                "ftp://grafana",
            ]);
            assert!(config.validate().is_err());
        }

        #[test]
        fn test_inspect_defaults_to_current_dir() {
            let config = CliConfig::parse_from(["grit", "inspect"]);
            match config.command {
                Command::Inspect(args) => assert_eq!(args.project, PathBuf::from(".")),
                other => panic!("unexpected command {:?}", other),
            }
        }
    }
}
