use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config_file::{parse_fact, BuildConfig};

/// autobuild - unattended image build agent
#[derive(Parser, Debug)]
#[command(name = "autobuild")]
#[command(about = "Turns build configuration documents into an ordered task list")]
#[command(version)]
pub struct Cli {
    /// JSON build configuration (defaults apply to anything it omits)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the task list from the configuration documents
    Build(BuildArgs),
    /// Validate every entry of an existing task list without running it
    Check {
        /// Task list to check (defaults to the configured task list)
        task_list: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Default, Clone)]
pub struct BuildArgs {
    /// Output task list
    #[arg(short, long)]
    pub task_list: Option<PathBuf>,

    /// Config root path under the server
    #[arg(short, long)]
    pub root: Option<String>,

    /// Config server (base location of configuration documents)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Keep an existing task list instead of purging it
    #[arg(long)]
    pub preserve_tasks: bool,

    /// Override a fact (repeatable)
    #[arg(short, long = "fact", value_name = "KEY=VALUE")]
    pub facts: Vec<String>,
}

impl BuildArgs {
    /// Layer these flags over a loaded configuration
    pub fn apply_to(&self, config: &mut BuildConfig) -> anyhow::Result<()> {
        if let Some(task_list) = &self.task_list {
            config.task_list = task_list.clone();
        }
        if let Some(root) = &self.root {
            config.config_root_path = root.clone();
        }
        if let Some(server) = &self.server {
            config.config_server = server.clone();
        }
        if self.preserve_tasks {
            config.preserve_tasks = true;
        }
        for raw in &self.facts {
            let (name, value) = parse_fact(raw)?;
            config.facts.insert(name, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_build() {
        let cli = Cli::try_parse_from(["autobuild"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_build_flags_override_config() {
        let cli = Cli::try_parse_from([
            "autobuild",
            "--verbose",
            "build",
            "--task-list",
            "/tmp/tasks.yaml",
            "--root",
            "win11",
            "--preserve-tasks",
            "--fact",
            "os_code=win11",
            "-f",
            "is_virtual=true",
        ])
        .unwrap();
        assert!(cli.verbose);

        let Some(Commands::Build(args)) = cli.command else {
            panic!("expected build subcommand");
        };
        let mut config = BuildConfig::default();
        args.apply_to(&mut config).unwrap();

        assert_eq!(config.task_list, PathBuf::from("/tmp/tasks.yaml"));
        assert_eq!(config.config_root_path, "win11");
        assert_eq!(config.config_server, "");
        assert!(config.preserve_tasks);
        assert_eq!(config.facts.get("os_code").map(String::as_str), Some("win11"));
        assert_eq!(config.facts.len(), 2);
    }

    #[test]
    fn test_malformed_fact_is_rejected() {
        let cli = Cli::try_parse_from(["autobuild", "build", "--fact", "os_code"]).unwrap();
        let Some(Commands::Build(args)) = cli.command else {
            panic!("expected build subcommand");
        };
        assert!(args.apply_to(&mut BuildConfig::default()).is_err());
    }

    #[test]
    fn test_check_takes_optional_path() {
        let cli = Cli::try_parse_from(["autobuild", "check", "tasks.yaml"]).unwrap();
        match cli.command {
            Some(Commands::Check { task_list }) => {
                assert_eq!(task_list, Some(PathBuf::from("tasks.yaml")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
