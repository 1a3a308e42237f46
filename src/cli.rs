use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use econ_policy::PolicyId;

/// Inspect and edit the economic policy factors
#[derive(Debug, Parser)]
#[command(name = "econ-policy", version)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List factors with their current and default values
    List {
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
    },
    /// Print one factor
    Get { key: String },
    /// Set a factor; amount is `5A`, `150ck` or bare cakes
    Set { key: String, amount: String },
    /// Drop every override of a policy
    Reset {
        #[arg(value_enum)]
        policy: PolicyArg,
    },
    /// Print the raw settings string of a policy
    Raw {
        #[arg(value_enum)]
        policy: PolicyArg,
    },
    /// Follow changes to the settings file until interrupted
    Watch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Alarm manager
    Am,
    /// Job scheduler
    Js,
}

impl From<PolicyArg> for PolicyId {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Am => PolicyId::AlarmManager,
            PolicyArg::Js => PolicyId::JobScheduler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        let cli =
            Cli::try_parse_from(["econ-policy", "set", "am_max_satiated_balance", "5A"]).unwrap();
        match cli.command {
            Command::Set { key, amount } => {
                assert_eq!(key, "am_max_satiated_balance");
                assert_eq!(amount, "5A");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_policy_and_config() {
        let cli = Cli::try_parse_from([
            "econ-policy",
            "list",
            "--policy",
            "js",
            "--config",
            "/tmp/c.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        assert!(matches!(cli.command, Command::List { policy: Some(PolicyArg::Js) }));
        assert_eq!(PolicyId::from(PolicyArg::Js), PolicyId::JobScheduler);
    }

    #[test]
    fn test_reset_requires_policy() {
        assert!(Cli::try_parse_from(["econ-policy", "reset"]).is_err());
        assert!(Cli::try_parse_from(["econ-policy", "reset", "xx"]).is_err());
    }
}
