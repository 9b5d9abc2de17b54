use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tf2idle")]
#[command(about = "Run many sandboxed TF2 idle sessions side by side", long_about = None)]
pub struct Cli {
    /// Directory holding one linked installation per account
    #[arg(long, global = true)]
    pub working_dir: Option<PathBuf>,

    /// The Steam installation every account is linked from
    #[arg(long, global = true)]
    pub steam_base_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    pub sandboxie_install_dir: Option<PathBuf>,

    /// Accounts processed at the same time
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct Usernames {
    /// Steam account names
    #[arg(long, required = true, num_args = 1..)]
    pub usernames: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log accounts into Steam, prompting for each password
    Login(Usernames),
    /// Shut Steam down and clean up each account
    Logout(Usernames),
    /// Launch TF2 and wait until it has joined a server
    #[command(name = "launchtf2")]
    LaunchTf2 {
        #[command(flatten)]
        accounts: Usernames,
        /// Replaces the configured launch options
        #[arg(long, allow_hyphen_values = true)]
        launch_options: Option<String>,
        /// Copied to tf/cfg/autoexec.cfg before launch
        #[arg(long)]
        autoexec: Option<PathBuf>,
    },
    /// Kill TF2 and delete its per-account directory
    #[command(name = "closetf2")]
    CloseTf2(Usernames),
    /// Terminate processes, remove sandboxes and unlink installations
    Cleanup(Usernames),
    /// Show where each account's session stands
    Status(Usernames),
    /// Print configuration values
    PrintConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_accept_leading_hyphen() {
        let cli = Cli::parse_from([
            "tf2idle",
            "--workers",
            "3",
            "launchtf2",
            "--usernames",
            "a",
            "b",
            "--launch-options",
            "-textmode -novid",
        ]);
        assert_eq!(cli.workers, Some(3));
        match cli.command {
            Some(Commands::LaunchTf2 {
                accounts,
                launch_options,
                autoexec,
            }) => {
                assert_eq!(accounts.usernames, vec!["a", "b"]);
                assert_eq!(launch_options.as_deref(), Some("-textmode -novid"));
                assert!(autoexec.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_usernames_are_required() {
        assert!(Cli::try_parse_from(["tf2idle", "login"]).is_err());
    }
}
