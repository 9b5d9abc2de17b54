pub mod account;
pub mod app;
pub mod config;
pub mod error;
pub mod installation;
pub mod platform;
pub mod runner;
pub mod sandbox;
pub mod steam;
pub mod tail;

pub use account::{Account, CommandLine, Secret};
pub use app::Tf2IdleApp;
pub use config::AppConfig;
pub use error::Error;
pub use installation::{Installation, LinkedInstallation};
pub use platform::SystemHost;
pub use runner::{BatchReporter, BatchResults, SilentReporter, TaskRunner};
pub use sandbox::{ExecutionContext, Sandboxie};
pub use steam::{LaunchResult, LoginResult, SessionState, SteamClient};
pub use tail::ConnectionInfo;
