use std::fmt;
use std::path::{Path, PathBuf};

use zeroize::{Zeroize, ZeroizeOnDrop};

const REDACTED: &str = "********";

/// A password that is wiped on drop and never rendered by `Debug`/`Display`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTED)
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub password: Option<Secret>,
}

impl Account {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: Secret) -> Self {
        self.password = Some(password);
        self
    }
}

#[derive(Debug, Clone)]
pub enum CommandArg {
    Plain(String),
    Secret(Secret),
}

/// A program plus arguments, handed to an execution context as one shell line.
#[derive(Debug, Clone)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<CommandArg>,
}

impl CommandLine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(CommandArg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|a| CommandArg::Plain(a.into())));
        self
    }

    pub fn secret_arg(mut self, secret: Secret) -> Self {
        self.args.push(CommandArg::Secret(secret));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The real command line, secrets included. Only for handing to a process.
    pub fn render_revealed(&self) -> String {
        self.render(true)
    }

    fn render(&self, reveal: bool) -> String {
        let mut line = quote(&self.program.to_string_lossy());
        for arg in &self.args {
            line.push(' ');
            match arg {
                CommandArg::Plain(value) => line.push_str(&quote(value)),
                CommandArg::Secret(secret) if reveal => line.push_str(&quote(secret.expose())),
                CommandArg::Secret(_) => line.push_str(REDACTED),
            }
        }
        line
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

fn quote(value: &str) -> String {
    if value.is_empty() || value.contains(char::is_whitespace) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_redacts_secret() {
        let cmd = CommandLine::new("C:\\Program Files\\Steam\\steam.exe")
            .arg("-silent")
            .arg("-login")
            .arg("alice")
            .secret_arg(Secret::new("hunter2"));
        let shown = cmd.to_string();
        assert!(!shown.contains("hunter2"));
        assert!(shown.ends_with(REDACTED));
        assert!(shown.starts_with("\"C:\\Program Files\\Steam\\steam.exe\""));
        assert!(cmd.render_revealed().ends_with("hunter2"));
    }

    #[test]
    fn test_account_debug_hides_password() {
        let account = Account::new("alice").with_password(Secret::new("hunter2"));
        let dbg = format!("{:?}", account);
        assert!(dbg.contains("alice"));
        assert!(!dbg.contains("hunter2"));
    }
}
