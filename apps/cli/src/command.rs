//! REPL command parsing.

use thiserror::Error;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `add <category>, <name>, <price>`; fields are validated later.
    Add {
        category: String,
        name: String,
        price: String,
    },
    Reload,
    Test,
    LoginAnonymous,
    Login { email: String, password: String },
    Register { email: String, password: String },
    Logout,
    WhoAmI,
    Help,
    Quit,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}. Type 'help' for the list of commands.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl Command {
    /// Verb for logging; never includes arguments.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Add { .. } => "add",
            Command::Reload => "reload",
            Command::Test => "test",
            Command::LoginAnonymous => "login-anon",
            Command::Login { .. } => "login",
            Command::Register { .. } => "register",
            Command::Logout => "logout",
            Command::WhoAmI => "whoami",
            Command::Help => "help",
            Command::Quit => "quit",
        }
    }
}

pub const HELP: &str = "\
Commands:
  add <category>, <name>, <price>   Add a product
  reload                            Re-subscribe to the catalog
  test                              Test the connection (one-shot read)
  login anon                        Sign in anonymously
  login <email> <password>          Sign in with email and password
  register <email> <password>       Create an account
  logout                            Sign out
  whoami                            Show the current user
  help                              Show this help
  quit                              Exit";

const LOGIN_USAGE: &str = "login anon | login <email> <password>";
const REGISTER_USAGE: &str = "register <email> <password>";

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "add" => parse_add(rest),
        "reload" => Command::Reload,
        "test" => Command::Test,
        "login" => parse_login(rest)?,
        "register" => {
            let (email, password) = credentials_pair(rest).ok_or(CommandError::Usage(REGISTER_USAGE))?;
            Command::Register { email, password }
        }
        "logout" => Command::Logout,
        "whoami" => Command::WhoAmI,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// The price is the remainder, so a decimal comma survives: `add a, b, 7,50`.
fn parse_add(rest: &str) -> Command {
    let parts: Vec<&str> = rest.splitn(3, ',').map(str::trim).collect();
    let field = |i: usize| parts.get(i).copied().unwrap_or_default().to_string();
    Command::Add {
        category: field(0),
        name: field(1),
        price: field(2),
    }
}

fn parse_login(rest: &str) -> Result<Command, CommandError> {
    if rest.eq_ignore_ascii_case("anon") || rest.eq_ignore_ascii_case("anonymous") {
        return Ok(Command::LoginAnonymous);
    }
    let (email, password) = credentials_pair(rest).ok_or(CommandError::Usage(LOGIN_USAGE))?;
    Ok(Command::Login { email, password })
}

fn credentials_pair(rest: &str) -> Option<(String, String)> {
    let mut words = rest.split_whitespace();
    let email = words.next()?;
    let password = words.next()?;
    if words.next().is_some() {
        return None;
    }
    Some((email.to_string(), password.to_string()))
}
