//! The admin control surface: a line-oriented console read on its own OS
//! thread (stdin is blocking, so it gets a dedicated thread rather than a
//! tokio task) that turns operator commands into [`ControlCommand`]s for
//! the event loop.

use std::io::{self, BufRead, Write};

use tokio::sync::mpsc::UnboundedSender;

/// A command issued from the admin console, destined for the event loop.
#[derive(Debug, Clone)]
pub enum ControlCommand {
    /// `adduser <name> <password>`
    AddUser { name: String, password: String },
    /// `removeuser <name>`
    RemoveUser { name: String },
    /// `shutdown`
    Shutdown,
}

const HELP_TEXT: &str = "\
commands:
  adduser <name> <password>   create an account
  removeuser <name>           delete an account
  shutdown                    stop the server
  help                        show this message";

/// Spawn the console-reading thread. Returns immediately; the thread runs
/// until stdin closes or a `shutdown` command is read.
pub fn spawn(tx: UnboundedSender<ControlCommand>) {
    std::thread::spawn(move || run(tx));
}

fn run(tx: UnboundedSender<ControlCommand>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        let _ = write!(stdout, "> ");
        let _ = stdout.flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            let _ = tx.send(ControlCommand::Shutdown);
            return;
        }

        match parse(line.trim()) {
            Some(ParsedCommand::Help) => println!("{HELP_TEXT}"),
            Some(ParsedCommand::Command(command)) => {
                let is_shutdown = matches!(command, ControlCommand::Shutdown);
                if tx.send(command).is_err() {
                    return;
                }
                if is_shutdown {
                    return;
                }
            }
            None => println!("unrecognized command, try 'help'"),
        }
    }
}

enum ParsedCommand {
    Help,
    Command(ControlCommand),
}

fn parse(line: &str) -> Option<ParsedCommand> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "help" => Some(ParsedCommand::Help),
        "shutdown" => Some(ParsedCommand::Command(ControlCommand::Shutdown)),
        "adduser" => {
            let name = parts.next()?.to_string();
            let password = parts.next()?.to_string();
            Some(ParsedCommand::Command(ControlCommand::AddUser { name, password }))
        }
        "removeuser" => {
            let name = parts.next()?.to_string();
            Some(ParsedCommand::Command(ControlCommand::RemoveUser { name }))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_adduser() {
        match parse("adduser alice hunter2") {
            Some(ParsedCommand::Command(ControlCommand::AddUser { name, password })) => {
                assert_eq!(name, "alice");
                assert_eq!(password, "hunter2");
            }
            _ => panic!("expected AddUser"),
        }
    }

    #[test]
    fn adduser_missing_password_is_unrecognized() {
        assert!(matches!(parse("adduser alice"), None));
    }

    #[test]
    fn parses_removeuser() {
        match parse("removeuser alice") {
            Some(ParsedCommand::Command(ControlCommand::RemoveUser { name })) => assert_eq!(name, "alice"),
            _ => panic!("expected RemoveUser"),
        }
    }

    #[test]
    fn parses_shutdown_and_help() {
        assert!(matches!(parse("shutdown"), Some(ParsedCommand::Command(ControlCommand::Shutdown))));
        assert!(matches!(parse("help"), Some(ParsedCommand::Help)));
    }

    #[test]
    fn unknown_command_is_none() {
        assert!(parse("frobnicate").is_none());
    }
}
