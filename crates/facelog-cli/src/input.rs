//! Stdin plumbing for the monitoring loop.
//!
//! A dedicated reader thread forwards raw lines over a channel so the
//! recognition loop can poll commands without blocking on stdin. The
//! loop stays the single consumer: registration pulls the name prompt
//! answer from the same channel.

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver};

/// Commands accepted while the monitoring loop is streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Register,
    CheckIn,
    CheckOut,
    Quit,
}

/// Parse one stdin line into a command. Whitespace is ignored; anything
/// unrecognized is `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "r" => Some(Command::Register),
        "c" => Some(Command::CheckIn),
        "g" => Some(Command::CheckOut),
        "q" => Some(Command::Quit),
        _ => None,
    }
}

/// Spawn the stdin reader thread. The channel disconnects when stdin
/// reaches EOF, which callers treat as quit.
pub fn spawn_stdin_lines() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("facelog-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .expect("failed to spawn stdin reader thread");
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(parse_command("r"), Some(Command::Register));
        assert_eq!(parse_command("c"), Some(Command::CheckIn));
        assert_eq!(parse_command("g"), Some(Command::CheckOut));
        assert_eq!(parse_command("q"), Some(Command::Quit));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse_command("  c \n"), Some(Command::CheckIn));
    }

    #[test]
    fn test_parse_unknown_is_none() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("x"), None);
        assert_eq!(parse_command("checkin"), None);
    }
}
