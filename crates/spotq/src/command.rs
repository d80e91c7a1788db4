//! Chat command parsing.
//!
//! Text is trimmed and matched case-insensitively. Anything unrecognized parses to
//! `None` and is ignored by the dispatcher.

/// Every operation a chat user can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `Q`
    Request,
    /// `SO`
    Release,
    /// `P`
    Pass,
    /// `CHECK`
    Check,
    /// `LINE`
    Line,
    /// `SPOT <n> DOWN`
    SpotDown(u32),
    /// `SPOT <n> UP`
    SpotUp(u32),
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().to_uppercase();
        match text.as_str() {
            "Q" => return Some(Command::Request),
            "SO" => return Some(Command::Release),
            "P" => return Some(Command::Pass),
            "CHECK" => return Some(Command::Check),
            "LINE" => return Some(Command::Line),
            _ => {}
        }

        let mut words = text.split_whitespace();
        let (Some("SPOT"), Some(number), Some(action), None) =
            (words.next(), words.next(), words.next(), words.next())
        else {
            return None;
        };
        let spot = number.parse::<u32>().ok()?;
        match action {
            "DOWN" => Some(Command::SpotDown(spot)),
            "UP" => Some(Command::SpotUp(spot)),
            _ => None,
        }
    }

    /// Commands that only read the pool.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Command::Check | Command::Line)
    }
}

/// Help text listing the commands, for the startup announcement.
pub const COMMAND_HELP: &str = "Available commands: `Q` (get spot), `SO` (free spot), \
`P` (pass spot, keep your place), `CHECK` (check for warnings), \
`LINE` (show assignments and queue), `SPOT <n> DOWN` / `SPOT <n> UP` (maintenance)";
