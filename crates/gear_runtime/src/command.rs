//! Command parsing

use std::str::FromStr;

use gear_grid::{Cell, Orientation};
use gear_inventory::{DropTarget, SlotName};
use thiserror::Error;

/// Command error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
}

/// A line of user input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Drag an item and drop it on a target
    Drag { item: String, target: DropTarget },
    /// Double-activate an item
    Toggle(String),
    /// Change orientation
    Rotate(Orientation),
    Show,
    List,
    /// Resubmit writes that failed
    Retry,
    Help,
    Quit,
}

pub const HELP: &[&str] = &[
    "drag <item> <row,col|slot|outside>  drag an item and drop it",
    "toggle <item>                       equip or unequip",
    "rotate <horizontal|vertical>        change the grid orientation",
    "show                                draw the inventory",
    "list                                list items",
    "retry                               resend failed writes",
    "quit                                exit",
];

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let verb = words.next().ok_or(CommandError::Empty)?.to_lowercase();
        let rest: Vec<&str> = words.collect();

        match verb.as_str() {
            "drag" | "move" => {
                // Item names may contain spaces; the target is the last word
                let (target, item) = rest
                    .split_last()
                    .filter(|(_, item)| !item.is_empty())
                    .ok_or(CommandError::MissingArgument("drag <item> <target>"))?;
                Ok(Self::Drag {
                    item: item.join(" "),
                    target: parse_target(target)?,
                })
            }
            "toggle" | "use" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument("toggle <item>"));
                }
                Ok(Self::Toggle(rest.join(" ")))
            }
            "rotate" => {
                let orientation = rest
                    .first()
                    .ok_or(CommandError::MissingArgument("rotate <horizontal|vertical>"))?;
                orientation
                    .parse()
                    .map(Self::Rotate)
                    .map_err(CommandError::InvalidArguments)
            }
            "show" => Ok(Self::Show),
            "list" | "items" => Ok(Self::List),
            "retry" => Ok(Self::Retry),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(CommandError::UnknownCommand(verb)),
        }
    }
}

/// `row,col`, a slot name, or `outside`
fn parse_target(s: &str) -> Result<DropTarget, CommandError> {
    if s.eq_ignore_ascii_case("outside") {
        return Ok(DropTarget::Outside);
    }

    if let Some((row, col)) = s.split_once(',') {
        let bad = |_| CommandError::InvalidArguments(format!("bad cell {}", s));
        let row = row.trim().parse().map_err(bad)?;
        let col = col.trim().parse().map_err(bad)?;
        return Ok(DropTarget::Cell(Cell::new(row, col)));
    }

    s.parse::<SlotName>()
        .map(DropTarget::Slot)
        .map_err(CommandError::InvalidArguments)
}
