//! Trading actions a script can request and the codes the runtime expects.

use crate::domain::token::TerminalKind;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Nothing,
    Sell,
    Buy,
}

impl Action {
    /// Numeric code stored in `AlgorithmData::action`.
    pub fn code(self) -> u8 {
        match self {
            Action::Nothing => 0,
            Action::Sell => 1,
            Action::Buy => 2,
        }
    }

    pub fn from_kind(kind: TerminalKind) -> Option<Action> {
        match kind {
            TerminalKind::DoNothing => Some(Action::Nothing),
            TerminalKind::Sell => Some(Action::Sell),
            TerminalKind::Buy => Some(Action::Buy),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Nothing => "do_nothing",
            Action::Sell => "sell",
            Action::Buy => "buy",
        };
        f.write_str(name)
    }
}

/// Symbols every compiled plugin exports.
pub mod abi {
    pub const RANGES_SIZE: &str = "ranges_size";
    pub const ALGORITHM: &str = "algorithm";
}
