use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Engine options that can be set through `setoption`, named as Stockfish names them.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum EngineOption {
    Threads,
    Hash,
    MultiPv,
    SkillLevel,
    MoveOverhead,
    SlowMover,
    LimitStrength,
    Elo,
    Ponder,
    ShowWdl,
    Chess960,
    SyzygyPath,
    ClearHash,
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("Unknown engine option '{0}'")]
pub struct UnknownOptionError(pub String);

impl EngineOption {
    pub const ALL: [EngineOption; 13] = [
        EngineOption::Threads,
        EngineOption::Hash,
        EngineOption::MultiPv,
        EngineOption::SkillLevel,
        EngineOption::MoveOverhead,
        EngineOption::SlowMover,
        EngineOption::LimitStrength,
        EngineOption::Elo,
        EngineOption::Ponder,
        EngineOption::ShowWdl,
        EngineOption::Chess960,
        EngineOption::SyzygyPath,
        EngineOption::ClearHash,
    ];

    /// The name as it appears on the wire.
    pub fn uci_name(&self) -> &'static str {
        match self {
            EngineOption::Threads => "Threads",
            EngineOption::Hash => "Hash",
            EngineOption::MultiPv => "MultiPV",
            EngineOption::SkillLevel => "Skill Level",
            EngineOption::MoveOverhead => "Move Overhead",
            EngineOption::SlowMover => "Slow Mover",
            EngineOption::LimitStrength => "UCI_LimitStrength",
            EngineOption::Elo => "UCI_Elo",
            EngineOption::Ponder => "Ponder",
            EngineOption::ShowWdl => "UCI_ShowWDL",
            EngineOption::Chess960 => "UCI_Chess960",
            EngineOption::SyzygyPath => "SyzygyPath",
            EngineOption::ClearHash => "Clear Hash",
        }
    }
}

impl Display for EngineOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uci_name())
    }
}

impl FromStr for EngineOption {
    type Err = UnknownOptionError;

    /// Case-insensitive match on the UCI name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();

        EngineOption::ALL
            .into_iter()
            .find(|x| x.uci_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownOptionError(s.to_string()))
    }
}

#[test]
fn check_option_names_round_trip() {
    for option in EngineOption::ALL {
        assert_eq!(option.uci_name().parse::<EngineOption>(), Ok(option));
    }
}

#[test]
fn check_option_parse_is_case_insensitive() {
    assert_eq!("skill level".parse::<EngineOption>(), Ok(EngineOption::SkillLevel));
    assert_eq!(" uci_elo ".parse::<EngineOption>(), Ok(EngineOption::Elo));
    assert_eq!(
        "Contempt".parse::<EngineOption>(),
        Err(UnknownOptionError("Contempt".to_string())),
    );
}
