//! # Plow Commands
//!
//! Text front end for the plow: `plow <direction> [layers]`, the plow
//! options, and `straighten <direction>`. Parsing is a pure function;
//! [`crate::Plower::execute`] applies a parsed command against an
//! [`EditContext`].

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::Command;
pub use parser::PLOW_OPTIONS;

use serde::{Deserialize, Serialize};

use crate::model::{Point, Rect};
use crate::storage::DefId;
use crate::Result;

/// Parse one command line.
pub fn parse(line: &str) -> Result<Command> {
    let tokens = lexer::tokenize(line)?;
    let mut parser = parser::Parser::new(&tokens);
    parser.parse_command()
}

/// Editor state a command runs against. Commands that move the box update
/// it in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditContext {
    /// The cell being edited.
    pub def: DefId,
    /// The box, in `def` coordinates.
    pub edit_box: Option<Rect>,
    /// Where the user is pointing, in `def` coordinates.
    pub point: Option<Point>,
}

impl EditContext {
    pub fn new(def: DefId) -> Self {
        Self { def, edit_box: None, point: None }
    }

    pub fn with_box(mut self, r: Rect) -> Self {
        self.edit_box = Some(r);
        self
    }

    pub fn with_point(mut self, p: Point) -> Self {
        self.point = Some(p);
        self
    }
}

/// Help text listing every plow option.
pub fn help_text() -> String {
    let mut out = String::from("Plow options:\n");
    out.push_str("    <direction> [layers]  plow the box, seeing only layers at first\n");
    for (name, help) in PLOW_OPTIONS {
        out.push_str(&format!("    {name:<20}  {help}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;
    use crate::plow::JogHorizon;
    use crate::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_direction_plow() {
        assert_eq!(parse("plow east").unwrap(), Command::Plow { dir: Direction::East, layers: None });
        assert_eq!(
            parse("plow up poly,metal").unwrap(),
            Command::Plow { dir: Direction::North, layers: Some("poly,metal".into()) }
        );
    }

    #[test]
    fn test_one_letter_direction_beats_option_prefix() {
        assert_eq!(parse("plow s").unwrap(), Command::Plow { dir: Direction::South, layers: None });
        assert_eq!(parse("plow n").unwrap(), Command::Plow { dir: Direction::North, layers: None });
    }

    #[test]
    fn test_option_prefixes() {
        assert_eq!(parse("plow bound").unwrap(), Command::Boundary);
        assert_eq!(parse("plow nob").unwrap(), Command::NoBoundary);
        assert_eq!(parse("plow nos").unwrap(), Command::AutoStraighten(false));
        assert_eq!(parse("plow straighten").unwrap(), Command::AutoStraighten(true));
        assert_eq!(parse("plow jogs").unwrap(), Command::Jogs);
        assert_eq!(parse("plow nojogs").unwrap(), Command::NoJogs);
        assert_eq!(parse("plow help").unwrap(), Command::Help);
    }

    #[test]
    fn test_ambiguous_prefix() {
        let err = parse("plow no").unwrap_err();
        match err {
            Error::SyntaxError { position, message } => {
                assert_eq!(position, 5);
                assert!(message.contains("ambiguous"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_horizon_forms() {
        assert_eq!(parse("plow horizon").unwrap(), Command::Horizon(None));
        assert_eq!(parse("plow horizon 7").unwrap(), Command::Horizon(Some(JogHorizon::Units(7))));
        assert_eq!(parse("plow horizon inf").unwrap(), Command::Horizon(Some(JogHorizon::Infinite)));
        assert!(parse("plow horizon -1").is_err());
        assert!(parse("plow horizon 3 4").is_err());
    }

    #[test]
    fn test_selection_forms() {
        assert_eq!(parse("plow selection").unwrap(), Command::Selection { dir: None, amount: None });
        assert_eq!(
            parse("plow sel west 4").unwrap(),
            Command::Selection { dir: Some(Direction::West), amount: Some(4) }
        );
        assert_eq!(
            parse("plow selection e").unwrap(),
            Command::Selection { dir: Some(Direction::East), amount: None }
        );
        assert!(parse("plow selection sideways").is_err());
    }

    #[test]
    fn test_straighten_command() {
        assert_eq!(parse("straighten left").unwrap(), Command::Straighten { dir: Direction::West });
        assert!(parse("straighten").is_err());
        assert!(parse("straighten east now").is_err());
    }

    #[test]
    fn test_bad_commands() {
        assert!(parse("").is_err());
        assert!(parse("plow").is_err());
        assert!(parse("plow sideways").is_err());
        assert!(parse("plow boundary extra").is_err());
        assert!(parse("shove east").is_err());
    }

    #[test]
    fn test_help_lists_every_option() {
        let help = help_text();
        for (name, _) in PLOW_OPTIONS {
            assert!(help.contains(name), "{name} missing");
        }
    }

    #[test]
    fn test_edits_layout() {
        assert!(parse("plow e").unwrap().edits_layout());
        assert!(!parse("plow jogs").unwrap().edits_layout());
    }
}
