//! Recursive-descent parser for plow commands.
//!
//! Grammar:
//!
//! ```text
//! command   := "plow" plow_args | "straighten" direction
//! plow_args := option | direction [layers]
//! option    := "boundary" | "noboundary" | "help"
//!            | "horizon" [integer | "infinity"]
//!            | "jogs" | "nojogs" | "straighten" | "nostraighten"
//!            | "selection" [direction [integer]]
//! ```
//!
//! Option names may be abbreviated to any unique prefix. A word that is a
//! direction name is a direction even if it also prefixes an option.

use super::ast::Command;
use super::lexer::{Token, TokenKind};
use crate::model::Direction;
use crate::plow::JogHorizon;
use crate::{Error, Result};

/// Plow options with their one-line help text.
pub const PLOW_OPTIONS: &[(&str, &str)] = &[
    ("boundary", "set boundary around area plowing may affect"),
    ("help", "print this help information"),
    ("horizon", "[n] set the horizon for jog introduction to n lambda"),
    ("jogs", "reenable jog insertion (set horizon to 0)"),
    ("selection", "[direction [amount]] plow the selection"),
    ("straighten", "automatically straighten jogs after each plow"),
    ("noboundary", "remove boundary around area plowing may affect"),
    ("nojogs", "disable jog insertion (infinite jog horizon)"),
    ("nostraighten", "don't automatically straighten jogs after each plow"),
];

enum Lookup {
    Found(&'static str),
    Ambiguous,
    Missing,
}

/// Exact match first, then unique prefix.
fn lookup(word: &str) -> Lookup {
    let word = word.to_ascii_lowercase();
    if let Some((name, _)) = PLOW_OPTIONS.iter().find(|(name, _)| *name == word) {
        return Lookup::Found(name);
    }
    let mut hits = PLOW_OPTIONS.iter().filter(|(name, _)| name.starts_with(word.as_str()));
    match (hits.next(), hits.next()) {
        (Some((name, _)), None) => Lookup::Found(name),
        (Some(_), Some(_)) => Lookup::Ambiguous,
        _ => Lookup::Missing,
    }
}

pub(super) struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    pub(super) fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub(super) fn parse_command(&mut self) -> Result<Command> {
        let verb = self.expect_word("command")?;
        let cmd = match verb.to_ascii_lowercase().as_str() {
            "plow" => self.parse_plow()?,
            "straighten" => {
                let word = self.expect_word("direction")?;
                Command::Straighten { dir: self.direction(&word)? }
            }
            _ => return Err(self.error_at(self.pos - 1, format!("unknown command \"{verb}\""))),
        };
        if !self.at(TokenKind::Eof) {
            let extra = self.peek().text.clone();
            return Err(self.error(format!("unexpected \"{extra}\"; type \"plow help\" for help")));
        }
        Ok(cmd)
    }

    // ========================================================================
    // plow ...
    // ========================================================================

    fn parse_plow(&mut self) -> Result<Command> {
        let start = self.pos;
        let word = self.expect_word("plow option or direction")?;

        if let Ok(dir) = Direction::parse(&word) {
            let layers = self.eat_word();
            return Ok(Command::Plow { dir, layers });
        }

        let name = match lookup(&word) {
            Lookup::Found(name) => name,
            Lookup::Ambiguous => {
                return Err(self.error_at(start, format!("ambiguous plowing option \"{word}\"")));
            }
            Lookup::Missing => {
                return Err(self.error_at(start, format!("\"{word}\" isn't a valid plow option")));
            }
        };

        Ok(match name {
            "boundary" => Command::Boundary,
            "noboundary" => Command::NoBoundary,
            "help" => Command::Help,
            "jogs" => Command::Jogs,
            "nojogs" => Command::NoJogs,
            "straighten" => Command::AutoStraighten(true),
            "nostraighten" => Command::AutoStraighten(false),
            "horizon" => Command::Horizon(self.parse_horizon()?),
            "selection" => self.parse_selection()?,
            _ => return Err(self.error_at(start, format!("unhandled plow option \"{name}\""))),
        })
    }

    fn parse_horizon(&mut self) -> Result<Option<JogHorizon>> {
        if self.at(TokenKind::Eof) {
            return Ok(None);
        }
        if self.at(TokenKind::Integer) {
            let n = self.integer()?;
            if n < 0 {
                return Err(self.error_at(self.pos - 1, "jog horizon must not be negative".into()));
            }
            return Ok(Some(JogHorizon::Units(n)));
        }
        let word = self.expect_word("horizon")?;
        if "infinity".starts_with(word.to_ascii_lowercase().as_str()) {
            Ok(Some(JogHorizon::Infinite))
        } else {
            Err(self.error_at(self.pos - 1, format!("bad horizon \"{word}\"")))
        }
    }

    fn parse_selection(&mut self) -> Result<Command> {
        let Some(word) = self.eat_word() else {
            return Ok(Command::Selection { dir: None, amount: None });
        };
        let dir = self.direction(&word)?;
        let amount = if self.at(TokenKind::Integer) { Some(self.integer()?) } else { None };
        Ok(Command::Selection { dir: Some(dir), amount })
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        let i = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        &self.tokens[i]
    }

    fn eat_word(&mut self) -> Option<String> {
        if self.at(TokenKind::Word) {
            Some(self.advance().text.clone())
        } else {
            None
        }
    }

    fn expect_word(&mut self, what: &str) -> Result<String> {
        match self.peek().kind {
            TokenKind::Word => Ok(self.advance().text.clone()),
            TokenKind::Integer => {
                let got = self.peek().text.clone();
                Err(self.error(format!("expected {what}, got \"{got}\"")))
            }
            TokenKind::Eof => Err(self.error(format!("expected {what}"))),
        }
    }

    fn integer(&mut self) -> Result<i32> {
        let start = self.pos;
        let text = self.advance().text.clone();
        text.parse::<i32>()
            .map_err(|_| self.error_at(start, format!("number \"{text}\" out of range")))
    }

    fn direction(&self, word: &str) -> Result<Direction> {
        Direction::parse(word).map_err(|_| self.error_at(self.pos - 1, format!("bad direction \"{word}\"")))
    }

    fn error(&self, message: String) -> Error {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, index: usize, message: String) -> Error {
        let position = self.tokens.get(index).map(|t| t.span.start).unwrap_or(0);
        Error::SyntaxError { position, message }
    }
}
