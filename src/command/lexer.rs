//! Command lexer: splits a command line into words and integers.

use crate::{Error, Result};

/// A token from the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

/// Source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Anything that is not a number: keywords, directions, layer lists.
    Word,
    Integer,
    Eof,
}

/// Tokenize one command line. `#` starts a comment that runs to the end.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }

            '#' => break,

            // Integers, optionally signed
            c if c.is_ascii_digit()
                || (c == '-' && matches!(chars.clone().nth(1), Some((_, d)) if d.is_ascii_digit())) =>
            {
                let start = pos;
                let mut num = String::new();
                num.push(c);
                chars.next();
                while let Some(&(_, c)) = chars.peek() {
                    if !c.is_ascii_digit() {
                        break;
                    }
                    num.push(c);
                    chars.next();
                }
                if matches!(chars.peek(), Some(&(_, c)) if !c.is_whitespace() && c != '#') {
                    return Err(Error::SyntaxError {
                        position: start,
                        message: format!("Malformed number starting \"{num}\""),
                    });
                }
                tokens.push(Token {
                    kind: TokenKind::Integer,
                    span: Span { start, end: start + num.len() },
                    text: num,
                });
            }

            // Words run to the next blank
            _ => {
                let start = pos;
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_whitespace() || c == '#' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Word,
                    span: Span { start, end: start + word.len() },
                    text: word,
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { start: input.len(), end: input.len() },
        text: String::new(),
    });
    Ok(tokens)
}
