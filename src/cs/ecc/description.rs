//! Lexer and parser for the textual LDPC code description format.
//!
//! A description lists the parity checks of a code, one row per check:
//!
//! ```text
//! file := row (';' row)* '.'
//! row  := index (separator index)*
//! ```
//!
//! An index is a maximal run of decimal digits naming a variable node
//! (0-based). Any character other than a digit, `;` or `.` separates two
//! indices, so `0 1 2`, `0,1,2` and `0\t1\n2` all describe the same row.
//! Everything after the terminating `.` is ignored.
//!
//! Two indices written back to back without a separator are read as one
//! number. The lexer cannot tell that apart from a genuine multi-digit index;
//! the parser only warns when a row repeats a variable, which is the usual
//! symptom of such a file.

use crate::cs::error::{Error, Result};
use log::warn;
use std::collections::HashSet;

/// Row separator
pub const ROW_SEPARATOR: u8 = b';';
/// End-of-description marker
pub const TERMINATOR: u8 = b'.';

/// Lexical unit of a code description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A variable-node index
    Index(usize),
    /// `;` closing the current row
    RowEnd,
    /// `.` closing the description
    End,
}

/// Buffered lexer over a complete description.
///
/// Yields `(byte offset, token)` pairs and stops after [`Token::End`].
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `input`
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.as_bytes(),
            pos: 0,
            finished: false,
        }
    }

    /// Byte offset of the next unread character
    pub fn position(&self) -> usize {
        self.pos
    }

    fn skip_separators(&mut self) {
        while let Some(&c) = self.input.get(self.pos) {
            if c.is_ascii_digit() || c == ROW_SEPARATOR || c == TERMINATOR {
                break;
            }
            self.pos += 1;
        }
    }

    fn read_index(&mut self) -> Result<usize> {
        let start = self.pos;
        let end = self.input[start..]
            .iter()
            .position(|c| !c.is_ascii_digit())
            .map_or(self.input.len(), |len| start + len);
        self.pos = end;

        self.input[start..end].iter().try_fold(0usize, |acc, &d| {
            acc.checked_mul(10)
                .and_then(|acc| acc.checked_add(usize::from(d - b'0')))
                .ok_or_else(|| Error::format(start, "variable index does not fit in usize"))
        })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<(usize, Token)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        self.skip_separators();

        let start = self.pos;
        let c = *self.input.get(start)?;
        let token = match c {
            ROW_SEPARATOR => {
                self.pos += 1;
                Token::RowEnd
            }
            TERMINATOR => {
                self.pos += 1;
                self.finished = true;
                Token::End
            }
            _ => match self.read_index() {
                Ok(index) => Token::Index(index),
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            },
        };
        Some(Ok((start, token)))
    }
}

/// Parse a description into one list of variable indices per check.
///
/// # Errors
///
/// Returns [`Error::Format`] if the input ends before the terminating `.`,
/// if any row is empty, or if an index overflows `usize`.
pub fn parse_description(input: &str) -> Result<Vec<Vec<usize>>> {
    let mut rows: Vec<Vec<usize>> = vec![Vec::new()];

    for item in Lexer::new(input) {
        let (position, token) = item?;
        match token {
            Token::Index(index) => {
                if let Some(row) = rows.last_mut() {
                    row.push(index);
                }
            }
            Token::RowEnd | Token::End => {
                if rows.last().is_some_and(|row| row.is_empty()) {
                    return Err(Error::format(
                        position,
                        format!("check {} has no variables", rows.len() - 1),
                    ));
                }
                if token == Token::End {
                    flag_repeated_variables(&rows);
                    return Ok(rows);
                }
                rows.push(Vec::new());
            }
        }
    }

    Err(Error::format(input.len(), "missing terminating '.'"))
}

fn flag_repeated_variables(rows: &[Vec<usize>]) {
    for (check, row) in rows.iter().enumerate() {
        let mut seen = HashSet::with_capacity(row.len());
        for &v in row {
            if !seen.insert(v) {
                warn!(
                    "check {} lists variable {} more than once; \
                     indices written without a separator are merged",
                    check, v
                );
            }
        }
    }
}
