//! Regular expressions with full submatch extraction, matched by a lazily
//! determinized tagged automaton.
//!
//! A pattern is parsed, compiled to a tagged NFA whose epsilon edges carry
//! priorities (greedy or lazy) and group boundary tags, and determinized on
//! demand while matching. Tag positions live in persistent histories, so every
//! iteration of a repeated group is recovered without backtracking.
//!
//! ```
//! use regex_tdfa::Regex;
//!
//! let re = Regex::new("(((a+)b)+c)+").unwrap();
//! let m = re.interpret("aaabcaaabcaabc");
//! assert_eq!(m.start(), Some(0));
//! assert_eq!(m.end(), Some(14));
//! assert_eq!(m.group(1), Some(10..14));
//! assert_eq!(m.spans(1).len(), 3);
//! ```

mod alphabet;
mod ast;
mod compiler;
mod config;
mod determinize;
mod error;
mod history;
mod r#match;
mod parser;
mod regex;
mod registers;
mod table;
mod vm;

pub use crate::config::Config;
pub use crate::error::{Error, ParseError, Result};
pub use crate::r#match::{Capture, Match, MatchResult};
pub use crate::regex::Regex;
