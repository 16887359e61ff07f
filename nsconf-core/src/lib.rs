//! Tokenizer and statement parser for NetScaler `ns.conf` text.
//!
//! This crate knows the dialect's lexical rules and command grammar but
//! nothing about applications. Higher-level tools group the resulting
//! [`Statement`]s into virtual servers and their bindings.

pub mod lexer;
pub mod parser;
pub mod statement;

pub use lexer::{logical_lines, tokenize, LexError, LogicalLine, Token};
pub use parser::{parse_config, parse_statement, ParseError, ParsedConfig};
pub use statement::{OptValue, OptionMap, Statement, StatementKind, Verb};
