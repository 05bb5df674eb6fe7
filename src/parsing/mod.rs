//! Lexing and parsing of unit expressions. The tokenizer produces a
//! flat token stream with source spans; the parser is a plain
//! recursive descent over that stream, one function per precedence
//! level.

pub mod parser;
pub mod source;
pub mod timestamp;
pub mod tokenizer;
