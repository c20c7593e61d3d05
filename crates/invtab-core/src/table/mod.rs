//! Invoice table row extraction.

mod collector;
mod parser;
pub mod patterns;

pub use collector::RowCollector;
pub use parser::{parse_line, parse_lines, RowParser};
