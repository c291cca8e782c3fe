// Serial line protocol from the vision module
//
// Provides:
// - Fixed-capacity line framing of the raw byte stream
// - Parsing of $TARGET / $SERVO lines into commands

pub mod frame;
pub mod parser;

pub use frame::{AppendOutcome, FrameAccumulator};
pub use parser::parse_command;
