//! Chat front ends for Mimic.
//!
//! Each channel yields inbound messages (optionally carrying an uploaded
//! transcript) and delivers persona replies back to the user.
//!
//! Available channels:
//! - **CLI** — interactive terminal chat (stdin/stdout)

pub mod cli;

pub use cli::{CliChannel, LOCAL_USER, LineAction, parse_line};
