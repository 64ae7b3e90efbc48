//! The bracket-framed wire protocol.
//!
//! Three layers, all stateless except the framer:
//!
//! - [`framer`]: splits a byte stream into `[` … `]` frames
//! - [`format`]: produces exact payload bytes per operation
//! - [`patterns`] + [`parse`]: regex dispatch to typed requests/reports
//!
//! Every command is a triple - a formatter, a pattern, and a parser -
//! keyed by shape in two flat tables, one per direction.

pub mod format;
pub mod framer;
pub mod parse;
pub mod patterns;

pub use framer::{Framer, FramerEvent, FRAME_MAX};
pub use parse::{format_report, parse_report, parse_request, Report, Request};
