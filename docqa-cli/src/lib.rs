//! # docqa-cli
//!
//! Interactive question answering over a single document.
//!
//! The `docqa` binary ingests one PDF or text file through a
//! [`RagPipeline`](docqa_rag::RagPipeline) and then reads questions from the
//! terminal until the user types `exit`.

pub mod args;
pub mod console;
pub mod providers;

pub use args::{Cli, Provider};
