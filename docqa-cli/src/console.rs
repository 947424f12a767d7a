//! The interactive question loop.

use anyhow::Result;
use docqa_rag::{Answer, RagPipeline};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

/// Prompt shown before every question.
pub const PROMPT: &str = "Ask a question (or type 'exit' to quit): ";

/// Whether `line` asks to leave the loop.
pub fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Format an answer for the terminal, listing its sources when requested.
pub fn render_answer(answer: &Answer, show_sources: bool) -> String {
    let mut out = format!("Answer: {}", answer.text);
    if show_sources && !answer.sources.is_empty() {
        out.push_str("\n\nSources:");
        for source in &answer.sources {
            out.push_str(&format!("\n  - {}", source.label));
        }
    }
    out
}

/// Read questions until `exit`, end of input or Ctrl-C, printing each answer.
///
/// A failed question prints its error and the loop carries on.
pub async fn run(pipeline: &RagPipeline, show_sources: bool) -> Result<()> {
    let mut editor = DefaultEditor::new()?;

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let question = line.trim();
        if is_exit(question) {
            break;
        }
        if question.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(question) {
            debug!(error = %e, "could not record history");
        }

        match pipeline.ask(question).await {
            Ok(answer) => println!("{}\n", render_answer(&answer, show_sources)),
            Err(e) => {
                warn!(error = %e, "question failed");
                eprintln!("Error: {e}\n");
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}
