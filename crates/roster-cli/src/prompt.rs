//! Yes/no confirmation on the terminal.

use std::io::{self, BufRead, Write};

/// Ask `question` on stderr and read the answer from stdin. Anything other
/// than `y` or `yes` declines.
pub fn confirm(question: &str) -> anyhow::Result<bool> {
  eprint!("{question} [y/N] ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
  matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
