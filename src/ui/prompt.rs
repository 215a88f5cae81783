//! Interactive confirmation on the terminal

use crate::plan::{ConfirmationRequest, Confirmer, GatedOperation};
use console::{style, Term};
use indicatif::HumanBytes;

/// Paths shown before the list is collapsed
const DEFAULT_SAMPLE: usize = 10;

/// Asks on stderr and reads the answer from the terminal
///
/// When stderr is not a terminal nobody can answer, so every request is declined.
#[derive(Debug, Clone)]
pub struct TerminalConfirmer {
    sample: usize,
}

impl Default for TerminalConfirmer {
    fn default() -> Self {
        Self {
            sample: DEFAULT_SAMPLE,
        }
    }
}

impl TerminalConfirmer {
    pub fn new(sample: usize) -> Self {
        Self { sample }
    }
}

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, request: &ConfirmationRequest) -> bool {
        let term = Term::stderr();
        if !term.is_term() {
            return false;
        }

        if term.write_line(&format_request(request, self.sample)).is_err() {
            return false;
        }
        if term
            .write_str(&format!("{} ", style("Type 'yes' to continue:").bold()))
            .is_err()
        {
            return false;
        }

        match term.read_line() {
            Ok(answer) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("yes") || answer.eq_ignore_ascii_case("y")
}

/// Headline plus a sample of the affected paths
pub fn format_request(request: &ConfirmationRequest, sample: usize) -> String {
    let headline = match request.operation {
        GatedOperation::Delete => format!(
            "About to delete {} path(s) ({}) from {}",
            request.paths.len(),
            HumanBytes(request.total_bytes),
            request.destination.display()
        ),
        GatedOperation::Restore => format!(
            "About to restore {} path(s) ({}) from {} into {}",
            request.paths.len(),
            HumanBytes(request.total_bytes),
            request.destination.display(),
            request.source.display()
        ),
    };

    let mut lines = vec![style(headline).yellow().bold().to_string()];
    for path in request.paths.iter().take(sample) {
        lines.push(format!("  {}", path.display()));
    }
    if request.paths.len() > sample {
        lines.push(format!("  ... and {} more", request.paths.len() - sample));
    }
    lines.join("\n")
}
