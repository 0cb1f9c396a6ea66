//! Choosing exactly one candidate for download.

use std::fmt;

use tracing::warn;

use super::{Candidate, ResolveError};

/// How the caller wants to choose among several candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// 0-based index, from programmatic callers.
    Index(usize),
    /// Operator-typed text: a 1-based number, or empty for the first candidate.
    Text(String),
    /// No preference; take the first candidate.
    Default,
}

/// A rejected choice that was recovered by taking the first candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSelection {
    /// The choice as given.
    pub input: String,
    /// Number of candidates that were on offer.
    pub candidate_count: usize,
}

impl fmt::Display for InvalidSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid selection '{}' (expected 1-{}); using the first candidate",
            self.input, self.candidate_count
        )
    }
}

/// The chosen candidate plus any recovery warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The candidate to download.
    pub candidate: Candidate,
    /// Its 0-based position in the candidate list.
    pub index: usize,
    /// Set when the requested choice was invalid.
    pub warning: Option<InvalidSelection>,
}

/// Picks one candidate; never fails while at least one exists.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    page_url: String,
}

impl Selector {
    /// Creates a selector; `page_url` only labels the empty-list error.
    #[must_use]
    pub fn new(page_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
        }
    }

    /// Selects one candidate.
    ///
    /// A single candidate is returned regardless of `choice`. With several,
    /// an out-of-range or non-numeric choice falls back to the first and
    /// records an [`InvalidSelection`].
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NoCandidatesFound`] for an empty list.
    pub fn select(
        &self,
        candidates: &[Candidate],
        choice: &Choice,
    ) -> Result<Selection, ResolveError> {
        let Some(first) = candidates.first() else {
            return Err(ResolveError::no_candidates(&self.page_url, 0));
        };
        if candidates.len() == 1 {
            return Ok(Selection {
                candidate: first.clone(),
                index: 0,
                warning: None,
            });
        }

        let (index, warning) = match choice_to_index(choice, candidates.len()) {
            Ok(index) => (index, None),
            Err(input) => {
                let warning = InvalidSelection {
                    input,
                    candidate_count: candidates.len(),
                };
                warn!(%warning, "Invalid selection");
                (0, Some(warning))
            }
        };

        Ok(Selection {
            candidate: candidates[index].clone(),
            index,
            warning,
        })
    }
}

/// Maps a choice to a valid 0-based index, or returns the offending input.
fn choice_to_index(choice: &Choice, len: usize) -> Result<usize, String> {
    match choice {
        Choice::Default => Ok(0),
        Choice::Index(index) if *index < len => Ok(*index),
        Choice::Index(index) => Err(index.to_string()),
        Choice::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            match trimmed.parse::<usize>() {
                Ok(number) if (1..=len).contains(&number) => Ok(number - 1),
                _ => Err(trimmed.to_string()),
            }
        }
    }
}
