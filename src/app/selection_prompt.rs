//! Candidate listing and interactive choice.

use std::io::{self, BufRead, Write};

use streamgrab_core::Candidate;
use streamgrab_core::resolver::Choice;

/// Renders the numbered candidate list shown before choosing.
pub(crate) fn format_candidates(candidates: &[Candidate]) -> String {
    let mut out = format!("Found {} media URLs:\n", candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        out.push_str(&format!(
            "  {}. [{}] {}\n",
            index + 1,
            candidate.media_kind,
            candidate.url
        ));
    }
    out
}

/// Decides how to choose among several candidates.
///
/// `--select` wins; otherwise the operator is prompted when stdin is a
/// terminal, and the first candidate is taken when it is not.
pub(crate) fn decide_choice<R, W>(
    select: Option<&str>,
    interactive: bool,
    candidate_count: usize,
    reader: R,
    writer: W,
) -> io::Result<Choice>
where
    R: BufRead,
    W: Write,
{
    if let Some(text) = select {
        return Ok(Choice::Text(text.to_string()));
    }
    if !interactive {
        return Ok(Choice::Default);
    }
    prompt_choice(candidate_count, reader, writer)
}

fn prompt_choice<R, W>(candidate_count: usize, mut reader: R, mut writer: W) -> io::Result<Choice>
where
    R: BufRead,
    W: Write,
{
    write!(
        writer,
        "Select a candidate [1-{candidate_count}] (Enter for 1): "
    )?;
    writer.flush()?;
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(Choice::Text(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use streamgrab_core::{CandidateSource, MediaKind};

    use super::*;

    #[test]
    fn test_format_candidates_numbers_from_one() {
        let candidates = vec![
            Candidate::new(
                "https://cdn.example.com/a.mp4",
                MediaKind::Mp4,
                CandidateSource::NetworkObservation,
            ),
            Candidate::new(
                "https://cdn.example.com/b.m3u8",
                MediaKind::Hls,
                CandidateSource::NetworkObservation,
            ),
        ];
        let listing = format_candidates(&candidates);
        assert!(listing.starts_with("Found 2 media URLs:"));
        assert!(listing.contains("  1. [mp4] https://cdn.example.com/a.mp4"));
        assert!(listing.contains("  2. [hls] https://cdn.example.com/b.m3u8"));
    }

    #[test]
    fn test_select_flag_skips_prompt() {
        let mut output = Vec::new();
        let choice = decide_choice(Some("2"), true, 3, &b""[..], &mut output).unwrap();
        assert_eq!(choice, Choice::Text("2".to_string()));
        assert!(output.is_empty());
    }

    #[test]
    fn test_invalid_select_flag_is_left_to_selector() {
        let mut output = Vec::new();
        let choice = decide_choice(Some("abc"), false, 2, &b""[..], &mut output).unwrap();
        assert_eq!(choice, Choice::Text("abc".to_string()));
    }

    #[test]
    fn test_non_interactive_takes_default() {
        let mut output = Vec::new();
        let choice = decide_choice(None, false, 3, &b"3\n"[..], &mut output).unwrap();
        assert_eq!(choice, Choice::Default);
        assert!(output.is_empty());
    }

    #[test]
    fn test_prompt_reads_operator_line() {
        let mut output = Vec::new();
        let choice = decide_choice(None, true, 3, &b" 3 \n"[..], &mut output).unwrap();
        assert_eq!(choice, Choice::Text("3".to_string()));
        assert!(String::from_utf8(output).unwrap().contains("[1-3]"));
    }
}
