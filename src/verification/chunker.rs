//! Word-window chunking of long texts

use crate::common::constants::WORDS_PER_TOKEN;
use crate::common::error::{FlowError, FlowResult};

/// Split `text` into overlapping chunks.
///
/// `window` and `overlap` are in tokens and are converted to words at
/// [`WORDS_PER_TOKEN`]. Consecutive chunks start `window - overlap` tokens
/// apart (at least one word). Text with no words yields a single empty chunk.
pub fn chunk_text(text: &str, window: usize, overlap: usize) -> FlowResult<Vec<String>> {
    if overlap >= window {
        return Err(FlowError::InvalidArgument(format!(
            "Overlap ({}) must be smaller than window size ({})",
            overlap, window
        )));
    }
    let step = window - overlap;

    let words: Vec<&str> = text.split_whitespace().collect();
    let word_window = (window as f64 * WORDS_PER_TOKEN) as usize;
    let word_step = ((step as f64 * WORDS_PER_TOKEN) as usize).max(1);

    let chunks: Vec<String> = (0..words.len())
        .step_by(word_step)
        .map(|start| {
            let end = (start + word_window).min(words.len());
            words[start..end].join(" ")
        })
        .collect();

    if chunks.is_empty() {
        return Ok(vec![String::new()]);
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_windows_overlap() {
        // 8 tokens -> 6 words per chunk, 4 tokens step -> 3 words
        let chunks = chunk_text(&numbered(10), 8, 4).unwrap();
        assert_eq!(
            chunks,
            vec![
                "w0 w1 w2 w3 w4 w5",
                "w3 w4 w5 w6 w7 w8",
                "w6 w7 w8 w9",
                "w9",
            ]
        );
    }

    #[test]
    fn test_defaults_keep_short_text_whole() {
        let text = "The lighthouse keeper never left the island.";
        assert_eq!(chunk_text(text, 500, 50).unwrap(), vec![text.to_string()]);
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let chunks = chunk_text("a\n\nb\tc", 500, 50).unwrap();
        assert_eq!(chunks, vec!["a b c"]);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(chunk_text("", 500, 50).unwrap(), vec![String::new()]);
        assert_eq!(chunk_text("   ", 500, 50).unwrap(), vec![String::new()]);
    }

    #[test]
    fn test_minimum_step() {
        // step of 1 token rounds down to 0 words and is raised to 1
        let chunks = chunk_text("a b c", 2, 1).unwrap();
        assert_eq!(chunks, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_overlap_must_be_smaller() {
        assert!(matches!(
            chunk_text("a b", 10, 10),
            Err(FlowError::InvalidArgument(_))
        ));
        assert!(chunk_text("a b", 10, 20).is_err());
    }
}
