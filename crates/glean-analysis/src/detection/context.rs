//! Character-window helpers over UTF-8 text.
//!
//! Match positions are byte offsets, but windows and distances are counted
//! in characters so multi-byte text gets the same reach as ASCII.

/// The match span plus up to `window` characters on each side.
///
/// `start..end` must be a valid char-boundary range of `text`.
pub fn surrounding_context(text: &str, start: usize, end: usize, window: usize) -> &str {
    let ctx_start = text[..start]
        .char_indices()
        .rev()
        .take(window)
        .last()
        .map_or(start, |(i, _)| i);
    let ctx_end = text[end..]
        .char_indices()
        .nth(window)
        .map_or(text.len(), |(i, _)| end + i);
    &text[ctx_start..ctx_end]
}

/// Characters strictly between two spans, 0 when they touch or overlap.
///
/// Returns `None` when either span does not lie on char boundaries of `text`.
pub fn char_distance(text: &str, a: (usize, usize), b: (usize, usize)) -> Option<usize> {
    let (first, second) = if a.0 <= b.0 { (a, b) } else { (b, a) };
    text.get(first.0..first.1)?;
    text.get(second.0..second.1)?;
    if second.0 <= first.1 {
        return Some(0);
    }
    text.get(first.1..second.0).map(|gap| gap.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_clipped_at_text_edges() {
        let text = "fix CVE-2021-44228 now";
        assert_eq!(surrounding_context(text, 4, 18, 100), text);
        assert_eq!(surrounding_context(text, 4, 18, 2), "x CVE-2021-44228 n");
        assert_eq!(surrounding_context(text, 4, 18, 0), "CVE-2021-44228");
    }

    #[test]
    fn test_window_counts_characters_not_bytes() {
        let text = "ééé CVE-1 ààà";
        let start = text.find("CVE").unwrap();
        let end = start + "CVE-1".len();
        assert_eq!(surrounding_context(text, start, end, 2), "é CVE-1 à");
    }

    #[test]
    fn test_distance() {
        let text = "IAM policy mitigates CVE-2021-44228 vulnerability";
        assert_eq!(char_distance(text, (0, 10), (21, 35)), Some(11));
        assert_eq!(char_distance(text, (21, 35), (0, 10)), Some(11));
        assert_eq!(char_distance(text, (0, 35), (21, 35)), Some(0));
        assert_eq!(char_distance(text, (0, 10), (10, 20)), Some(0));
        assert_eq!(char_distance(text, (0, 10), (40, 400)), None);
    }
}
