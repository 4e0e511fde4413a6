//! Character-bounded text helpers.
//!
//! Prompt budgets and display bounds are counted in `char`s, never bytes,
//! so a cut can't land inside a multi-byte UTF-8 sequence.

/// The first `max_chars` characters of `s`.
pub fn prefix(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Like [`prefix`], appending `...` when anything was cut.
pub fn ellipsize(s: &str, max_chars: usize) -> String {
    let head = prefix(s, max_chars);
    if head.len() < s.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}

/// Number of characters (not bytes) in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_shorter_than_bound_is_whole() {
        assert_eq!(prefix("tender", 100), "tender");
    }

    #[test]
    fn prefix_cuts_on_char_boundary() {
        // "£" is two bytes; a byte cut at 1 would panic.
        assert_eq!(prefix("£500k", 1), "£");
        assert_eq!(prefix("£500k", 3), "£50");
    }

    #[test]
    fn prefix_zero_is_empty() {
        assert_eq!(prefix("abc", 0), "");
    }

    #[test]
    fn ellipsize_marks_truncation_only() {
        assert_eq!(ellipsize("abcdef", 3), "abc...");
        assert_eq!(ellipsize("abc", 3), "abc");
    }

    #[test]
    fn char_len_counts_chars() {
        assert_eq!(char_len("£€"), 2);
    }
}
