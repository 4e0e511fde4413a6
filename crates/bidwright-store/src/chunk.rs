//! Fixed-size overlapping windows over reference text.
//!
//! Similarity queries run against paragraph-sized chunks rather than whole
//! documents. Windows are counted in characters.

pub const DEFAULT_WINDOW: usize = 1000;
pub const DEFAULT_STRIDE: usize = 900;

/// Window/stride pair. `stride < window` gives `window - stride` characters of overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    pub window: usize,
    pub stride: usize,
}

impl Default for ChunkSpec {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            stride: DEFAULT_STRIDE,
        }
    }
}

impl ChunkSpec {
    /// A spec whose stride is clamped into `1..=window` so every character is covered.
    pub fn new(window: usize, stride: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            stride: stride.clamp(1, window),
        }
    }
}

/// Split `text` into overlapping windows.
///
/// Windows start every `stride` characters; the last window ends exactly at
/// the end of the text, and no window is emitted that the previous one
/// already covers completely. Empty text yields no chunks.
pub fn chunk_text(text: &str, spec: ChunkSpec) -> Vec<&str> {
    let spec = ChunkSpec::new(spec.window, spec.stride);

    // Byte offset of every char start, plus the end.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let n_chars = bounds.len();
    bounds.push(text.len());

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < n_chars {
        let end = (start + spec.window).min(n_chars);
        chunks.push(&text[bounds[start]..bounds[end]]);
        if end == n_chars {
            break;
        }
        start += spec.stride;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text("", ChunkSpec::default()).is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("alpha beta gamma", ChunkSpec::default());
        assert_eq!(chunks, vec!["alpha beta gamma"]);
    }

    #[test]
    fn exact_window_is_one_chunk() {
        let text = "x".repeat(1000);
        assert_eq!(chunk_text(&text, ChunkSpec::default()).len(), 1);
    }

    #[test]
    fn length_2050_gives_three_overlapping_chunks() {
        let text: String = (0..2050).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunk_text(&text, ChunkSpec::default());
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], &text[0..1000]);
        assert_eq!(chunks[1], &text[900..1900]);
        assert_eq!(chunks[2], &text[1800..2050]);

        // Consecutive windows share exactly 100 chars.
        assert_eq!(&chunks[0][900..], &chunks[1][..100]);
        assert_eq!(&chunks[1][900..], &chunks[2][..100]);
    }

    #[test]
    fn chunks_cover_text_without_gaps() {
        let text: String = (0..5321).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let spec = ChunkSpec::default();
        let chunks = chunk_text(&text, spec);

        // Rebuild from the first window plus each window's non-overlapping tail.
        let skip = spec.window - spec.stride;
        let mut rebuilt = chunks[0].to_string();
        for c in &chunks[1..] {
            assert!(c.len() > skip, "trailing window fully covered by its predecessor");
            rebuilt.push_str(&c[skip..]);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "£".repeat(1500);
        let chunks = chunk_text(&text, ChunkSpec::default());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 1000);
        assert_eq!(chunks[1].chars().count(), 600);
    }

    #[test]
    fn degenerate_stride_is_clamped() {
        let spec = ChunkSpec::new(10, 0);
        assert_eq!(spec.stride, 1);
        let spec = ChunkSpec::new(10, 50);
        assert_eq!(spec.stride, 10);
        let chunks = chunk_text("abcdefghijklmnopqrst", spec);
        assert_eq!(chunks, vec!["abcdefghij", "klmnopqrst"]);
    }
}
