//! Text normalization for German keyword matching.
//!
//! Normalization lowercases, folds umlauts (ä→ae, ö→oe, ü→ue, ß→ss) and
//! collapses whitespace runs to a single space. An offset map tracks, for
//! every byte of the normalized string, the byte position it came from in
//! the original text so evidence snippets can be cut from the raw input.

/// Normalized text plus the byte offset map back into the original.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub text: String,
    /// `offsets[i]` is the original byte offset of the character that
    /// produced normalized byte `i`.
    offsets: Vec<usize>,
    original_len: usize,
}

impl Normalized {
    /// Map a normalized byte position back to an original byte position.
    pub fn to_original(&self, norm_pos: usize) -> usize {
        self.offsets
            .get(norm_pos)
            .copied()
            .unwrap_or(self.original_len)
    }

    /// Slice the original text around a normalized byte range, expanding
    /// `margin` bytes in both directions and snapping to char boundaries.
    pub fn original_window<'a>(
        &self,
        original: &'a str,
        norm_start: usize,
        norm_end: usize,
        margin: usize,
    ) -> &'a str {
        let mut start = self.to_original(norm_start).saturating_sub(margin);
        let mut end = (self.to_original(norm_end) + margin).min(original.len());
        while start > 0 && !original.is_char_boundary(start) {
            start -= 1;
        }
        while end < original.len() && !original.is_char_boundary(end) {
            end += 1;
        }
        &original[start..end]
    }
}

/// Normalize text for matching. Idempotent on its own output.
pub fn normalize(text: &str) -> Normalized {
    let mut out = String::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len());
    let mut pending_space = false;
    let mut started = false;

    let mut push = |s: &str, orig: usize, out: &mut String, offsets: &mut Vec<usize>| {
        for _ in 0..s.len() {
            offsets.push(orig);
        }
        out.push_str(s);
    };

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            pending_space = started;
            continue;
        }
        if pending_space {
            push(" ", idx, &mut out, &mut offsets);
            pending_space = false;
        }
        started = true;
        for lower in ch.to_lowercase() {
            match lower {
                'ä' => push("ae", idx, &mut out, &mut offsets),
                'ö' => push("oe", idx, &mut out, &mut offsets),
                'ü' => push("ue", idx, &mut out, &mut offsets),
                'ß' => push("ss", idx, &mut out, &mut offsets),
                c => {
                    let mut buf = [0u8; 4];
                    push(c.encode_utf8(&mut buf), idx, &mut out, &mut offsets);
                }
            }
        }
    }

    Normalized {
        text: out,
        offsets,
        original_len: text.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_umlauts_and_case() {
        assert_eq!(normalize("Öffentliche Auslegung").text, "oeffentliche auslegung");
        assert_eq!(normalize("Straße").text, "strasse");
        assert_eq!(normalize("GROSSSPEICHER").text, "grossspeicher");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("a  b\n\tc ").text, "a b c");
        assert_eq!(normalize("  leading").text, "leading");
    }

    #[test]
    fn idempotent_on_normalized_output() {
        let once = normalize("Bebauungsplan  „Große Wiese\u{a0}Süd\u{201c}");
        let twice = normalize(&once.text);
        assert_eq!(once.text, twice.text);
    }

    #[test]
    fn offset_map_points_into_original() {
        let original = "Ä  Batteriespeicher";
        let norm = normalize(original);
        assert_eq!(norm.text, "ae batteriespeicher");
        // "batteriespeicher" starts at normalized byte 3.
        let pos = norm.text.find("batteriespeicher").unwrap();
        let orig_pos = norm.to_original(pos);
        assert_eq!(&original[orig_pos..orig_pos + 1], "B");
    }

    #[test]
    fn window_slices_original_text() {
        let original = "Vorlage: Öffentliche Auslegung des Bebauungsplans Nr. 7";
        let norm = normalize(original);
        let start = norm.text.find("auslegung").unwrap();
        let window = norm.original_window(original, start, start + "auslegung".len(), 10);
        assert!(window.contains("Auslegung"));
    }
}
