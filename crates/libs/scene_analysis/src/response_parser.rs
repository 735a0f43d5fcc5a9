//! Best-effort extraction of a JSON document from free-form model output.
//!
//! Models wrap their JSON in code fences, lead with commentary or trail off
//! with a closing remark. Nothing here fails: the caller gets the most likely
//! JSON substring and decides itself whether it deserializes.

const FENCE_OPENER: &str = "```json";
const FENCE_MARKER: &str = "```";

/// The substring of a model response believed to hold JSON, tagged with how it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonCandidate<'a> {
    /// Body of a `` ```json `` fenced block.
    Fenced(&'a str),
    /// From the first `{` or `[` through its matching closer.
    Balanced(&'a str),
    /// From the first `{` or `[` to the end of the text, the closer never came.
    Unbalanced(&'a str),
    /// No opening bracket anywhere; the trimmed input.
    NotFound(&'a str),
}

impl<'a> JsonCandidate<'a> {
    #[must_use]
    pub const fn as_str(&self) -> &'a str {
        match *self {
            Self::Fenced(s) | Self::Balanced(s) | Self::Unbalanced(s) | Self::NotFound(s) => s,
        }
    }

    #[must_use]
    pub const fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}

/// Returns the part of `text` most likely to be JSON.
#[must_use]
pub fn extract_json(text: &str) -> &str {
    find_json(text).as_str()
}

#[must_use]
pub fn find_json(text: &str) -> JsonCandidate<'_> {
    if let Some(body) = fenced_block(text) {
        return JsonCandidate::Fenced(body);
    }

    let Some(start) = text.find(['{', '[']) else {
        return JsonCandidate::NotFound(text.trim());
    };
    let (open, close) = if text.as_bytes()[start] == b'[' {
        (b'[', b']')
    } else {
        (b'{', b'}')
    };

    // Brackets are ASCII, so every index we stop at is a char boundary.
    let mut depth = 0usize;
    for (offset, &byte) in text.as_bytes()[start..].iter().enumerate() {
        if byte == open {
            depth += 1;
        } else if byte == close {
            depth -= 1;
            if depth == 0 {
                return JsonCandidate::Balanced(&text[start..=start + offset]);
            }
        }
    }

    JsonCandidate::Unbalanced(text[start..].trim())
}

/// Body after the first line that is exactly `` ```json ``, up to the next fence marker.
fn fenced_block(text: &str) -> Option<&str> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        offset += line.len();
        if line.trim() == FENCE_OPENER {
            let body = &text[offset..];
            let body = body.find(FENCE_MARKER).map_or(body, |end| &body[..end]);
            return Some(body.trim());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_fenced_block_is_returned_trimmed() {
        let text = "Here is the result:\n```json\n  [{\"label\": \"car\"}]  \n```\nThanks!";
        let candidate = find_json(text);
        assert_eq!(candidate, JsonCandidate::Fenced("[{\"label\": \"car\"}]"));
    }

    #[test]
    fn test_fence_takes_priority_over_earlier_brackets() {
        let text = "Objects {see below}:\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(text), "{\"a\": 1}");
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let text = "```json\n[1, 2, 3]\n";
        assert_eq!(find_json(text), JsonCandidate::Fenced("[1, 2, 3]"));
    }

    #[test]
    fn test_fence_opener_must_be_alone_on_its_line() {
        // Inline opener is not a fence; falls back to bracket matching.
        let text = "see ```json [1] ``` for details";
        assert_eq!(find_json(text), JsonCandidate::Balanced("[1]"));
    }

    #[test]
    fn test_indented_fence_is_recognized() {
        let text = "Result:\r\n   ```json\r\n{\"ok\": true}\r\n   ```\r\n";
        assert_eq!(find_json(text), JsonCandidate::Fenced("{\"ok\": true}"));
    }

    #[test]
    fn test_plain_fence_is_not_a_json_fence() {
        let text = "```\n[{\"label\": \"tree\"}]\n```";
        assert_eq!(
            find_json(text),
            JsonCandidate::Balanced("[{\"label\": \"tree\"}]")
        );
    }

    #[rstest]
    #[case("", "")]
    #[case("Sure! ", " Hope this helps.")]
    #[case("Result }} ]] ", "}}}")]
    #[case("line one\nline two\n", "\n[trailing]")]
    fn test_balanced_object_ignores_prefix_and_suffix(
        #[case] prefix: &str,
        #[case] suffix: &str,
    ) {
        let object = r#"{"outer": {"inner": {"deep": [1, {"x": 2}]}}, "label": "a"}"#;
        let text = format!("{prefix}{object}{suffix}");
        assert_eq!(find_json(&text), JsonCandidate::Balanced(object));
    }

    #[test]
    fn test_array_start_only_counts_square_brackets() {
        let text = r#"noise [{"box_2d": [1, 2, 3, 4], "label": "} not a closer"}] tail ]"#;
        assert_eq!(
            extract_json(text),
            r#"[{"box_2d": [1, 2, 3, 4], "label": "} not a closer"}]"#
        );
    }

    #[test]
    fn test_object_start_ignores_unmatched_square_brackets() {
        let text = r#"{"a": "]]]"} and more"#;
        assert_eq!(extract_json(text), r#"{"a": "]]]"}"#);
    }

    #[test]
    fn test_first_opening_bracket_wins() {
        assert_eq!(extract_json("x [1] then {\"a\": 2}"), "[1]");
        assert_eq!(extract_json("x {\"a\": [2]} then [1]"), "{\"a\": [2]}");
    }

    #[rstest]
    #[case("  no json here  ", "no json here")]
    #[case("\n\tjust words, (parens) and <angles>\n", "just words, (parens) and <angles>")]
    #[case("", "")]
    fn test_no_json_returns_trimmed_input(#[case] text: &str, #[case] expected: &str) {
        let candidate = find_json(text);
        assert_eq!(candidate, JsonCandidate::NotFound(expected));
        assert!(!candidate.is_found());
    }

    #[test]
    fn test_unbalanced_returns_rest_of_text() {
        let text = "The list: [{\"label\": \"car\"}, {\"label\": \"tr  \n";
        let candidate = find_json(text);
        assert_eq!(
            candidate,
            JsonCandidate::Unbalanced("[{\"label\": \"car\"}, {\"label\": \"tr")
        );
        assert!(candidate.is_found());
    }

    #[test]
    fn test_multibyte_text_around_json() {
        let text = "Résultat → {\"label\": \"café ☕\"} ✓";
        assert_eq!(extract_json(text), "{\"label\": \"café ☕\"}");
    }

    #[test]
    fn test_canonical_model_response() {
        let text = "Here is the result:\n```json\n[{\"box_2d\":[100,200,400,600],\"label\":\"car\"}]\n```\nThanks!";
        assert_eq!(
            extract_json(text),
            "[{\"box_2d\":[100,200,400,600],\"label\":\"car\"}]"
        );
    }
}
