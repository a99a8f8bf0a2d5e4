use std::collections::HashSet;

/// Sentence terminators recognised in Japanese prose
pub const TERMINATORS: [char; 5] = ['。', '！', '？', '!', '?'];

/// Jaccard similarity over the character sets of two strings.
///
/// Whitespace and punctuation are ignored. Two strings with no comparable
/// characters score 0.0.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = char_set(a);
    let b = char_set(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    intersection as f64 / union as f64
}

fn char_set(s: &str) -> HashSet<char> {
    s.chars()
        .filter(|c| !c.is_whitespace() && !is_punctuation(*c))
        .collect()
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || TERMINATORS.contains(&c)
        || matches!(c, '、' | '，' | '「' | '」' | '『' | '』' | '（' | '）' | '・' | '…' | '：')
}

/// Remove trailing sentence terminators and whitespace
#[must_use]
pub fn strip_terminal(s: &str) -> &str {
    s.trim_end().trim_end_matches(|c: char| TERMINATORS.contains(&c) || c.is_whitespace())
}

/// Turn a multi-sentence summary into one clause: trailing terminators go,
/// inner `。` become `、`
#[must_use]
pub fn as_clause(s: &str) -> String {
    strip_terminal(s.trim()).replace('。', "、")
}
