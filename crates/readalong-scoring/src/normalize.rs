/// Punctuation stripped before comparison. Only this set; hyphens and other
/// marks stay part of the word.
const PUNCTUATION: [char; 10] = ['.', ',', '!', '?', ';', ':', '"', '\'', '(', ')'];

/// Canonicalize raw text: lower-case, strip punctuation, collapse whitespace
/// runs to single spaces, trim.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered.chars().filter(|c| !PUNCTUATION.contains(c)).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize and split into comparison tokens.
///
/// Splitting an empty normalized string on ' ' yields one empty-string token,
/// not zero tokens. Callers rely on that boundary: a whitespace-only
/// transcript compares as a single empty token at every reference position.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text).split(' ').map(str::to_owned).collect()
}
