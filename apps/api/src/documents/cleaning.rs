/// Lowercases, replaces every character outside `[a-z0-9\s]` with a space and
/// collapses whitespace. Keeps the vocabulary intact for term weighting.
pub fn clean_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let replaced: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
