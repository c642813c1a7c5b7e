/// Keep at most `max` characters. Multi-byte safe.
pub fn clip_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Lowercase and collapse runs of whitespace into single spaces.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `%needle%` for a LIKE ... ESCAPE '\' clause, with wildcards in the needle escaped.
pub fn like_contains(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Uppercase the first character, leave the rest alone.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_short_untouched() {
        assert_eq!(clip_chars("hello", 10), "hello");
    }

    #[test]
    fn clip_multibyte() {
        assert_eq!(clip_chars("héllo wörld", 4), "héll");
        assert_eq!(clip_chars("😀😀😀", 2), "😀😀");
    }

    #[test]
    fn normalize_collapses() {
        assert_eq!(normalize_text("  Hello \t  THERE\n"), "hello there");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn like_escapes_wildcards() {
        assert_eq!(like_contains("ok"), "%ok%");
        assert_eq!(like_contains("50%_x"), "%50\\%\\_x%");
    }

    #[test]
    fn capitalize_first_only() {
        assert_eq!(capitalize("like"), "Like");
        assert_eq!(capitalize(""), "");
    }
}
