pub const CSS: &str = "text/css";
pub const JAVASCRIPT: &str = "application/javascript";
pub const HTML: &str = "text/html";
pub const DEFAULT_MIME: &str = "text/plain";

/// Longest tail allowed after `.htm` (`.html` uses one of them).
const MAX_HTM_TAIL: usize = 3;

/// Infer a content type from the request path suffix.
///
/// Matching is case-insensitive and ordered: `.css`, then `.js`, then
/// `.htm` followed by up to three characters, then [`DEFAULT_MIME`].
pub fn content_type_for(path: &str) -> &'static str {
    let lower = path.to_lowercase();

    if lower.ends_with(".css") {
        CSS
    } else if lower.ends_with(".js") {
        JAVASCRIPT
    } else if has_htm_suffix(&lower) {
        HTML
    } else {
        DEFAULT_MIME
    }
}

fn has_htm_suffix(lower: &str) -> bool {
    let chars: Vec<char> = lower.chars().collect();

    (0..=MAX_HTM_TAIL).any(|tail| {
        let Some(start) = chars.len().checked_sub(4 + tail) else {
            return false;
        };
        let (stem, rest) = chars[start..].split_at(4);
        stem == ['.', 'h', 't', 'm'] && !rest.iter().copied().any(is_line_break)
    })
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_suffixes() {
        assert_eq!(content_type_for("/style.css"), "text/css");
        assert_eq!(content_type_for("/script.js"), "application/javascript");
        assert_eq!(content_type_for("/index.html"), "text/html");
        assert_eq!(content_type_for("/old/page.htm"), "text/html");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(content_type_for("/STYLE.CSS"), "text/css");
        assert_eq!(content_type_for("/App.Js"), "application/javascript");
        assert_eq!(content_type_for("/INDEX.HTML"), "text/html");
    }

    #[test]
    fn test_htm_tail_length() {
        assert_eq!(content_type_for("/a.htmx"), "text/html");
        assert_eq!(content_type_for("/a.htmlxy"), "text/html");
        assert_eq!(content_type_for("/a.htmlxyz"), "text/plain");
        assert_eq!(content_type_for("/a.htm\n"), "text/plain");
    }

    #[test]
    fn test_first_match_wins() {
        // `.htm.js` is within the html tail window but `.js` is checked first.
        assert_eq!(content_type_for("/page.htm.js"), "application/javascript");
        assert_eq!(content_type_for("/x.htm.css"), "text/css");
    }

    #[test]
    fn test_fallback_is_plain_text() {
        assert_eq!(content_type_for("/video.mp4"), "text/plain");
        assert_eq!(content_type_for("/noext"), "text/plain");
        assert_eq!(content_type_for("/"), "text/plain");
        assert_eq!(content_type_for("/data.json"), "text/plain");
        assert_eq!(content_type_for("/jsfile"), "text/plain");
    }
}
