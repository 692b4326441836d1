#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate {
    pub raw: String,
    pub variants: Vec<String>,
    pub base: String,
    pub important: bool,
}

/// Rejects tokens that cannot structurally be a utility class: foreign
/// characters, unbalanced brackets, quotes outside brackets, or no letter at
/// all (pure numbers and punctuation).
pub fn is_plausible(token: &str) -> bool {
    if token.is_empty() || token.starts_with('.') || token.starts_with('/') {
        return false;
    }

    let mut has_letter_or_bracket = false;
    let mut bracket_depth = 0usize;
    let mut paren_depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in token.chars() {
        if !is_allowed_char(ch) {
            return false;
        }
        if ch.is_ascii_alphabetic() || ch == '[' {
            has_letter_or_bracket = true;
        }

        if let Some(active_quote) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == active_quote {
                quote = None;
            }
            continue;
        }

        let nested = bracket_depth > 0 || paren_depth > 0;
        match ch {
            '[' => bracket_depth += 1,
            ']' => {
                if bracket_depth == 0 {
                    return false;
                }
                bracket_depth -= 1;
            }
            '(' => paren_depth += 1,
            ')' => {
                if paren_depth == 0 {
                    return false;
                }
                paren_depth -= 1;
            }
            '\'' | '"' if nested => quote = Some(ch),
            '\'' | '"' | '>' | '&' | ',' | '+' | '\\' | '%' | '#' if !nested => return false,
            _ => {}
        }
    }

    if quote.is_some() || bracket_depth != 0 || paren_depth != 0 {
        return false;
    }

    has_letter_or_bracket
}

pub fn parse_candidate(raw: &str) -> Option<Candidate> {
    if !is_plausible(raw) {
        return None;
    }

    let mut segments = split_top_level(raw);
    let base = segments.pop()?;
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }

    let (important, base) = match base.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, base),
    };
    if base.is_empty() || !base.chars().any(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }

    Some(Candidate {
        raw: raw.to_string(),
        variants: segments.into_iter().map(str::to_string).collect(),
        base: base.to_string(),
        important,
    })
}

fn split_top_level(token: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in token.char_indices() {
        if let Some(active_quote) = quote {
            if ch == active_quote {
                quote = None;
            }
            continue;
        }
        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            '\'' | '"' if depth > 0 => quote = Some(ch),
            ':' if depth == 0 => {
                segments.push(&token[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    segments.push(&token[start..]);
    segments
}

fn is_allowed_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '-' | '_'
                | '/'
                | ':'
                | '.'
                | '%'
                | '#'
                | '['
                | ']'
                | '('
                | ')'
                | '!'
                | '&'
                | '>'
                | '+'
                | ','
                | '*'
                | '='
                | '@'
                | '\''
                | '"'
                | '\\'
        )
}
