use std::sync::OnceLock;

use regex::Regex;

use crate::error::MetadataError;
use crate::graph::node::{ParamKind, Parameter};

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

fn identifier_re() -> &'static Regex {
    IDENTIFIER.get_or_init(|| Regex::new(r"^[\p{XID_Start}_]\p{XID_Continue}*$").expect("invalid identifier regex"))
}

/// Whether `s` is a valid Python identifier (Unicode letters included).
pub fn is_identifier(s: &str) -> bool {
    identifier_re().is_match(s)
}

/// A signature split into its parameter list and return annotation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedSignature {
    pub params: Vec<Parameter>,
    pub returns: Option<String>,
}

/// Parse signature text in `inspect.signature` form: `(a, /, b: int = 3, *args, c, **kw) -> str`.
///
/// # Errors
/// [`MetadataError::InvalidSignature`] for unbalanced brackets, invalid parameter names,
/// misplaced `/` or `*` markers, or trailing text that is not a return annotation.
pub fn parse_signature(text: &str) -> Result<ParsedSignature, MetadataError> {
    let invalid = |reason: &str| MetadataError::InvalidSignature {
        text: text.to_owned(),
        reason: reason.to_owned(),
    };

    let trimmed = text.trim();
    if !trimmed.starts_with('(') {
        return Err(invalid("expected '('"));
    }
    let close = matching_paren(trimmed).ok_or_else(|| invalid("unbalanced parentheses"))?;
    let inner = &trimmed[1..close];
    let rest = trimmed[close + 1..].trim();

    let returns = if rest.is_empty() {
        None
    } else if let Some(ann) = rest.strip_prefix("->") {
        let ann = ann.trim();
        if ann.is_empty() {
            return Err(invalid("empty return annotation"));
        }
        Some(ann.to_owned())
    } else {
        return Err(invalid("unexpected text after parameter list"));
    };

    let mut pieces = split_top_level(inner, ',');
    if pieces.last().is_some_and(|p| p.trim().is_empty()) {
        pieces.pop();
    }

    let mut params: Vec<Parameter> = Vec::new();
    let mut keyword_only = false;
    let mut seen_slash = false;
    let mut seen_var_keyword = false;

    for piece in pieces {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(invalid("empty parameter"));
        }
        if seen_var_keyword {
            return Err(invalid("parameter after **kwargs"));
        }
        if piece == "/" {
            if seen_slash || keyword_only || params.is_empty() {
                return Err(invalid("misplaced '/'"));
            }
            seen_slash = true;
            for p in params.iter_mut() {
                p.kind = ParamKind::PositionalOnly;
            }
            continue;
        }
        if piece == "*" {
            if keyword_only {
                return Err(invalid("duplicate '*'"));
            }
            keyword_only = true;
            continue;
        }

        let (kind, body) = if let Some(body) = piece.strip_prefix("**") {
            seen_var_keyword = true;
            (ParamKind::VarKeyword, body)
        } else if let Some(body) = piece.strip_prefix('*') {
            if keyword_only {
                return Err(invalid("duplicate '*'"));
            }
            keyword_only = true;
            (ParamKind::VarPositional, body)
        } else if keyword_only {
            (ParamKind::KeywordOnly, piece)
        } else {
            (ParamKind::Positional, piece)
        };

        let (head, default) = match find_top_level(body, '=') {
            Some(i) => (&body[..i], Some(body[i + 1..].trim())),
            None => (body, None),
        };
        let (name, annotation) = match find_top_level(head, ':') {
            Some(i) => (head[..i].trim(), Some(head[i + 1..].trim())),
            None => (head.trim(), None),
        };
        if !is_identifier(name) {
            return Err(invalid(&format!("invalid parameter name '{name}'")));
        }
        if annotation.is_some_and(str::is_empty) {
            return Err(invalid(&format!("empty annotation for '{name}'")));
        }
        if default.is_some_and(str::is_empty) {
            return Err(invalid(&format!("empty default for '{name}'")));
        }
        if default.is_some() && matches!(kind, ParamKind::VarPositional | ParamKind::VarKeyword) {
            return Err(invalid(&format!("variadic '{name}' cannot have a default")));
        }

        params.push(Parameter {
            name: name.to_owned(),
            annotation: annotation.map(str::to_owned),
            has_default: default.is_some(),
            kind,
        });
    }

    Ok(ParsedSignature { params, returns })
}

/// Byte index of the `)` closing the `(` at index 0.
fn matching_paren(s: &str) -> Option<usize> {
    let mut scan = Scanner::default();
    for (i, c) in s.char_indices() {
        if scan.step(c) && c == ')' && scan.depth == 0 {
            return Some(i);
        }
    }
    None
}

/// Split on `sep` at bracket depth 0 outside string literals.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut scan = Scanner::default();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if scan.step(c) && c == sep && scan.depth == 0 {
            out.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    out.push(&s[start..]);
    out
}

/// First `sep` at bracket depth 0 outside string literals. For `=`, comparison
/// operators (`==`, `<=`, `>=`, `!=`) are skipped.
fn find_top_level(s: &str, sep: char) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut scan = Scanner::default();
    for (i, c) in s.char_indices() {
        if !scan.step(c) || c != sep || scan.depth != 0 {
            continue;
        }
        if sep == '=' {
            let prev = i.checked_sub(1).map(|p| bytes[p]);
            let next = bytes.get(i + 1).copied();
            if matches!(prev, Some(b'=' | b'<' | b'>' | b'!')) || next == Some(b'=') {
                continue;
            }
        }
        return Some(i);
    }
    None
}

/// Tracks bracket depth and string state while walking characters.
#[derive(Default)]
struct Scanner {
    depth: usize,
    quote: Option<char>,
    escaped: bool,
}

impl Scanner {
    /// Feed one character. Returns `true` when `c` is outside any string literal
    /// (after depth has been updated for closing brackets).
    fn step(&mut self, c: char) -> bool {
        if let Some(q) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == q {
                self.quote = None;
            }
            return false;
        }
        match c {
            '\'' | '"' => {
                self.quote = Some(c);
                return false;
            }
            '(' | '[' | '{' => self.depth += 1,
            ')' | ']' | '}' => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_signature() {
        let sig = parse_signature("(a, /, b: int = 3, *args, c: Dict[str, int] = {}, **kw) -> str").unwrap();
        let kinds: Vec<ParamKind> = sig.params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParamKind::PositionalOnly,
                ParamKind::Positional,
                ParamKind::VarPositional,
                ParamKind::KeywordOnly,
                ParamKind::VarKeyword,
            ]
        );
        assert_eq!(sig.params[1].annotation.as_deref(), Some("int"));
        assert!(sig.params[1].has_default);
        assert_eq!(sig.params[3].annotation.as_deref(), Some("Dict[str, int]"));
        assert_eq!(sig.returns.as_deref(), Some("str"));
    }

    #[test]
    fn test_bare_star_marks_keyword_only() {
        let sig = parse_signature("(self, *, flag=False)").unwrap();
        assert_eq!(sig.params.len(), 2);
        assert_eq!(sig.params[1].kind, ParamKind::KeywordOnly);
        assert!(sig.params[1].has_default);
        assert!(sig.returns.is_none());
    }

    #[test]
    fn test_defaults_with_nested_commas_and_strings() {
        let sig = parse_signature("(sep=', ', pair=(1, 2), check=lambda x: x == 1)").unwrap();
        let names: Vec<&str> = sig.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["sep", "pair", "check"]);
        assert!(sig.params.iter().all(|p| p.has_default && p.annotation.is_none()));
    }

    #[test]
    fn test_trailing_comma_and_empty() {
        assert_eq!(parse_signature("()").unwrap().params.len(), 0);
        assert_eq!(parse_signature("(a, b,)").unwrap().params.len(), 2);
    }

    #[test]
    fn test_invalid_signatures() {
        for bad in [
            "a, b",
            "(a, b",
            "(1a)",
            "(a,, b)",
            "(/, a)",
            "(a) str",
            "(**kw, a)",
            "(*args=1)",
            "(a) ->",
        ] {
            assert!(parse_signature(bad).is_err(), "expected error for {bad:?}");
        }
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("_private"));
        assert!(is_identifier("Widget2"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier(""));
        assert!(is_identifier("naïve"));
        assert!(is_identifier("Café"));
        assert!(is_identifier("変数"));
        assert!(!is_identifier("a-b"));
    }
}
