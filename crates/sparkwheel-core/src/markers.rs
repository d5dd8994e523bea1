//! Marker scanning for string scalars
//!
//! A leading sigil turns a string scalar into an engine construct:
//! - `@id` — substitute the resolved value of another item
//! - `%[file::]id` — splice the raw node at another identifier
//! - `$src` — evaluate `src` as an expression, with embedded `@id`
//!   references rewritten to bindings
//!
//! This module only classifies and scans; no resolution happens here.

use std::ops::Range;

use crate::error::{Error, Result};
use crate::id::Ref;

/// Classification of a string scalar
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    /// The whole scalar is `@id`; substitution preserves native type
    WholeRef(Ref),
    /// The whole scalar is `%[file::]id`
    Macro(MacroRef),
    /// The scalar is `$src`
    Expression(String),
    /// Ordinary text, possibly with embedded `@id` references
    Plain,
}

/// The target of a `%` macro
#[derive(Debug, Clone, PartialEq)]
pub struct MacroRef {
    /// External YAML file to load, when present
    pub file: Option<String>,
    /// Identifier inside the file (or the current tree)
    pub target: Ref,
}

/// Classify a string scalar by its leading sigil.
pub fn classify(s: &str) -> Result<Marker> {
    if let Some(src) = s.strip_prefix('$') {
        return Ok(Marker::Expression(src.to_string()));
    }
    if let Some(rest) = s.strip_prefix('%') {
        return parse_macro(rest).map(Marker::Macro);
    }
    if let Some(rest) = s.strip_prefix('@') {
        if let Some((len, r)) = scan_ref_text(rest) {
            if len == rest.len() {
                return Ok(Marker::WholeRef(r));
            }
        }
    }
    Ok(Marker::Plain)
}

/// Parse the body of a `%` macro.
///
/// A `.yaml`/`.yml` prefix (up to the following separator) selects an
/// external file; the remainder indexes into it. Without a file part the
/// identifier points into the current tree and may be relative.
fn parse_macro(body: &str) -> Result<MacroRef> {
    if body.is_empty() {
        return Err(Error::parse("Empty macro target"));
    }
    for ext in [".yaml", ".yml"] {
        let marker = format!("{}::", ext);
        if let Some(pos) = body.find(&marker) {
            let file = &body[..pos + ext.len()];
            let id_text = &body[pos + marker.len()..];
            return Ok(MacroRef {
                file: Some(file.to_string()),
                target: Ref::parse(id_text)?,
            });
        }
        if body.ends_with(ext) {
            return Ok(MacroRef {
                file: Some(body.to_string()),
                target: Ref::parse("")?,
            });
        }
    }
    Ok(MacroRef {
        file: None,
        target: Ref::parse(body)?,
    })
}

/// Find every `@id` reference in `text`, with the byte range of the whole
/// marker (sigil included).
///
/// The reference captures the longest run of identifier characters after
/// `@`; anything past it (method calls, indexing, operators) is left to the
/// surrounding context.
pub fn scan_refs(text: &str) -> Vec<(Range<usize>, Ref)> {
    let mut found = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'@' {
            i += 1;
            continue;
        }
        match scan_ref_text(&text[i + 1..]) {
            Some((len, r)) => {
                found.push((i..i + 1 + len, r));
                i += 1 + len;
            }
            None => i += 1,
        }
    }
    found
}

/// Scan a reference at the start of `text`.
///
/// Returns the consumed byte length and the parsed reference, or None when
/// no valid reference starts here. Trailing separator characters that do
/// not introduce another segment are left unconsumed.
fn scan_ref_text(text: &str) -> Option<(usize, Ref)> {
    let bytes = text.as_bytes();
    let mut end = 0;
    while end < bytes.len() && is_ref_byte(bytes[end]) {
        end += 1;
    }
    // Separators cannot end a reference
    while end > 0 && matches!(bytes[end - 1], b':' | b'#') {
        // ...unless they are the leading relativity markers themselves
        if text[..end].bytes().all(|b| matches!(b, b':' | b'#')) {
            break;
        }
        end -= 1;
    }
    if end == 0 || text[..end].bytes().all(|b| matches!(b, b':' | b'#')) {
        return None;
    }
    let r = Ref::parse(&text[..end]).ok()?;
    Some((end, r))
}

fn is_ref_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'#')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id;
    use pretty_assertions::assert_eq;

    fn whole_ref(s: &str) -> Ref {
        match classify(s).unwrap() {
            Marker::WholeRef(r) => r,
            other => panic!("expected whole reference, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_plain() {
        assert_eq!(classify("hello").unwrap(), Marker::Plain);
        assert_eq!(classify("").unwrap(), Marker::Plain);
        assert_eq!(classify("a@b.com sender").unwrap(), Marker::Plain);
    }

    #[test]
    fn test_classify_whole_ref() {
        assert_eq!(whole_ref("@a::b"), Ref::parse("a::b").unwrap());
        assert_eq!(whole_ref("@::sib"), Ref::parse("::sib").unwrap());
        assert_eq!(whole_ref("@layers::0"), Ref::parse("layers::0").unwrap());
    }

    #[test]
    fn test_classify_legacy_separator_ref() {
        assert_eq!(whole_ref("@a#b"), Ref::parse("a::b").unwrap());
    }

    #[test]
    fn test_classify_ref_with_trailing_text_is_plain() {
        // An embedded reference does not make the scalar a whole reference
        assert_eq!(classify("@a plus more").unwrap(), Marker::Plain);
    }

    #[test]
    fn test_classify_expression() {
        assert_eq!(
            classify("$@x * 2 + 1").unwrap(),
            Marker::Expression("@x * 2 + 1".into())
        );
        assert_eq!(classify("$1 + 1").unwrap(), Marker::Expression("1 + 1".into()));
    }

    #[test]
    fn test_classify_local_macro() {
        assert_eq!(
            classify("%t").unwrap(),
            Marker::Macro(MacroRef {
                file: None,
                target: Ref::parse("t").unwrap(),
            })
        );
    }

    #[test]
    fn test_classify_relative_macro() {
        assert_eq!(
            classify("%::sib").unwrap(),
            Marker::Macro(MacroRef {
                file: None,
                target: Ref::parse("::sib").unwrap(),
            })
        );
    }

    #[test]
    fn test_classify_file_macro() {
        assert_eq!(
            classify("%defaults.yaml::model::lr").unwrap(),
            Marker::Macro(MacroRef {
                file: Some("defaults.yaml".into()),
                target: Ref::parse("model::lr").unwrap(),
            })
        );
    }

    #[test]
    fn test_classify_file_macro_whole_file() {
        assert_eq!(
            classify("%conf/defaults.yml").unwrap(),
            Marker::Macro(MacroRef {
                file: Some("conf/defaults.yml".into()),
                target: Ref::absolute(Id::root()),
            })
        );
    }

    #[test]
    fn test_classify_empty_macro_fails() {
        assert!(classify("%").is_err());
    }

    #[test]
    fn test_scan_refs_embedded() {
        let refs = scan_refs("http://@host::name/api");
        assert_eq!(refs.len(), 1);
        let (range, r) = &refs[0];
        assert_eq!(&"http://@host::name/api"[range.clone()], "@host::name");
        assert_eq!(*r, Ref::parse("host::name").unwrap());
    }

    #[test]
    fn test_scan_refs_multiple() {
        let refs = scan_refs("@a + @b::c * 2");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].1, Ref::parse("a").unwrap());
        assert_eq!(refs[1].1, Ref::parse("b::c").unwrap());
    }

    #[test]
    fn test_scan_refs_stops_at_method_call() {
        // `.` cannot belong to an identifier; the remainder stays as text
        let refs = scan_refs("@a::b.norm()");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0.clone(), 0..6);
        assert_eq!(refs[0].1, Ref::parse("a::b").unwrap());
    }

    #[test]
    fn test_scan_refs_trailing_separator_not_consumed() {
        let refs = scan_refs("see @a:: and more");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].1, Ref::parse("a").unwrap());
    }

    #[test]
    fn test_scan_refs_bare_sigil_ignored() {
        assert!(scan_refs("just @ alone").is_empty());
        assert!(scan_refs("@:: nothing").is_empty());
    }

    #[test]
    fn test_scan_refs_relative() {
        let refs = scan_refs("$@::sib + 1");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].1, Ref::parse("::sib").unwrap());
    }
}
