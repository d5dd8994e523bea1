//! Hierarchical identifiers
//!
//! Identifiers name nodes in the config tree. Segments are joined by `::`
//! in textual form; a segment is either a mapping key or a sequence index.
//! The legacy separator `#` is accepted on input and normalized to `::`.
//!
//! A reference may be relative: a leading `::` resolves against the
//! identifier of the item containing the reference, popping one trailing
//! segment per leading separator (`::sib` is a sibling, `::::cousin`
//! ascends one level further).

use std::fmt;

use crate::error::{Error, Result};

/// The canonical separator between identifier segments
pub const SEPARATOR: &str = "::";

/// Legacy separator accepted on input
const LEGACY_SEPARATOR: char = '#';

/// One segment of an identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// A key in a mapping
    Key(String),
    /// An index in a sequence
    Index(usize),
}

impl Segment {
    /// The segment as a mapping key (indices render as decimal strings)
    pub fn as_key(&self) -> String {
        match self {
            Segment::Key(k) => k.clone(),
            Segment::Index(i) => i.to_string(),
        }
    }

    /// The segment as a sequence index, if it is one or looks like one
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(k) => k.parse().ok(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => write!(f, "{}", k),
            Segment::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        match s.parse::<usize>() {
            Ok(i) => Segment::Index(i),
            Err(_) => Segment::Key(s.to_string()),
        }
    }
}

impl From<usize> for Segment {
    fn from(i: usize) -> Self {
        Segment::Index(i)
    }
}

/// A canonical (absolute) identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Id(Vec<Segment>);

impl Id {
    /// The root identifier (no segments)
    pub fn root() -> Self {
        Id(Vec::new())
    }

    /// Parse an absolute identifier. Empty text denotes the root.
    ///
    /// Integer-convertible segments are stored as indices. Whitespace
    /// embedded around separators is rejected.
    pub fn parse(text: &str) -> Result<Self> {
        let r = Ref::parse(text)?;
        if r.ups > 0 {
            return Err(Error::parse(format!(
                "Relative identifier '{}' not allowed here",
                text
            )));
        }
        Ok(r.id)
    }

    /// The segments of this identifier
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Whether this is the root identifier
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no segments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The identifier of the enclosing node, or the root for top-level ids
    pub fn parent(&self) -> Id {
        let mut segs = self.0.clone();
        segs.pop();
        Id(segs)
    }

    /// The last segment, if any
    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Extend this identifier with one more segment
    pub fn child(&self, segment: impl Into<Segment>) -> Id {
        let mut segs = self.0.clone();
        segs.push(segment.into());
        Id(segs)
    }

    /// Concatenate, honoring relativity.
    ///
    /// The first leading empty segment of `other` marks relativity; each
    /// additional one strips one trailing segment from `self`.
    pub fn join(&self, other: &Ref) -> Result<Id> {
        if other.ups == 0 {
            let mut segs = self.0.clone();
            segs.extend(other.id.0.iter().cloned());
            return Ok(Id(segs));
        }
        let strip = other.ups - 1;
        if strip > self.0.len() {
            return Err(Error::parse(format!(
                "Relative identifier '{}' ascends past the root of '{}'",
                other, self
            )));
        }
        let mut segs = self.0[..self.0.len() - strip].to_vec();
        segs.extend(other.id.0.iter().cloned());
        Ok(Id(segs))
    }

    /// Whether `self` is `other` or an ancestor of `other`
    pub fn is_prefix_of(&self, other: &Id) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// The first segment as a mapping key ("section" for grouped listings)
    pub fn section(&self) -> Option<String> {
        self.0.first().map(|s| s.as_key())
    }

    pub(crate) fn from_segments(segments: Vec<Segment>) -> Id {
        Id(segments)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

/// A possibly-relative reference to an identifier
///
/// `ups` counts the leading `::` separators: zero means absolute, one is a
/// sibling of the referencing item, each additional one ascends a level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ref {
    /// Number of leading separators
    pub ups: usize,
    /// The trailing (absolute-form) identifier
    pub id: Id,
}

impl Ref {
    /// Parse a reference, normalizing the legacy `#` separator first.
    pub fn parse(text: &str) -> Result<Self> {
        let normalized: String = text
            .chars()
            .map(|c| if c == LEGACY_SEPARATOR { ':' } else { c })
            .collect();
        // `#` maps to a single `:`; rebuild full separators from runs below.
        let normalized = normalize_separator_runs(&normalized);

        if normalized.is_empty() {
            return Ok(Ref {
                ups: 0,
                id: Id::root(),
            });
        }

        let parts: Vec<&str> = normalized.split(SEPARATOR).collect();
        let ups = parts.iter().take_while(|p| p.is_empty()).count();
        let mut segments = Vec::with_capacity(parts.len() - ups);
        for part in &parts[ups..] {
            if part.is_empty() {
                return Err(Error::parse(format!(
                    "Empty segment in identifier '{}'",
                    text
                )));
            }
            if part.trim() != *part || part.contains(char::is_whitespace) {
                return Err(Error::parse(format!(
                    "Whitespace in identifier segment '{}' of '{}'",
                    part, text
                )));
            }
            segments.push(Segment::from(*part));
        }
        Ok(Ref {
            ups,
            id: Id::from_segments(segments),
        })
    }

    /// An absolute reference to the given identifier
    pub fn absolute(id: Id) -> Self {
        Ref { ups: 0, id }
    }

    /// Whether this reference is relative
    pub fn is_relative(&self) -> bool {
        self.ups > 0
    }

    /// Resolve this reference against the identifier of the item that
    /// contains it. Absolute references resolve to themselves; relative
    /// ones pop one segment of `base` per leading separator.
    pub fn resolve_against(&self, base: &Id) -> Result<Id> {
        if self.ups == 0 {
            return Ok(self.id.clone());
        }
        base.parent().join(self)
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.ups {
            write!(f, "{}", SEPARATOR)?;
        }
        write!(f, "{}", self.id)
    }
}

/// Normalize mixed `:` runs produced by `#` rewriting into `::` separators.
///
/// After `#` is mapped to `:`, a run of one or more colons is a separator
/// boundary for each pair; an odd colon is completed to a full separator
/// (so `a#b` becomes `a::b`). Runs inside quoted text do not occur because
/// identifiers carry no quoting.
fn normalize_separator_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != ':' {
            out.push(c);
            continue;
        }
        let mut run = 1usize;
        while chars.peek() == Some(&':') {
            chars.next();
            run += 1;
        }
        // Each pair is one separator; a stray single colon counts as one too.
        let separators = run.div_ceil(2);
        for _ in 0..separators {
            out.push_str(SEPARATOR);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(text: &str) -> Id {
        Id::parse(text).unwrap()
    }

    #[test]
    fn test_parse_empty_is_root() {
        assert!(id("").is_root());
        assert_eq!(id("").to_string(), "");
    }

    #[test]
    fn test_parse_simple() {
        let i = id("model::lr");
        assert_eq!(
            i.segments(),
            &[Segment::Key("model".into()), Segment::Key("lr".into())]
        );
        assert_eq!(i.to_string(), "model::lr");
    }

    #[test]
    fn test_parse_numeric_segment_becomes_index() {
        let i = id("layers::0::weights");
        assert_eq!(i.segments()[1], Segment::Index(0));
    }

    #[test]
    fn test_parse_legacy_separator() {
        assert_eq!(id("model#lr"), id("model::lr"));
        assert_eq!(id("a#b#0"), id("a::b::0"));
    }

    #[test]
    fn test_parse_rejects_whitespace() {
        assert!(Id::parse("model :: lr").is_err());
        assert!(Id::parse("model::l r").is_err());
    }

    #[test]
    fn test_parse_rejects_relative_as_absolute() {
        assert!(Id::parse("::sibling").is_err());
    }

    #[test]
    fn test_ref_parse_relative() {
        let r = Ref::parse("::sibling").unwrap();
        assert_eq!(r.ups, 1);
        assert_eq!(r.id, id("sibling"));

        let r = Ref::parse("::::cousin").unwrap();
        assert_eq!(r.ups, 2);
        assert_eq!(r.id, id("cousin"));
    }

    #[test]
    fn test_ref_parse_legacy_relative() {
        // `#sib` rewrites to a relative reference too
        let r = Ref::parse("#sib").unwrap();
        assert_eq!(r.ups, 1);
        assert_eq!(r.id, id("sib"));
    }

    #[test]
    fn test_resolve_against_absolute_is_identity() {
        let r = Ref::parse("x::y").unwrap();
        assert_eq!(r.resolve_against(&id("a::b")).unwrap(), id("x::y"));
    }

    #[test]
    fn test_resolve_against_sibling() {
        let r = Ref::parse("::sibling").unwrap();
        assert_eq!(r.resolve_against(&id("a::b")).unwrap(), id("a::sibling"));
    }

    #[test]
    fn test_resolve_against_ascends() {
        let r = Ref::parse("::::cousin").unwrap();
        assert_eq!(r.resolve_against(&id("a::b")).unwrap(), id("cousin"));
        assert_eq!(
            r.resolve_against(&id("a::b::c")).unwrap(),
            id("a::cousin")
        );
    }

    #[test]
    fn test_resolve_against_past_root_fails() {
        let r = Ref::parse("::::::x").unwrap();
        assert!(r.resolve_against(&id("a")).is_err());
    }

    #[test]
    fn test_join_absolute() {
        let r = Ref::parse("c::d").unwrap();
        assert_eq!(id("a::b").join(&r).unwrap(), id("a::b::c::d"));
    }

    #[test]
    fn test_join_relative_strips_after_first() {
        // First empty segment marks relativity; the second strips one.
        let base = id("a::b");
        assert_eq!(base.join(&Ref::parse("::x").unwrap()).unwrap(), id("a::b::x"));
        assert_eq!(base.join(&Ref::parse("::::x").unwrap()).unwrap(), id("a::x"));
    }

    #[test]
    fn test_parent_and_child() {
        let i = id("a::b::c");
        assert_eq!(i.parent(), id("a::b"));
        assert_eq!(i.parent().child("c"), i);
        assert_eq!(id("a").parent(), Id::root());
    }

    #[test]
    fn test_child_index() {
        assert_eq!(id("xs").child(2usize), id("xs::2"));
    }

    #[test]
    fn test_is_prefix_of() {
        assert!(id("a").is_prefix_of(&id("a::b")));
        assert!(id("a::b").is_prefix_of(&id("a::b")));
        assert!(!id("a::b").is_prefix_of(&id("a")));
        assert!(!id("b").is_prefix_of(&id("a::b")));
        assert!(Id::root().is_prefix_of(&id("a")));
    }

    #[test]
    fn test_section() {
        assert_eq!(id("model::lr").section(), Some("model".to_string()));
        assert_eq!(Id::root().section(), None);
    }

    #[test]
    fn test_segment_tie_break_helpers() {
        assert_eq!(Segment::Index(3).as_key(), "3");
        assert_eq!(Segment::Key("3".into()).as_index(), Some(3));
        assert_eq!(Segment::Key("three".into()).as_index(), None);
    }

    #[test]
    fn test_display_roundtrip() {
        for text in ["", "a", "a::b", "a::0::b"] {
            assert_eq!(id(text).to_string(), text);
        }
    }
}
