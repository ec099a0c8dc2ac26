use std::ops::Range;

use memchr::memchr;

use crate::tag::{Tag, TagKind};

// ---------------------------------------------------------------------------
// Keyword tables
// ---------------------------------------------------------------------------

const TAG_PREFIX: &[u8] = b"TMPL_";
const NAME_ATTR: &[u8] = b"name=\"";

/// Keywords allowed in opening tags. `INCLUDE` precedes `INCL` so the longer
/// keyword wins; the boundary check rejects `INCL` followed by `UDE` anyway.
const OPEN_KEYWORDS: &[(&[u8], TagKind)] = &[
    (b"ELSE", TagKind::Else),
    (b"IF", TagKind::If),
    (b"INCLUDE", TagKind::Include),
    (b"INCL", TagKind::Incl),
    (b"LOOP", TagKind::Loop),
    (b"UNLESS", TagKind::Unless),
    (b"VAR", TagKind::Var),
];

const CLOSE_KEYWORDS: &[(&[u8], TagKind)] = &[
    (b"IF", TagKind::If),
    (b"LOOP", TagKind::Loop),
    (b"UNLESS", TagKind::Unless),
    (b"VAR", TagKind::Var),
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Collect every tag inside `range` of `source`, in source order.
pub fn scan(source: &[u8], range: Range<usize>) -> Vec<Tag> {
    Scanner::new(source, range).collect()
}

/// Left-to-right tag lexer over a byte range.
///
/// Anything that does not form a complete tag is literal text. Bytes that
/// were part of a matched tag are never looked at again.
pub struct Scanner<'a> {
    source: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a [u8], range: Range<usize>) -> Self {
        let end = range.end.min(source.len());
        Scanner {
            source,
            pos: range.start.min(end),
            end,
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = Tag;

    fn next(&mut self) -> Option<Tag> {
        while self.pos < self.end {
            let Some(offset) = memchr(b'<', &self.source[self.pos..self.end]) else {
                self.pos = self.end;
                return None;
            };
            let start = self.pos + offset;
            match lex_tag(&self.source[..self.end], start) {
                Some(tag) => {
                    self.pos = tag.span.end;
                    return Some(tag);
                }
                None => self.pos = start + 1,
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tag lexing
// ---------------------------------------------------------------------------

/// Cursor over the bytes of one candidate tag.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume `lit` compared ASCII case-insensitively.
    fn eat_ci(&mut self, lit: &[u8]) -> bool {
        let Some(candidate) = self.bytes.get(self.pos..self.pos + lit.len()) else {
            return false;
        };
        if candidate.eq_ignore_ascii_case(lit) {
            self.pos += lit.len();
            true
        } else {
            false
        }
    }

    fn eat_spaces(&mut self) -> usize {
        let before = self.pos;
        while self.eat(b' ') {}
        self.pos - before
    }

    /// Match one keyword from `table` as a whole word: it has to be followed
    /// by a space or the closing `>`.
    fn keyword(&mut self, table: &[(&[u8], TagKind)]) -> Option<TagKind> {
        for (word, kind) in table {
            let save = self.pos;
            if self.eat_ci(word) && matches!(self.peek(), Some(b' ' | b'>')) {
                return Some(*kind);
            }
            self.pos = save;
        }
        None
    }

    /// `name="VALUE"`; the value is one or more non-quote bytes, taken verbatim.
    fn name_attr(&mut self) -> Option<String> {
        if !self.eat_ci(NAME_ATTR) {
            return None;
        }
        let rest = self.bytes.get(self.pos..)?;
        let len = memchr(b'"', rest)?;
        if len == 0 {
            return None;
        }
        let value = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Some(value)
    }
}

/// Try to lex a tag starting at the `<` at `start`.
fn lex_tag(source: &[u8], start: usize) -> Option<Tag> {
    let mut cur = Cursor {
        bytes: source,
        pos: start,
    };
    if !cur.eat(b'<') {
        return None;
    }
    let close = cur.eat(b'/');
    if !cur.eat_ci(TAG_PREFIX) {
        return None;
    }

    let (kind, name) = if close {
        (cur.keyword(CLOSE_KEYWORDS)?, None)
    } else {
        let kind = cur.keyword(OPEN_KEYWORDS)?;
        if kind == TagKind::Else {
            (kind, None)
        } else {
            if cur.eat_spaces() == 0 {
                return None;
            }
            (kind, Some(cur.name_attr()?))
        }
    };

    cur.eat_spaces();
    if !cur.eat(b'>') {
        return None;
    }

    let span = start..cur.pos;
    Some(if close {
        Tag::close(kind, span)
    } else {
        Tag::open(kind, span, name)
    })
}
