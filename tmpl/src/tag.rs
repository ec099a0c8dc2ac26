use std::fmt;
use std::ops::Range;

/// The kinds of `<TMPL_...>` tags recognized by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Else,
    If,
    Incl,
    Include,
    Loop,
    Unless,
    Var,
}

impl TagKind {
    /// Canonical keyword as written in templates.
    pub fn keyword(self) -> &'static str {
        match self {
            TagKind::Else => "TMPL_ELSE",
            TagKind::If => "TMPL_IF",
            TagKind::Incl => "TMPL_INCL",
            TagKind::Include => "TMPL_INCLUDE",
            TagKind::Loop => "TMPL_LOOP",
            TagKind::Unless => "TMPL_UNLESS",
            TagKind::Var => "TMPL_VAR",
        }
    }

    /// Block kinds need a matching closing tag.
    pub fn is_block(self) -> bool {
        matches!(self, TagKind::If | TagKind::Unless | TagKind::Loop)
    }

    /// Kinds that may own a `TMPL_ELSE` branch.
    pub fn takes_else(self) -> bool {
        matches!(self, TagKind::If | TagKind::Unless)
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A single tag found in the source.
///
/// Tags are kept in a flat vector in source order. Nesting is expressed
/// only through `closing_tag` and `else_tag`, which index into that vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub kind: TagKind,
    /// Byte span of the whole tag, delimiters included.
    pub span: Range<usize>,
    /// Value of the `name` attribute, verbatim.
    pub name: Option<String>,
    /// True for `</TMPL_...>` tags.
    pub close: bool,
    /// Index of the matching closing tag (opening block tags only).
    pub closing_tag: Option<usize>,
    /// Index of the same-depth `TMPL_ELSE` (`IF`/`UNLESS` only).
    pub else_tag: Option<usize>,
}

impl Tag {
    pub fn open(kind: TagKind, span: Range<usize>, name: Option<String>) -> Self {
        Tag {
            kind,
            span,
            name,
            close: false,
            closing_tag: None,
            else_tag: None,
        }
    }

    pub fn close(kind: TagKind, span: Range<usize>) -> Self {
        Tag {
            kind,
            span,
            name: None,
            close: true,
            closing_tag: None,
            else_tag: None,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn start(&self) -> usize {
        self.span.start
    }

    pub fn end(&self) -> usize {
        self.span.end
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.close {
            write!(f, "</{}>", self.kind)
        } else if let Some(name) = &self.name {
            write!(f, "<{} name=\"{}\">", self.kind, name)
        } else {
            write!(f, "<{}>", self.kind)
        }
    }
}
