use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tmpl::parser::ParseError;
use tmpl::tag::TagKind;

/// Errors that stop a render. Each carries the file it happened in (if the
/// source came from a file) and the offending byte span.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{}", parse_summary(errors))]
    Parse {
        errors: Vec<ParseError>,
        path: Option<PathBuf>,
    },

    #[error("got TMPL_ELSE without TMPL_IF or TMPL_UNLESS")]
    StrayElse {
        span: Range<usize>,
        path: Option<PathBuf>,
    },

    #[error("closing tag </{kind}> has no matching opening tag")]
    StrayClose {
        kind: TagKind,
        span: Range<usize>,
        path: Option<PathBuf>,
    },

    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("template nesting deeper than {limit} levels")]
    TooDeep {
        limit: usize,
        span: Range<usize>,
        path: Option<PathBuf>,
    },
}

impl RenderError {
    /// File the error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            RenderError::Parse { path, .. }
            | RenderError::StrayElse { path, .. }
            | RenderError::StrayClose { path, .. }
            | RenderError::TooDeep { path, .. } => path.as_deref(),
            RenderError::Io { path, .. } => Some(path),
        }
    }

    /// Primary byte span of the error, if it has one.
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            RenderError::Parse { errors, .. } => errors.first().map(|e| e.span.clone()),
            RenderError::StrayElse { span, .. }
            | RenderError::StrayClose { span, .. }
            | RenderError::TooDeep { span, .. } => Some(span.clone()),
            RenderError::Io { .. } => None,
        }
    }
}

fn parse_summary(errors: &[ParseError]) -> String {
    match errors {
        [] => "template parse failed".to_string(),
        [only] => only.message.clone(),
        [first, rest @ ..] => format!("{} (and {} more)", first.message, rest.len()),
    }
}

/// Errors from flattening a `BufferChain` into a `String`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlattenError {
    #[error("output contains a NUL byte at offset {offset}")]
    EmbeddedNul { offset: usize },

    #[error("output is not valid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },
}
