use crate::parser::error::ParseError;
use crate::tag::{Tag, TagKind};

/// Resolve `closing_tag` and `else_tag` links for every opening block tag.
///
/// Each opener scans forward with a nesting counter seeded at 1: same-kind
/// openers increment it, same-kind closers decrement it, other kinds are
/// ignored. A `TMPL_ELSE` seen at depth 1 belongs to an `IF`/`UNLESS` opener.
/// Problems are collected rather than returned one at a time.
pub fn match_tags(tags: &mut [Tag]) -> Result<(), Vec<ParseError>> {
    let mut errors = Vec::new();

    for open in 0..tags.len() {
        let opener = &tags[open];
        if opener.close || !opener.kind.is_block() {
            continue;
        }
        match find_close(tags, open) {
            Ok((closing, else_tag)) => {
                tags[open].closing_tag = Some(closing);
                tags[open].else_tag = else_tag;
            }
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Forward scan from `open` to its closer. Returns (closer, else) indices.
fn find_close(tags: &[Tag], open: usize) -> Result<(usize, Option<usize>), ParseError> {
    let opener = &tags[open];
    let mut depth = 1usize;
    let mut else_tag: Option<usize> = None;

    for (idx, next) in tags.iter().enumerate().skip(open + 1) {
        if next.kind == opener.kind {
            if next.close {
                depth -= 1;
            } else {
                depth += 1;
            }
        }
        if depth == 0 {
            return Ok((idx, else_tag));
        }
        if depth == 1 && next.kind == TagKind::Else && opener.kind.takes_else() {
            if let Some(first) = else_tag {
                return Err(ParseError::error(
                    format!("duplicate TMPL_ELSE in {} block", opener.kind),
                    next.span.clone(),
                )
                .with_related(tags[first].span.clone(), "first TMPL_ELSE is here")
                .with_related(opener.span.clone(), "block opened here"));
            }
            else_tag = Some(idx);
        }
    }

    Err(ParseError::error(
        format!("unable to find closing tag for {}", opener.kind),
        opener.span.clone(),
    )
    .with_note(format!("expected a matching </{}>", opener.kind)))
}
