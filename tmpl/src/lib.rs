pub mod parser;
pub mod tag;

use std::ops::Range;

use crate::tag::Tag;

/// A scanned and matched template region.
#[derive(Debug, Clone)]
pub struct Template {
    /// Byte range of the source this template covers.
    pub range: Range<usize>,
    /// Tags in source order, with block links resolved.
    pub tags: Vec<Tag>,
}

impl Template {
    pub fn is_literal(&self) -> bool {
        self.tags.is_empty()
    }
}
