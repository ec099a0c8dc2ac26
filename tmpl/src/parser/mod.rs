pub mod error;
pub mod matcher;
pub mod scanner;

use std::ops::Range;

pub use error::ParseError;

use crate::Template;

/// Parser entry point: scan, then match.
pub struct Parser<'a> {
    source: &'a [u8],
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Parser { source }
    }

    /// Parse the whole source.
    pub fn parse(&self) -> Result<Template, Vec<ParseError>> {
        self.parse_range(0..self.source.len())
    }

    /// Parse a sub-range. Tag spans stay absolute offsets into the source.
    pub fn parse_range(&self, range: Range<usize>) -> Result<Template, Vec<ParseError>> {
        let mut tags = scanner::scan(self.source, range.clone());
        matcher::match_tags(&mut tags)?;
        Ok(Template { range, tags })
    }
}
