use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tmpl::Template;
use tmpl::parser::{ParseError, Parser};
use tmpl::tag::{Tag, TagKind};

use crate::bindings::Bindings;
use crate::buffer::BufferChain;
use crate::error::RenderError;

/// Default bound on block and include nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Render a template with the default configuration.
pub fn render(source: &[u8], bindings: &Bindings) -> Result<BufferChain, RenderError> {
    Renderer::new().render(source, bindings)
}

/// Load a file and render it with the default configuration.
pub fn render_file(path: impl AsRef<Path>, bindings: &Bindings) -> Result<BufferChain, RenderError> {
    Renderer::new().render_file(path, bindings)
}

/// Renderer configuration. Holds no state between calls.
#[derive(Debug, Clone)]
pub struct Renderer {
    /// Directory relative `TMPL_INCLUDE` paths are resolved against.
    base_dir: PathBuf,
    max_depth: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer {
            base_dir: PathBuf::from("."),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Renderer {
    pub fn new() -> Self {
        Renderer::default()
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Render `source` against `bindings`.
    pub fn render(&self, source: &[u8], bindings: &Bindings) -> Result<BufferChain, RenderError> {
        let pass = Pass {
            renderer: self,
            source,
            path: None,
        };
        pass.render_range(0..source.len(), bindings, 0)
    }

    /// Load `path` (as given, not resolved against the base directory) and
    /// render its contents.
    pub fn render_file(
        &self,
        path: impl AsRef<Path>,
        bindings: &Bindings,
    ) -> Result<BufferChain, RenderError> {
        let path = path.as_ref();
        let source = fs::read(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let pass = Pass {
            renderer: self,
            source: &source,
            path: Some(path),
        };
        pass.render_range(0..source.len(), bindings, 0)
    }

    fn resolve_include(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

// ---------------------------------------------------------------------------
// Render pass over one source buffer
// ---------------------------------------------------------------------------

/// Everything needed to render ranges of a single source buffer.
struct Pass<'a> {
    renderer: &'a Renderer,
    source: &'a [u8],
    path: Option<&'a Path>,
}

impl Pass<'_> {
    fn path_buf(&self) -> Option<PathBuf> {
        self.path.map(Path::to_path_buf)
    }

    /// Scan and match `range`, independent of any enclosing pass.
    fn parse(&self, range: Range<usize>) -> Result<Template, RenderError> {
        Parser::new(self.source)
            .parse_range(range)
            .map_err(|errors| RenderError::Parse {
                errors,
                path: self.path_buf(),
            })
    }

    fn render_range(
        &self,
        range: Range<usize>,
        bindings: &Bindings,
        depth: usize,
    ) -> Result<BufferChain, RenderError> {
        let template = self.parse(range)?;
        self.render_template(&template, bindings, depth)
    }

    /// Walk the tags once, copying literal spans and dispatching each tag.
    fn render_template(
        &self,
        template: &Template,
        bindings: &Bindings,
        depth: usize,
    ) -> Result<BufferChain, RenderError> {
        let mut out = BufferChain::new();
        let mut cursor = template.range.start;

        for tag in &template.tags {
            // Already consumed as part of an earlier block.
            if cursor > tag.start() {
                continue;
            }
            out.append(&self.source[cursor..tag.start()]);
            cursor = self.dispatch(template, tag, bindings, depth, &mut out)?;
        }

        if cursor < template.range.end {
            out.append(&self.source[cursor..template.range.end]);
        }
        Ok(out)
    }

    /// Handle one tag; returns where the cursor continues.
    fn dispatch(
        &self,
        template: &Template,
        tag: &Tag,
        bindings: &Bindings,
        depth: usize,
        out: &mut BufferChain,
    ) -> Result<usize, RenderError> {
        tracing::trace!(tag = %tag, at = tag.start(), "dispatch");

        if tag.close {
            return Err(RenderError::StrayClose {
                kind: tag.kind,
                span: tag.span.clone(),
                path: self.path_buf(),
            });
        }

        match tag.kind {
            TagKind::Var => {
                if let Some(value) = bindings.get(tag.name()) {
                    out.append(value);
                }
                Ok(tag.end())
            }
            TagKind::Incl | TagKind::Include => {
                self.include(tag, bindings, depth, out)?;
                Ok(tag.end())
            }
            TagKind::If | TagKind::Unless => self.conditional(template, tag, bindings, depth, out),
            TagKind::Loop => self.repeat(template, tag, bindings, depth, out),
            TagKind::Else => Err(RenderError::StrayElse {
                span: tag.span.clone(),
                path: self.path_buf(),
            }),
        }
    }

    fn conditional(
        &self,
        template: &Template,
        tag: &Tag,
        bindings: &Bindings,
        depth: usize,
        out: &mut BufferChain,
    ) -> Result<usize, RenderError> {
        let closing = self.closing_of(template, tag)?;
        let else_tag = tag.else_tag.map(|idx| &template.tags[idx]);

        let cond = bindings.condition(tag.name()) ^ (tag.kind == TagKind::Unless);
        let body = match (cond, else_tag) {
            (true, Some(else_tag)) => tag.end()..else_tag.start(),
            (true, None) => tag.end()..closing.start(),
            (false, Some(else_tag)) => else_tag.end()..closing.start(),
            (false, None) => return Ok(closing.end()),
        };

        self.check_depth(depth, tag)?;
        let mut block = self.render_range(body, bindings, depth + 1)?;
        out.append_chain(&mut block);
        Ok(closing.end())
    }

    fn repeat(
        &self,
        template: &Template,
        tag: &Tag,
        bindings: &Bindings,
        depth: usize,
        out: &mut BufferChain,
    ) -> Result<usize, RenderError> {
        let closing = self.closing_of(template, tag)?;
        let Some(items) = bindings.get_loop(tag.name()).filter(|l| !l.is_empty()) else {
            tracing::debug!(name = tag.name(), "loop is empty");
            return Ok(closing.end());
        };
        tracing::debug!(name = tag.name(), iterations = items.len(), "loop");

        self.check_depth(depth, tag)?;
        let body = self.parse(tag.end()..closing.start())?;
        for child in items {
            let mut block = self.render_template(&body, child, depth + 1)?;
            out.append_chain(&mut block);
        }
        Ok(closing.end())
    }

    fn include(
        &self,
        tag: &Tag,
        bindings: &Bindings,
        depth: usize,
        out: &mut BufferChain,
    ) -> Result<(), RenderError> {
        self.check_depth(depth, tag)?;
        let path = self.renderer.resolve_include(tag.name());
        let source = match fs::read(&path) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot load include");
                return Ok(());
            }
        };
        tracing::debug!(path = %path.display(), bytes = source.len(), "include");

        let pass = Pass {
            renderer: self.renderer,
            source: &source,
            path: Some(&path),
        };
        let mut block = pass.render_range(0..source.len(), bindings, depth + 1)?;
        out.append_chain(&mut block);
        Ok(())
    }

    fn closing_of<'t>(&self, template: &'t Template, tag: &Tag) -> Result<&'t Tag, RenderError> {
        match tag.closing_tag {
            Some(idx) => Ok(&template.tags[idx]),
            None => Err(RenderError::Parse {
                errors: vec![ParseError::error(
                    format!("unable to find closing tag for {}", tag.kind),
                    tag.span.clone(),
                )],
                path: self.path_buf(),
            }),
        }
    }

    fn check_depth(&self, depth: usize, tag: &Tag) -> Result<(), RenderError> {
        if depth >= self.renderer.max_depth {
            return Err(RenderError::TooDeep {
                limit: self.renderer.max_depth,
                span: tag.span.clone(),
                path: self.path_buf(),
            });
        }
        Ok(())
    }
}
