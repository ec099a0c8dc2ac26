pub mod bindings;
pub mod buffer;
pub mod engine;
pub mod error;

pub use bindings::{Bindings, Loop};
pub use buffer::BufferChain;
pub use engine::{DEFAULT_MAX_DEPTH, Renderer, render, render_file};
pub use error::{FlattenError, RenderError};
