pub mod markdown;
pub mod rtl;

pub use markdown::{MarkdownSpan, RenderMode, RenderedMessage, render};
pub use rtl::TextDirection;
