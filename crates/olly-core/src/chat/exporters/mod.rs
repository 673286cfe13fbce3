pub mod markdown_exporter;

pub use markdown_exporter::{conversation_to_markdown, export_file_name, write_markdown};
