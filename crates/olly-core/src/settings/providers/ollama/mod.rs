pub mod discovery;

pub use discovery::{ModelResolution, discover_models, resolve_saved_model};
