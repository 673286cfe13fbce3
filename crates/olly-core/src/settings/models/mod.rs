pub mod settings;
pub mod settings_store;
pub mod theme;

pub use settings::Settings;
pub use settings_store::SettingsStore;
pub use theme::Theme;
