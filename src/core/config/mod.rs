pub mod data;
pub mod defaults;
pub mod io;
pub mod orchestrator;
pub mod printing;

pub use data::{path_display, Config, Transport, CONFIG_KEYS};
pub use defaults::{Settings, SettingsOverrides};
pub use io::ConfigError;
pub use orchestrator::ConfigStore;

#[cfg(test)]
pub mod tests;
