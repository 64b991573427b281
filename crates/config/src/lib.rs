//! `tunebook-config` — settings file and config-dir resolution.

pub mod settings;

pub use settings::Settings;
