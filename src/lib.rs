//! Home Info Center
//!
//! Dashboard core: version-gated polling of backend resources, the
//! sun-driven day/evening theme and German date labels.

pub mod agenda;
pub mod calls;
pub mod config;
pub mod dates;
pub mod query;
pub mod resource;
pub mod settings;
pub mod theme;
pub mod weather;

pub use config::{AppConfig, AppContext};
pub use resource::Resource;
pub use settings::ClientSettings;
