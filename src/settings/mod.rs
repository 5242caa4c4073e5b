//! User-facing settings edited through the `set` command.
//!
//! Settings live in a YAML document of sections, each holding settings with an
//! optional list of allowed values:
//!
//! ```yaml
//! sectionA:
//!   description: Things about A
//!   opt1:
//!     description: How fast
//!     options: [fast, slow]
//!     value: fast
//! ```
//!
//! The shell's own configuration (prompt, history, logging) is separate and
//! lives in [`crate::config`].

pub mod model;
pub mod store;

pub use model::{Section, Setting, SettingsDocument};
pub use store::{MemorySettingsStore, SettingsStore, YamlSettingsStore};
