//! CHAD: interactive case selection over paired precipitation datasets.
//!
//! The binary loads a session file, reads both variables from a JSON
//! dataset, bins them with [`clickhist`] and drives an [`ExploreSession`]
//! from console commands. Confirmed cases are written as template bundles
//! plus a JSON manifest, and appended to a markdown case notebook.
//!
//! [`ExploreSession`]: clickhist::ExploreSession

pub mod bundle;
pub mod config_loader;
pub mod console;
pub mod dataset;
pub mod explore;
pub mod notebook;

pub use bundle::BundleWriter;
pub use config_loader::{load_session_config, SessionSettings};
pub use console::{Command, ConsoleRenderer};
pub use dataset::JsonDatasetSource;
pub use explore::{first_case_number, run_commands, LoopStats};
pub use notebook::CaseNotebook;
