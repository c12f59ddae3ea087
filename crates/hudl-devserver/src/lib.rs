//! Development server for Hudl templates.
//!
//! Parses every `.hudl` file under a watched directory into an in-memory
//! [`registry::TemplateRegistry`], re-parses on file change, and serves
//! render requests over HTTP with live-reload notifications pushed to
//! connected clients over server-sent events.

pub mod error;
pub mod preview;
pub mod registry;
pub mod reload;
pub mod server;
pub mod watcher;

pub use error::ServerError;
pub use registry::{ComponentRecord, RegistrySnapshot, TemplateRegistry};
pub use reload::ReloadHub;
pub use server::{DevServer, DevServerConfig};
pub use watcher::FileWatcher;
