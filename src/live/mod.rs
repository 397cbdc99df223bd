// src/live/mod.rs

//! Live preview: HTTP server for the output tree and a WebSocket channel that
//! tells browsers to reload or re-fetch stylesheets.

pub mod event;
pub mod hub;
pub mod server;
pub mod session;

pub use event::{ReloadEvent, ReloadScope};
pub use hub::ReloadHub;
pub use session::LiveSession;
