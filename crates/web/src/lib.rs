//! tdbuild dev server
//!
//! Serves the static test fixtures the browser suite loads, plus a JSONP mock
//! endpoint answering SDK requests with canned success/error payloads.

pub mod mock;
pub mod server;

pub use mock::MockPayloads;
pub use server::{shutdown, DevServer, DevServerConfig};
