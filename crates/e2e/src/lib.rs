//! tdbuild browser test runners
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  TestRunner            karma against the local dev server   │
//! │    ├── run_once()      single run, then stop the server     │
//! │    └── watch()         rebuild on change until karma exits  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RemoteGridCoordinator Sauce Labs through a tunnel          │
//! │    ├── open tunnel                                          │
//! │    ├── batches of <= concurrency browsers, in sequence      │
//! │    └── stop server, close tunnel, report worst status       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  E2eSuite              node specs against a WebDriver hub   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod grid;
pub mod karma;
pub mod runner;
pub mod webdriver;

pub use error::{E2eError, E2eResult};
pub use grid::{
    GridOutcome, RemoteGridCoordinator, SauceConnectLauncher, Tunnel, TunnelLauncher,
};
pub use karma::{KarmaLauncher, SuiteRequest, SuiteRunner};
pub use runner::{Rebuild, TestRunner, WatchConfig};
pub use webdriver::{E2eSuite, NodeSpecRunner, SpecRunner};
