//! Chromium bindings for the settle primitives and a page-object session on top.

pub mod chromium;
pub mod session;
mod shared;

pub use chromium::{
    launch, network_events, open_page, ChromiumPage, LaunchedBrowser, ProfileDir,
};
pub use session::PageSession;
pub use settle_core::{BrowserConfig, HarnessError, WaitConfig};
