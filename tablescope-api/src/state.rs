//! Shared application state for Axum routers.

use std::time::Instant;

use tablescope_core::TableBrowser;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Table browser over the configured catalog.
    pub browser: TableBrowser,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(browser: TableBrowser) -> Self {
        Self {
            browser,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(TableBrowser, browser);
crate::impl_from_ref!(Instant, start_time);
