//! Per-run context
//!
//! Everything a run mutates besides the frontier and registry: the page
//! driver session, the working directory and the wall-clock start. Passing it
//! explicitly lets several independent runs coexist in one process.

use crate::driver::PageDriver;
use crate::storage::Workspace;
use std::time::{Duration, Instant};

/// Driver session and working directory owned by one run
#[derive(Debug)]
pub struct RunContext<D> {
    driver: D,
    workspace: Workspace,
    started: Instant,
}

impl<D: PageDriver> RunContext<D> {
    pub fn new(driver: D, workspace: Workspace) -> Self {
        Self {
            driver,
            workspace,
            started: Instant::now(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Time since the context was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Drops the driver's cookies and cached pages
    ///
    /// Failures are logged and otherwise ignored; a stale session only costs
    /// memory.
    pub async fn clear_session(&mut self) {
        if let Err(e) = self.driver.clear_session().await {
            tracing::warn!("Failed to clear driver session: {}", e);
        }
    }

    /// Consumes the context, returning the driver
    pub fn into_driver(self) -> D {
        self.driver
    }
}
