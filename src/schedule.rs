// CLASSIFICATION: COMMUNITY
// Filename: schedule.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Fixed-interval background ticker.
//!
//! Knows nothing about trees or snapshots: it runs a closure, sleeps, and
//! repeats until asked to stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, trace, warn};

use crate::error::{MirrorError, Result};

/// Handle to a running periodic task.
///
/// Dropping the handle leaves the task running for the rest of the
/// process; call [`Periodic::stop`] to end it.
#[derive(Debug)]
pub struct Periodic {
    name: String,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Periodic {
    /// Run `task` on a named thread every `interval`, starting immediately.
    pub fn spawn<F>(name: &str, interval: Duration, mut task: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let label = name.to_owned();
        let worker = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                debug!("[schedule] {label} started, interval {interval:?}");
                while !flag.load(Ordering::Acquire) {
                    trace!("[schedule] {label} tick");
                    task();
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    thread::park_timeout(interval);
                }
                debug!("[schedule] {label} stopped");
            })
            .map_err(|e| MirrorError::Spawn(format!("{name}: {e}")))?;
        Ok(Self {
            name: name.to_owned(),
            stop,
            worker: Some(worker),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the task to finish and wait for the current tick to complete.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            worker.thread().unpark();
            if worker.join().is_err() {
                warn!("[schedule] {} panicked", self.name);
            }
        }
    }
}
