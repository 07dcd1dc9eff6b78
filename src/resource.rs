// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Teardown of long-lived resources.
//!
//! Components that hold something needing explicit release (a background
//! task, a transport) implement [`Disposable`] and are registered with the
//! [`ResourceManager`] when they are created. At shutdown the manager disposes
//! them in reverse registration order and keeps going past failures.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures_util::FutureExt;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::logger::{Logger, TracingLogger};
use crate::pipe::StagePanic;

/// Something with an explicit, possibly failing, teardown step.
#[async_trait]
pub trait Disposable: Send + Sync {
    /// Name used in log context.
    fn name(&self) -> &str;

    /// Releases the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource could not be released cleanly.
    async fn dispose(&self) -> Result<()>;
}

/// Tracks disposables and tears them down in LIFO order.
pub struct ResourceManager<L: Logger = TracingLogger> {
    resources: Mutex<Vec<Arc<dyn Disposable>>>,
    disposing: AtomicBool,
    logger: L,
}

impl Default for ResourceManager<TracingLogger> {
    fn default() -> Self {
        Self::new(TracingLogger)
    }
}

impl<L: Logger> ResourceManager<L> {
    /// Creates an empty manager.
    #[must_use]
    pub const fn new(logger: L) -> Self {
        Self {
            resources: Mutex::new(Vec::new()),
            disposing: AtomicBool::new(false),
            logger,
        }
    }

    /// Starts tracking `resource` and hands it back.
    ///
    /// Registering the same `Arc` twice tracks it once. A resource registered
    /// while [`dispose_all`](Self::dispose_all) is running is not part of that
    /// pass; it stays tracked for the next one.
    pub fn register<T: Disposable + 'static>(&self, resource: Arc<T>) -> Arc<T> {
        let tracked: Arc<dyn Disposable> = resource.clone();
        let mut resources = self.resources.lock().unwrap_or_else(PoisonError::into_inner);

        if resources.iter().any(|r| Arc::ptr_eq(r, &tracked)) {
            return resource;
        }

        if self.disposing.load(Ordering::Acquire) {
            self.logger.warn(
                "Resource registered during disposal, deferring to next pass",
                json!({ "resource": tracked.name() }),
            );
        } else {
            self.logger
                .debug("Resource registered", json!({ "resource": tracked.name() }));
        }

        resources.push(tracked);
        resource
    }

    /// Number of resources currently tracked.
    pub fn active_resources(&self) -> usize {
        self.resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Disposes every tracked resource, most recently registered first.
    ///
    /// Failures and panics are logged and do not stop the pass. The tracked
    /// list is detached before the first disposal, so the manager is empty
    /// afterwards regardless of outcome.
    pub async fn dispose_all(&self) {
        let snapshot = {
            let mut resources = self.resources.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *resources)
        };
        let _disposing = DisposingFlag::raise(&self.disposing);

        let total = snapshot.len();
        let mut failed = 0usize;

        for resource in snapshot.into_iter().rev() {
            let outcome = AssertUnwindSafe(resource.dispose())
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(StagePanic::from_payload(payload.as_ref()).into())
                });
            if let Err(e) = outcome {
                failed += 1;
                self.logger.error(
                    "Failed to dispose resource",
                    json!({
                        "resource": resource.name(),
                        "error": format!("{e:#}"),
                    }),
                );
            }
        }

        self.logger.info(
            "Resources disposed",
            json!({ "disposed": total - failed, "failed": failed }),
        );
    }
}

/// Holds the `disposing` flag up until dropped.
struct DisposingFlag<'a>(&'a AtomicBool);

impl<'a> DisposingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for DisposingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A spawned task whose disposal aborts it and waits for it to finish.
pub struct TaskGuard<T> {
    name: String,
    handle: Mutex<Option<JoinHandle<T>>>,
    grace: Option<Duration>,
}

impl<T> TaskGuard<T> {
    /// Wraps a spawned task. Disposal waits for it without a bound.
    #[must_use]
    pub fn new(name: impl Into<String>, handle: JoinHandle<T>) -> Self {
        Self {
            name: name.into(),
            handle: Mutex::new(Some(handle)),
            grace: None,
        }
    }

    /// Wraps a task that may not observe cancellation, such as one started
    /// with `spawn_blocking`. Disposal fails if it is still running after
    /// `grace`.
    #[must_use]
    pub fn with_grace(name: impl Into<String>, handle: JoinHandle<T>, grace: Duration) -> Self {
        Self {
            grace: Some(grace),
            ..Self::new(name, handle)
        }
    }

    /// Whether the task has already finished (or was disposed).
    pub fn is_finished(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(JoinHandle::is_finished)
    }
}

#[async_trait]
impl<T: Send + 'static> Disposable for TaskGuard<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn dispose(&self) -> Result<()> {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return Ok(());
        };

        handle.abort();
        let joined = match self.grace {
            Some(grace) => tokio::time::timeout(grace, handle)
                .await
                .map_err(|_| anyhow!("Task {} still running after {grace:?}", self.name))?,
            None => handle.await,
        };
        match joined {
            Ok(_) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(anyhow!("Task {} panicked: {e}", self.name)),
        }
    }
}
