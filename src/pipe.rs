// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Composition of `Result`-returning stages.
//!
//! These are helpers for callers assembling pipelines out of fallible steps;
//! the crate's own modules chain with `?`. [`StagePanic`] is also how
//! [`crate::resource`] reports a panicking disposal.
//!
//! A pipeline threads a value through a sequence of stages. Each stage
//! receives the previous stage's success value and returns a `Result`; the
//! first failure short-circuits the pipeline and is returned as-is, without
//! invoking any later stage.
//!
//! ```
//! use filepeek::pipe;
//!
//! let parse = |s: &str| s.trim().parse::<i64>().map_err(|e| e.to_string());
//! let positive = |n: i64| if n > 0 { Ok(n) } else { Err("not positive".to_string()) };
//! let double = |n: i64| Ok::<_, String>(n * 2);
//!
//! let run = pipe!(parse, positive, double);
//! assert_eq!(run(" 21 "), Ok(42));
//! assert_eq!(run("-1"), Err("not positive".to_string()));
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

/// Boxed future returned by asynchronous pipelines.
pub type StageFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// A transform passed to [`map`] panicked.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("stage panicked: {message}")]
pub struct StagePanic {
    /// The panic payload, if it was a string.
    pub message: String,
}

impl StagePanic {
    pub(crate) fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self { message }
    }
}

/// Composes two stages into one.
///
/// `second` only runs when `first` succeeds.
pub fn pipe<A, B, C, E>(
    first: impl Fn(A) -> Result<B, E>,
    second: impl Fn(B) -> Result<C, E>,
) -> impl Fn(A) -> Result<C, E> {
    move |input| second(first(input)?)
}

/// Composes two asynchronous stages into one.
///
/// The returned function is cheap to clone; both stages are shared behind an
/// `Arc`.
pub fn pipe_async<A, B, C, E, F, G, FutB, FutC>(
    first: F,
    second: G,
) -> impl Fn(A) -> StageFuture<C, E> + Clone + Send + Sync + 'static
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    E: Send + 'static,
    F: Fn(A) -> FutB + Send + Sync + 'static,
    G: Fn(B) -> FutC + Send + Sync + 'static,
    FutB: Future<Output = Result<B, E>> + Send + 'static,
    FutC: Future<Output = Result<C, E>> + Send + 'static,
{
    let first = Arc::new(first);
    let second = Arc::new(second);
    move |input| {
        let first = Arc::clone(&first);
        let second = Arc::clone(&second);
        Box::pin(async move {
            let value = first(input).await?;
            second(value).await
        })
    }
}

/// Wraps a value as a success.
///
/// # Errors
///
/// Never fails.
pub const fn identity<T, E>(value: T) -> Result<T, E> {
    Ok(value)
}

/// Builds a stage that runs `effect` on the value and passes it through.
pub fn tap<T, E>(effect: impl Fn(&T)) -> impl Fn(T) -> Result<T, E> {
    move |value| {
        effect(&value);
        Ok(value)
    }
}

/// Builds a stage that transforms the success value.
///
/// A panic inside `transform` is caught and returned as a failure instead of
/// unwinding through the pipeline.
pub fn map<T, U, E>(transform: impl Fn(T) -> U) -> impl Fn(T) -> Result<U, E>
where
    E: From<StagePanic>,
{
    move |value| {
        catch_unwind(AssertUnwindSafe(|| transform(value)))
            .map_err(|payload| E::from(StagePanic::from_payload(payload.as_ref())))
    }
}

/// Chains any number of stages with [`pipe()`](crate::pipe::pipe).
#[macro_export]
macro_rules! pipe {
    ($stage:expr $(,)?) => {
        $stage
    };
    ($first:expr, $($rest:expr),+ $(,)?) => {
        $crate::pipe::pipe($first, $crate::pipe!($($rest),+))
    };
}

/// Chains any number of asynchronous stages with
/// [`pipe_async()`](crate::pipe::pipe_async).
#[macro_export]
macro_rules! pipe_async {
    ($stage:expr $(,)?) => {
        $stage
    };
    ($first:expr, $($rest:expr),+ $(,)?) => {
        $crate::pipe::pipe_async($first, $crate::pipe_async!($($rest),+))
    };
}
