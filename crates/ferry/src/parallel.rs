//! Concurrent fan-out of blocking work.
//!
//! Workers run on tokio blocking threads, either on a shared process-wide
//! runtime or on a dedicated runtime whose blocking pool is capped at a
//! fixed, named set of threads. Every call blocks the invoking thread until
//! all submitted workers have completed, so it must not be used from inside
//! an async context.
//!
//! Results keep the input order of the items that passed the filter. When a
//! worker fails, its siblings are not cancelled: all workers run to
//! completion, and the first failure in input order is returned while the
//! remaining results are discarded.

use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

/// Thread name of the shared runtime.
pub const SHARED_POOL_NAME: &str = "parallel-io";

static SHARED: OnceLock<Runtime> = OnceLock::new();

/// Errors returned by a fan-out call.
#[derive(Debug, Error)]
pub enum ParallelError<E> {
    /// A worker returned an error.
    #[error("parallel worker failed: {0}")]
    Worker(E),

    /// A worker panicked.
    #[error("parallel worker panicked: {0}")]
    Panicked(String),

    /// The pool was asked to run with zero threads.
    #[error("worker pool '{0}' needs at least one thread")]
    EmptyPool(String),

    /// The runtime backing the pool could not be started.
    #[error("failed to start worker pool '{name}': {source}")]
    Pool {
        /// Pool name.
        name: String,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },
}

impl<E> ParallelError<E> {
    /// The worker error, if the fan-out failed because of one.
    pub fn into_worker(self) -> Option<E> {
        match self {
            ParallelError::Worker(e) => Some(e),
            _ => None,
        }
    }
}

/// Where workers are executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pool {
    /// Shared runtime with an unbounded blocking pool.
    Shared,
    /// Dedicated runtime with a fixed number of named blocking threads.
    Fixed {
        /// Maximum simultaneous workers.
        threads: usize,
        /// Thread name.
        name: String,
    },
}

/// Fan-out entry points.
pub struct Parallel;

impl Parallel {
    /// Apply `mapper` to every item concurrently.
    pub fn map<T, R, E, F>(
        items: impl IntoIterator<Item = T>,
        mapper: F,
    ) -> Result<Vec<R>, ParallelError<E>>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
    {
        run(&Pool::Shared, items.into_iter().collect(), mapper)
    }

    /// Apply `mapper` concurrently to the items accepted by `filter`.
    ///
    /// Rejected items never reach the mapper and produce no result.
    pub fn map_filtered<T, R, E, P, F>(
        items: impl IntoIterator<Item = T>,
        filter: P,
        mapper: F,
    ) -> Result<Vec<R>, ParallelError<E>>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
        P: Fn(&T) -> bool,
        F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
    {
        run(&Pool::Shared, items.into_iter().filter(filter).collect(), mapper)
    }

    /// Run `callback` concurrently for its side effects.
    pub fn each<T, E, F>(
        items: impl IntoIterator<Item = T>,
        callback: F,
    ) -> Result<(), ParallelError<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> Result<(), E> + Send + Sync + 'static,
    {
        run(&Pool::Shared, items.into_iter().collect(), callback).map(|_| ())
    }

    /// Mutate every item concurrently and hand the items back in order.
    pub fn with<T, E, F>(
        items: impl IntoIterator<Item = T>,
        callback: F,
    ) -> Result<Vec<T>, ParallelError<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(&mut T) -> Result<(), E> + Send + Sync + 'static,
    {
        run(&Pool::Shared, items.into_iter().collect(), move |mut item: T| {
            callback(&mut item)?;
            Ok(item)
        })
    }

    /// Like [`Parallel::map`], on at most `threads` threads named `name`.
    pub fn pool_map<T, R, E, F>(
        threads: usize,
        name: &str,
        items: impl IntoIterator<Item = T>,
        mapper: F,
    ) -> Result<Vec<R>, ParallelError<E>>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
    {
        let pool = Pool::Fixed {
            threads,
            name: name.to_string(),
        };
        run(&pool, items.into_iter().collect(), mapper)
    }

    /// Like [`Parallel::each`], on at most `threads` threads named `name`.
    pub fn pool_each<T, E, F>(
        threads: usize,
        name: &str,
        items: impl IntoIterator<Item = T>,
        callback: F,
    ) -> Result<(), ParallelError<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> Result<(), E> + Send + Sync + 'static,
    {
        Self::pool_map(threads, name, items, callback).map(|_| ())
    }
}

/// Execute `mapper` over `items` on the given pool.
pub fn run<T, R, E, F>(pool: &Pool, items: Vec<T>, mapper: F) -> Result<Vec<R>, ParallelError<E>>
where
    T: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    match pool {
        Pool::Shared => {
            let runtime = shared_runtime().map_err(|source| ParallelError::Pool {
                name: SHARED_POOL_NAME.to_string(),
                source,
            })?;
            execute(runtime.handle(), items, mapper)
        }
        Pool::Fixed { threads, name } => {
            if *threads == 0 {
                return Err(ParallelError::EmptyPool(name.clone()));
            }
            let runtime = Builder::new_multi_thread()
                .worker_threads(1)
                .max_blocking_threads(*threads)
                .thread_name(name.as_str())
                .enable_all()
                .build()
                .map_err(|source| ParallelError::Pool {
                    name: name.clone(),
                    source,
                })?;
            tracing::debug!(pool = %name, threads, items = items.len(), "Starting fixed worker pool");
            execute(runtime.handle(), items, mapper)
        }
    }
}

fn shared_runtime() -> std::io::Result<&'static Runtime> {
    if let Some(runtime) = SHARED.get() {
        return Ok(runtime);
    }
    let runtime = Builder::new_multi_thread()
        .thread_name(SHARED_POOL_NAME)
        .enable_all()
        .build()?;
    // A racing initializer may win; the spare runtime is simply dropped.
    Ok(SHARED.get_or_init(|| runtime))
}

fn execute<T, R, E, F>(
    handle: &Handle,
    items: Vec<T>,
    mapper: F,
) -> Result<Vec<R>, ParallelError<E>>
where
    T: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
{
    let mapper = Arc::new(mapper);

    // Scheduled eagerly in input order.
    let tasks: Vec<JoinHandle<Result<R, E>>> = items
        .into_iter()
        .map(|item| {
            let mapper = Arc::clone(&mapper);
            handle.spawn_blocking(move || mapper(item))
        })
        .collect();

    handle.block_on(async move {
        let mut results = Vec::with_capacity(tasks.len());
        let mut failure = None;

        for task in tasks {
            match task.await {
                Ok(Ok(value)) => results.push(value),
                Ok(Err(e)) => {
                    failure.get_or_insert(ParallelError::Worker(e));
                }
                Err(join_error) => {
                    failure.get_or_insert(ParallelError::Panicked(join_error.to_string()));
                }
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(results),
        }
    })
}
