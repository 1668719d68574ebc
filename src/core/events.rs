//! Startup and shutdown callbacks for the HTTP service lifecycle.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::future::{BoxFuture, FutureExt};

use crate::config::AppSettings;
use crate::core::Result;

/// Runs once before the server starts accepting connections
pub type StartAppHandler = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// Runs once after the server stopped; cannot fail
pub type StopAppHandler = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

pub fn create_start_app_handler(settings: &AppSettings) -> StartAppHandler {
    let title = settings.title.clone();
    let app_env = settings.app_env;

    Box::new(move || {
        async move {
            tracing::info!(service = %title, env = %app_env, "Starting application");
            Ok(())
        }
        .boxed()
    })
}

pub fn create_stop_app_handler() -> StopAppHandler {
    catch_stop_errors(|| async {
        tracing::info!("Stopping application");
        Ok(())
    })
}

/// Wrap a shutdown routine so that neither its errors nor its panics escape.
pub fn catch_stop_errors<F, Fut>(stop: F) -> StopAppHandler
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Box::new(move || {
        async move {
            match AssertUnwindSafe(async move { stop().await })
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Shutdown handler failed"),
                Err(_) => tracing::error!("Shutdown handler panicked"),
            }
        }
        .boxed()
    })
}
