//! Single-flight application initialization and the request guard in front of it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::DbError;
use crate::routing::RouteError;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Database connection failed: {0}")]
    Database(#[from] DbError),
    #[error("Route discovery failed: {0}")]
    Routes(#[from] RouteError),
}

type SharedInit = Shared<BoxFuture<'static, Result<(), Arc<InitError>>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitStatus {
    NotStarted,
    InProgress,
    Ready,
    Failed(String),
}

/// Runs initialization exactly once; every caller of [`InitGuard::wait`]
/// awaits the same shared handle.
#[derive(Default)]
pub struct InitGuard {
    initialized: Arc<AtomicBool>,
    pending: OnceLock<SharedInit>,
}

impl InitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `init` in the background. Returns false (and drops `init` unpolled)
    /// when initialization was already started.
    pub fn start<F>(&self, init: F) -> bool
    where
        F: Future<Output = Result<(), InitError>> + Send + 'static,
    {
        let initialized = Arc::clone(&self.initialized);
        let shared = async move {
            match init.await {
                Ok(()) => {
                    initialized.store(true, Ordering::Release);
                    Ok(())
                }
                Err(e) => Err(Arc::new(e)),
            }
        }
        .boxed()
        .shared();

        if self.pending.set(shared.clone()).is_err() {
            warn!("Initialization already started, ignoring");
            return false;
        }

        tokio::spawn(async move {
            match shared.await {
                Ok(()) => info!("Application initialized"),
                Err(e) => error!(error = %e, "Failed to initialize application"),
            }
        });
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn status(&self) -> InitStatus {
        if self.is_initialized() {
            return InitStatus::Ready;
        }
        match self.pending.get().and_then(|pending| pending.peek().cloned()) {
            None if self.pending.get().is_none() => InitStatus::NotStarted,
            None => InitStatus::InProgress,
            Some(Ok(())) => InitStatus::Ready,
            Some(Err(e)) => InitStatus::Failed(e.to_string()),
        }
    }

    /// Resolve once initialization has succeeded.
    pub async fn wait(&self) -> Result<(), GuardRejection> {
        if self.is_initialized() {
            return Ok(());
        }
        let pending = self.pending.get().ok_or(GuardRejection::NotStarted)?;
        pending
            .clone()
            .await
            .map_err(|e| GuardRejection::Failed(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    NotStarted,
    Failed(String),
}

#[derive(Serialize)]
struct GuardErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        let body = match self {
            GuardRejection::NotStarted => GuardErrorBody {
                error: "Application initialization not started",
                message: None,
            },
            GuardRejection::Failed(message) => GuardErrorBody {
                error: "Application initialization failed",
                message: Some(message),
            },
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Hold each request until initialization has finished.
pub async fn require_initialized(
    State(guard): State<Arc<InitGuard>>,
    req: Request,
    next: Next,
) -> Response {
    match guard.wait().await {
        Ok(()) => next.run(req).await,
        Err(rejection) => {
            error!(?rejection, "Rejecting request before initialization");
            rejection.into_response()
        }
    }
}
