//! Helper functions for UI operations.
//!
//! Fetches run on spawned tasks and report back through the `AppEvent`
//! channel, tagged with the view that asked for them.

use crate::app::{App, AppEvent};
use crate::browser::{PageError, PageToken, Presenter, ViewId};
use crate::fetch::FeedFetcher;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Wraps a future to catch panics and convert them to errors.
///
/// Instead of a panicking task silently disappearing, the panic message is
/// returned as `Err(String)` so it can be reported as `AppEvent::TaskPanicked`.
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    Load { fresh: bool },
    Page(PageToken),
}

impl FetchKind {
    fn task_name(self) -> &'static str {
        match self {
            Self::Load { .. } => "feed_load",
            Self::Page(_) => "page_load",
        }
    }
}

/// Starts the initial load (or a reload) of the current view.
///
/// `fresh` bypasses the response cache.
pub(super) fn start_load(app: &mut App, tx: &mpsc::Sender<AppEvent>, fresh: bool) {
    let view = app.view_id();
    let url = app.stack.current_mut().browser.begin_load(&mut app.status);
    spawn_fetch(app.fetcher.clone(), view, url, FetchKind::Load { fresh }, tx.clone());
}

/// Claims the next page of the current view and fetches it.
pub(super) fn start_next_page(app: &mut App, tx: &mpsc::Sender<AppEvent>) -> Result<(), PageError> {
    let view = app.view_id();
    let (token, url) = app.stack.current_mut().browser.begin_next_page()?;
    app.status.busy(true);
    spawn_fetch(app.fetcher.clone(), view, url, FetchKind::Page(token), tx.clone());
    Ok(())
}

fn spawn_fetch(
    fetcher: Arc<dyn FeedFetcher>,
    view: ViewId,
    url: Url,
    kind: FetchKind,
    tx: mpsc::Sender<AppEvent>,
) {
    tracing::debug!(view = %view, url = %url, kind = ?kind, "Spawning catalog fetch");
    tokio::spawn(async move {
        let outcome = catch_task_panic(async {
            match kind {
                FetchKind::Load { fresh: true } => fetcher.fetch_fresh(&url).await,
                FetchKind::Load { fresh: false } | FetchKind::Page(_) => fetcher.fetch(&url).await,
            }
        })
        .await;

        let event = match outcome {
            Ok(result) => match kind {
                FetchKind::Load { .. } => AppEvent::FeedLoaded { view, result },
                FetchKind::Page(token) => AppEvent::PageLoaded { view, token, result },
            },
            Err(panic_msg) => {
                tracing::error!(task = kind.task_name(), error = %panic_msg, "Background task panicked");
                AppEvent::TaskPanicked {
                    task: kind.task_name(),
                    view,
                    page: match kind {
                        FetchKind::Page(token) => Some(token),
                        FetchKind::Load { .. } => None,
                    },
                    error: panic_msg,
                }
            }
        };

        if tx.send(event).await.is_err() {
            tracing::warn!(view = %view, "Channel send failed (receiver dropped)");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catch_task_panic_ok() {
        assert_eq!(catch_task_panic(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_catch_task_panic_message() {
        let result: Result<(), String> = catch_task_panic(async { panic!("boom") }).await;
        assert_eq!(result, Err("boom".to_string()));

        let result: Result<(), String> =
            catch_task_panic(async { panic!("code {}", 42) }).await;
        assert_eq!(result, Err("code 42".to_string()));
    }
}
