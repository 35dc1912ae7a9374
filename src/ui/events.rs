//! Background task event processing.

use crate::app::{App, AppEvent};
use crate::browser::{PageError, Presenter};
use crate::fetch::FetchError;

/// Applies a background task result to the view that requested it.
///
/// Results for views that have been popped since are dropped.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::FeedLoaded { view, result } => {
            match app.stack.get_mut(view) {
                Some(browser) => browser.finish_load(result, &mut app.status),
                None => {
                    app.status.busy(false);
                    tracing::debug!(view = %view, "Dropping feed for closed view");
                }
            }
            if view == app.view_id() {
                app.clamp_selection();
            }
        }
        AppEvent::PageLoaded { view, token, result } => {
            app.status.busy(false);
            let Some(browser) = app.stack.get_mut(view) else {
                tracing::debug!(view = %view, "Dropping page for closed view");
                return;
            };
            match browser.finish_next_page(token, result) {
                Ok(feed) => {
                    let total = feed.publications.len();
                    app.status.set(format!("{} publications loaded", total));
                }
                Err(PageError::Stale) => {
                    tracing::debug!(view = %view, "Dropping page for reloaded view");
                }
                Err(e) => {
                    tracing::warn!(view = %view, error = %e, "Next page failed");
                    app.status.set(format!("Failed to load next page: {}", e));
                }
            }
        }
        AppEvent::TaskPanicked {
            task,
            view,
            page,
            error,
        } => match (app.stack.get_mut(view), page) {
            // A load that never reports back would leave the view loading forever
            (Some(browser), None) => {
                browser.finish_load(Err(FetchError::Aborted(error)), &mut app.status);
                if view == app.view_id() {
                    app.clamp_selection();
                }
            }
            (Some(browser), Some(token)) => {
                app.status.busy(false);
                browser.cancel_next_page(token);
                app.set_status(format!("Internal error in {}: {}", task, error));
            }
            (None, _) => {
                app.status.busy(false);
                app.set_status(format!("Internal error in {}: {}", task, error));
            }
        },
    }
}
