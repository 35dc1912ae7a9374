use url::Url;

use super::FeedBrowser;
use crate::fetch::FetchError;

/// The surface a [`FeedBrowser`] reports to.
///
/// The browser never renders anything itself. It tells the presenter when
/// work starts and stops, when a feed is ready to be laid out, and when a
/// load failed. Layout is then pulled from the browser.
pub trait Presenter {
    /// A fetch started (`true`) or finished (`false`).
    fn busy(&mut self, busy: bool);

    /// The initial load succeeded; redraw everything from `browser`.
    fn feed_ready(&mut self, browser: &FeedBrowser);

    /// The initial load of `url` failed.
    fn load_failed(&mut self, url: &Url, error: &FetchError);
}
