use std::fmt;
use url::Url;

use super::FeedBrowser;

/// Identity of one pushed view.
///
/// Ids are never reused, so a fetch result tagged with the id of a view
/// that has since been popped finds nothing to write into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct View {
    pub id: ViewId,
    pub browser: FeedBrowser,
}

/// Forward navigation history of feed views.
///
/// The root view is always present; `pop` stops there.
#[derive(Debug)]
pub struct NavigationStack {
    root: View,
    pushed: Vec<View>,
    next_id: u64,
}

impl NavigationStack {
    pub fn new(root: Url) -> Self {
        Self {
            root: View {
                id: ViewId(0),
                browser: FeedBrowser::new(root),
            },
            pushed: Vec::new(),
            next_id: 1,
        }
    }

    /// Pushes a fresh browser for `url` and makes it current.
    pub fn push(&mut self, url: Url) -> ViewId {
        let id = ViewId(self.next_id);
        self.next_id += 1;
        tracing::debug!(view = %id, url = %url, depth = self.depth() + 1, "Pushing view");
        self.pushed.push(View {
            id,
            browser: FeedBrowser::new(url),
        });
        id
    }

    /// Drops the current view. Returns `None` at the root.
    pub fn pop(&mut self) -> Option<View> {
        self.pushed.pop()
    }

    pub fn current(&self) -> &View {
        self.pushed.last().unwrap_or(&self.root)
    }

    pub fn current_mut(&mut self) -> &mut View {
        self.pushed.last_mut().unwrap_or(&mut self.root)
    }

    /// The live browser for `id`, if that view is still on the stack.
    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut FeedBrowser> {
        std::iter::once(&mut self.root)
            .chain(self.pushed.iter_mut())
            .find(|v| v.id == id)
            .map(|v| &mut v.browser)
    }

    /// Number of views, including the root.
    pub fn depth(&self) -> usize {
        self.pushed.len() + 1
    }

    /// Views from the root to the current one.
    pub fn iter(&self) -> impl Iterator<Item = &View> {
        std::iter::once(&self.root).chain(self.pushed.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_root_is_never_popped() {
        let mut stack = NavigationStack::new(url("https://example.com/opds"));
        assert_eq!(stack.depth(), 1);
        assert!(stack.pop().is_none());
        assert_eq!(stack.current().browser.original_url().as_str(), "https://example.com/opds");
    }

    #[test]
    fn test_push_pop() {
        let mut stack = NavigationStack::new(url("https://example.com/opds"));
        let root_id = stack.current().id;
        let child = stack.push(url("https://example.com/opds/new"));
        assert_ne!(child, root_id);
        assert_eq!(stack.current().id, child);
        assert_eq!(stack.depth(), 2);

        let popped = stack.pop().unwrap();
        assert_eq!(popped.id, child);
        assert_eq!(stack.current().id, root_id);
    }

    #[test]
    fn test_ids_not_reused_and_popped_views_unreachable() {
        let mut stack = NavigationStack::new(url("https://example.com/opds"));
        let first = stack.push(url("https://example.com/a"));
        stack.pop();
        let second = stack.push(url("https://example.com/b"));
        assert_ne!(first, second);
        assert!(stack.get_mut(first).is_none());
        assert!(stack.get_mut(second).is_some());
    }

    #[test]
    fn test_get_mut_reaches_buried_views() {
        let mut stack = NavigationStack::new(url("https://example.com/opds"));
        let root_id = stack.current().id;
        stack.push(url("https://example.com/a"));
        stack.push(url("https://example.com/b"));
        let root = stack.get_mut(root_id).unwrap();
        assert_eq!(root.original_url().as_str(), "https://example.com/opds");
        let urls: Vec<&str> = stack.iter().map(|v| v.browser.original_url().as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://example.com/opds", "https://example.com/a", "https://example.com/b"]
        );
    }
}
