//! Keybinding registry: maps actions to key events with config overrides.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavDown,
    NavUp,
    PageDown,
    PageUp,
    Select,
    Back,
    LoadMore,
    Filter,
    ClearFilter,
    Open,
    Refresh,
    ShowHelp,
}

impl Action {
    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit application",
            Self::NavDown => "Navigate down",
            Self::NavUp => "Navigate up",
            Self::PageDown => "Page down",
            Self::PageUp => "Page up",
            Self::Select => "Open entry / apply filter",
            Self::Back => "Go back / dismiss",
            Self::LoadMore => "Load next page",
            Self::Filter => "Show filter menu",
            Self::ClearFilter => "Clear filter",
            Self::Open => "Open acquisition link",
            Self::Refresh => "Reload current feed",
            Self::ShowHelp => "Show help",
        }
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Dispatch context: determines which bindings are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    /// The feed view.
    Catalog,
    /// The facet filter menu.
    Filter,
    /// The publication detail popup.
    Detail,
}

impl Context {
    pub fn label(self) -> &'static str {
        match self {
            Self::Global => "Global",
            Self::Catalog => "Catalog",
            Self::Filter => "Filter menu",
            Self::Detail => "Publication",
        }
    }
}

// ============================================================================
// Key Specification
// ============================================================================

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }
}

/// Names accepted in config files, paired with the key they denote. The
/// first name listed for a key is the one shown in help.
const NAMED_KEYS: &[(&str, KeyCode)] = &[
    ("Enter", KeyCode::Enter),
    ("Return", KeyCode::Enter),
    ("Esc", KeyCode::Esc),
    ("Escape", KeyCode::Esc),
    ("Tab", KeyCode::Tab),
    ("Up", KeyCode::Up),
    ("Down", KeyCode::Down),
    ("Left", KeyCode::Left),
    ("Right", KeyCode::Right),
    ("Backspace", KeyCode::Backspace),
    ("PageUp", KeyCode::PageUp),
    ("PageDown", KeyCode::PageDown),
    ("Home", KeyCode::Home),
    ("End", KeyCode::End),
    ("Space", KeyCode::Char(' ')),
];

/// Parse a key string from config into a KeySpec.
///
/// A key is a single character, a name from [`NAMED_KEYS`] (any case), or
/// `F1`..`F12`, optionally prefixed by `Ctrl+` and/or `Alt+`. Shifted
/// letters are written as the uppercase character.
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let mut modifiers = KeyModifiers::NONE;
    let mut rest = s.trim();

    while let Some((prefix, tail)) = rest.split_once('+') {
        // "+" on its own (or "Ctrl++") binds the plus key
        if prefix.is_empty() {
            break;
        }
        modifiers |= match prefix.trim().to_lowercase().as_str() {
            "ctrl" | "control" => KeyModifiers::CONTROL,
            "alt" | "meta" => KeyModifiers::ALT,
            _ => return None,
        };
        rest = tail.trim();
    }

    let code = parse_key_code(rest)?;
    Some(KeySpec::new(code, modifiers))
}

fn parse_key_code(s: &str) -> Option<KeyCode> {
    if let Some((_, code)) = NAMED_KEYS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(s))
    {
        return Some(*code);
    }

    if let Some(n) = s
        .strip_prefix(['F', 'f'])
        .and_then(|rest| rest.parse::<u8>().ok())
    {
        return (1..=12).contains(&n).then_some(KeyCode::F(n));
    }

    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeyCode::Char(c)),
        _ => None,
    }
}

/// Format a KeySpec the way config files write it.
fn format_key(key: &KeySpec) -> String {
    let mut out = String::new();
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        out.push_str("Ctrl+");
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        out.push_str("Alt+");
    }

    match NAMED_KEYS.iter().find(|(_, code)| *code == key.code) {
        Some((name, _)) => out.push_str(name),
        None => match key.code {
            KeyCode::Char(c) => out.push(c),
            KeyCode::F(n) => out.push_str(&format!("F{}", n)),
            other => out.push_str(&format!("{:?}", other)),
        },
    }
    out
}

// ============================================================================
// Keybinding Registry
// ============================================================================

/// Registry of keybindings, supporting default bindings and config overrides.
///
/// The same key can map to different actions in different contexts;
/// lookups fall back to [`Context::Global`].
pub struct KeybindingRegistry {
    /// Primary lookup: (Context, KeySpec) -> Action
    lookup: HashMap<(Context, KeySpec), Action>,
    /// All bindings for help screen enumeration
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::new(),
        };
        registry.register_defaults();
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    fn bind_all(&mut self, context: Context, keys: &[KeySpec], action: Action) {
        for key in keys {
            self.bind(context, *key, action);
        }
    }

    fn register_defaults(&mut self) {
        use KeyCode::*;
        let plain = KeySpec::plain;

        // === Global ===
        self.bind(Context::Global, plain(Char('q')), Action::Quit);
        self.bind(Context::Global, KeySpec::ctrl('c'), Action::Quit);
        self.bind(Context::Global, plain(Char('?')), Action::ShowHelp);
        self.bind_all(Context::Global, &[plain(Char('j')), plain(Down)], Action::NavDown);
        self.bind_all(Context::Global, &[plain(Char('k')), plain(Up)], Action::NavUp);
        self.bind_all(Context::Global, &[KeySpec::ctrl('d'), plain(PageDown)], Action::PageDown);
        self.bind_all(Context::Global, &[KeySpec::ctrl('u'), plain(PageUp)], Action::PageUp);
        self.bind(Context::Global, plain(Enter), Action::Select);
        self.bind(Context::Global, plain(Esc), Action::Back);

        // === Catalog view ===
        self.bind_all(Context::Catalog, &[plain(Char('l')), plain(Right)], Action::Select);
        self.bind_all(
            Context::Catalog,
            &[plain(Char('h')), plain(Left), plain(Backspace)],
            Action::Back,
        );
        self.bind(Context::Catalog, plain(Char('n')), Action::LoadMore);
        self.bind(Context::Catalog, plain(Char('f')), Action::Filter);
        self.bind(Context::Catalog, plain(Char('r')), Action::Refresh);

        // === Filter menu ===
        self.bind(Context::Filter, plain(Char('c')), Action::ClearFilter);
        self.bind(Context::Filter, plain(Char('f')), Action::Back);

        // === Publication detail ===
        self.bind(Context::Detail, plain(Char('o')), Action::Open);
    }

    /// Apply user overrides from config keybindings map.
    ///
    /// Keys in the map are action names (e.g., "quit", "load_more").
    /// Values are key strings (e.g., "q", "Ctrl+d", "F5").
    ///
    /// Returns a list of warnings for unrecognized action names or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        for (action_name, key_str) in overrides {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };

            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            // Re-bind in every context the action was bound in, with the new key only
            let mut contexts: Vec<Context> = Vec::new();
            for (ctx, _, a) in &self.bindings {
                if *a == action && !contexts.contains(ctx) {
                    contexts.push(*ctx);
                }
            }

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);

            for ctx in contexts {
                self.bind(ctx, key, action);
            }

            tracing::info!(
                action = %action_name,
                key = %key_str,
                "Applied keybinding override"
            );
        }

        warnings
    }

    /// Look up the action for a given key in a given context.
    ///
    /// Tries the specific context first, then falls back to Global.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        // Terminals report shifted characters as the uppercase char plus SHIFT
        let modifiers = match code {
            KeyCode::Char(_) => modifiers - KeyModifiers::SHIFT,
            _ => modifiers,
        };
        let key = KeySpec::new(code, modifiers);

        if let Some(&action) = self.lookup.get(&(context, key)) {
            return Some(action);
        }

        if context != Context::Global {
            return self.lookup.get(&(Context::Global, key)).copied();
        }

        None
    }

    /// All bindings for the help screen as (context, key, description).
    pub fn all_bindings(&self) -> Vec<(Context, String, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), action.describe()))
            .collect()
    }

    /// First key bound to `action` in `context` or Global, for status hints.
    pub fn key_hint(&self, action: Action, context: Context) -> Option<String> {
        self.bindings
            .iter()
            .find(|(c, _, a)| *a == action && *c == context)
            .or_else(|| {
                self.bindings
                    .iter()
                    .find(|(c, _, a)| *a == action && *c == Context::Global)
            })
            .map(|(_, key, _)| format_key(key))
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an action name string (from config) into an Action enum.
fn parse_action_name(name: &str) -> Option<Action> {
    match name.to_lowercase().as_str() {
        "quit" => Some(Action::Quit),
        "nav_down" | "navdown" | "down" => Some(Action::NavDown),
        "nav_up" | "navup" | "up" => Some(Action::NavUp),
        "page_down" | "pagedown" => Some(Action::PageDown),
        "page_up" | "pageup" => Some(Action::PageUp),
        "select" | "enter" => Some(Action::Select),
        "back" => Some(Action::Back),
        "load_more" | "loadmore" | "next_page" => Some(Action::LoadMore),
        "filter" | "facets" => Some(Action::Filter),
        "clear_filter" | "clearfilter" => Some(Action::ClearFilter),
        "open" | "download" => Some(Action::Open),
        "refresh" | "reload" => Some(Action::Refresh),
        "show_help" | "showhelp" | "help" => Some(Action::ShowHelp),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
