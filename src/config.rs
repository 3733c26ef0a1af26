//! Navigator configuration.
//!
//! ```
//! use canvas_navigator::config::NavigatorConfig;
//! use canvas_navigator::route::ScreenKind;
//! use std::time::Duration;
//!
//! let config = NavigatorConfig::new()
//!     .with_domain("school.example.com")
//!     .with_debounce_window(Duration::from_millis(300))
//!     .with_landing_screen(ScreenKind::Dashboard);
//!
//! assert_eq!(config.debounce_window(), Duration::from_millis(300));
//! assert_eq!(config.domain(), Some("school.example.com"));
//! ```

use crate::guards::ALWAYS_LINKABLE_TABS;
use crate::route::ScreenKind;
use std::time::Duration;

/// Window during which a second non-direct push is dropped.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// Knobs of a [`Navigator`](crate::navigator::Navigator).
#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    debounce_window: Duration,
    landing_screen: ScreenKind,
    domain: Option<String>,
    always_linkable_tabs: Vec<String>,
    prefer_cache: bool,
    cache_capacity: usize,
}

impl NavigatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debounce window for non-direct pushes.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Screen pushed beneath the first frame and used as parse fallback.
    pub fn with_landing_screen(mut self, kind: ScreenKind) -> Self {
        self.landing_screen = kind;
        self
    }

    /// Only route absolute references pointing at this host.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Replace the set of tabs reachable while locked or hidden.
    pub fn with_always_linkable_tabs<I, S>(mut self, tabs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.always_linkable_tabs = tabs.into_iter().map(Into::into).collect();
        self
    }

    /// Let accessors answer from cache before the network.
    pub fn with_prefer_cache(mut self, prefer: bool) -> Self {
        self.prefer_cache = prefer;
        self
    }

    /// Number of parse results memoised.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn debounce_window(&self) -> Duration {
        self.debounce_window
    }

    pub fn landing_screen(&self) -> ScreenKind {
        self.landing_screen
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn always_linkable_tabs(&self) -> &[String] {
        &self.always_linkable_tabs
    }

    pub fn prefer_cache(&self) -> bool {
        self.prefer_cache
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            landing_screen: ScreenKind::Dashboard,
            domain: None,
            always_linkable_tabs: ALWAYS_LINKABLE_TABS.iter().map(|t| (*t).to_string()).collect(),
            prefer_cache: true,
            cache_capacity: 256,
        }
    }
}
