//! Contracts of the collaborators the routing core consumes.
//!
//! Network/cache access and screen construction are not part of the core.
//! They are reached through the traits here, all of which are object safe
//! and `!Send`-friendly: the core runs on the host's UI thread.
//!
//! Fetches return [`Emissions`], a stream that may yield a cached value
//! followed by a fresher network value. The resolver uses the first value and
//! drops the stream, so later emissions are never observed.

use crate::error::FetchError;
use crate::route::{CanvasContext, ContextRef, LtiTarget, ScreenIdentity, ScreenKind};
use futures::future;
use futures::stream::{self, LocalBoxStream, StreamExt};
use std::fmt;

/// Values emitted by a fetch, cache first then network.
pub type Emissions<T> = LocalBoxStream<'static, Result<T, FetchError>>;

/// A fetch that emits exactly one result.
pub fn emit_once<T: 'static>(result: Result<T, FetchError>) -> Emissions<T> {
    stream::once(future::ready(result)).boxed_local()
}

/// A fetch that emits a cached value and then a network value.
pub fn emit_cached_then_network<T: 'static>(
    cached: Result<T, FetchError>,
    network: Result<T, FetchError>,
) -> Emissions<T> {
    stream::iter([cached, network]).boxed_local()
}

// ============================================================================
// Entities
// ============================================================================

/// A named section of a course or group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tab {
    pub id: String,
    pub label: String,
    pub is_hidden: bool,
    pub is_locked: bool,
    pub is_external: bool,
}

impl Tab {
    /// Visible, unlocked, internal tab.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            is_hidden: false,
            is_locked: false,
            is_external: false,
        }
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    #[must_use]
    pub fn locked(mut self) -> Self {
        self.is_locked = true;
        self
    }

    #[must_use]
    pub fn external(mut self) -> Self {
        self.is_external = true;
        self
    }
}

/// One item of a learning module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleItem {
    pub id: u64,
    pub module_id: u64,
    pub title: String,
    pub position: u32,
}

/// Where a module item sits: the module(s) containing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleItemSequence {
    /// Entries for the requested item, one per module that contains it.
    pub items: Vec<ModuleItem>,
}

/// Composite result of module resolution: the current item and all of its
/// siblings, ordered by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProgression {
    pub module_id: u64,
    pub items: Vec<ModuleItem>,
    pub current_index: usize,
}

impl ModuleProgression {
    /// The item the route pointed at.
    pub fn current(&self) -> Option<&ModuleItem> {
        self.items.get(self.current_index)
    }
}

/// Quiz settings relevant to how it can be presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    pub id: u64,
    pub title: String,
    pub question_types: Vec<String>,
    pub has_access_code: bool,
    pub ip_filter: Option<String>,
    pub requires_lockdown_browser: bool,
    pub one_question_at_a_time: bool,
    pub cant_go_back: bool,
}

impl Quiz {
    /// Unrestricted quiz with the given question types.
    pub fn new(id: u64, title: impl Into<String>, question_types: &[&str]) -> Self {
        Self {
            id,
            title: title.into(),
            question_types: question_types.iter().map(|t| (*t).to_string()).collect(),
            has_access_code: false,
            ip_filter: None,
            requires_lockdown_browser: false,
            one_question_at_a_time: false,
            cant_go_back: false,
        }
    }
}

/// A resolved LTI launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LtiLaunch {
    pub url: String,
    pub name: Option<String>,
}

// ============================================================================
// Accessor traits
// ============================================================================

/// Fetches courses, groups and users.
pub trait ContextAccessor {
    fn fetch_context(&self, context: ContextRef, use_cache: bool) -> Emissions<CanvasContext>;
}

/// Fetches the tab list of a course or group.
pub trait TabAccessor {
    fn fetch_tabs(&self, context: &CanvasContext, use_cache: bool) -> Emissions<Vec<Tab>>;
}

/// Fetches module placement and module contents.
pub trait ModuleAccessor {
    /// Locate the module(s) containing an item.
    fn fetch_item_sequence(
        &self,
        context: &CanvasContext,
        module_item_id: u64,
        use_cache: bool,
    ) -> Emissions<ModuleItemSequence>;

    /// All items of a module.
    fn fetch_module_items(
        &self,
        context: &CanvasContext,
        module_id: u64,
        use_cache: bool,
    ) -> Emissions<Vec<ModuleItem>>;
}

/// Fetches quiz settings.
pub trait QuizAccessor {
    fn fetch_quiz(&self, context: &CanvasContext, quiz_id: u64, use_cache: bool)
        -> Emissions<Quiz>;
}

/// Resolves LTI launch urls. Launches are never served from cache.
pub trait LtiAccessor {
    fn fetch_launch(&self, context: &CanvasContext, target: &LtiTarget) -> Emissions<LtiLaunch>;
}

// ============================================================================
// Screen construction
// ============================================================================

/// A constructed screen, owned by the host once adopted.
pub trait ScreenInstance: fmt::Debug {
    fn kind(&self) -> ScreenKind;
}

/// Builds screens for identities; `None` means the screen is not supported.
pub trait ScreenFactory {
    fn create_screen(&self, identity: &ScreenIdentity) -> Option<Box<dyn ScreenInstance>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_cached_then_network_order() {
        let values: Vec<_> = pollster::block_on(
            emit_cached_then_network(Ok(1), Err(FetchError::NotFound)).collect::<Vec<_>>(),
        );
        assert_eq!(values, vec![Ok(1), Err(FetchError::NotFound)]);
    }

    #[test]
    fn test_module_progression_current() {
        let items = vec![
            ModuleItem {
                id: 10,
                module_id: 1,
                title: "Intro".into(),
                position: 1,
            },
            ModuleItem {
                id: 11,
                module_id: 1,
                title: "Reading".into(),
                position: 2,
            },
        ];
        let progression = ModuleProgression {
            module_id: 1,
            items,
            current_index: 1,
        };
        assert_eq!(progression.current().map(|i| i.id), Some(11));
    }

    #[test]
    fn test_tab_builders() {
        let tab = Tab::new("context_external_tool_4", "Tool").hidden().external();
        assert!(tab.is_hidden && tab.is_external && !tab.is_locked);
    }
}
