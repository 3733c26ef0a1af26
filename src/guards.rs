//! Tab gating and quiz presentation checks.
//!
//! Guards run synchronously, after resolution and before placement. They
//! decide whether a resolved screen may be shown at all.
//!
//! # Tab rules
//!
//! | Tab state            | Routable | Linkable | Outcome when routed to |
//! |----------------------|----------|----------|------------------------|
//! | visible, unlocked    | yes      | yes      | allowed |
//! | hidden + external    | no       | no*      | rejected, no message |
//! | locked               | no*      | no*      | "locked" message* |
//! | hidden (internal)    | yes      | no*      | allowed |
//!
//! `*` unless the tab is in the always-linkable set (People, Discussions,
//! Grades by default), whose content stays reachable regardless of the tab
//! state.
//!
//! File downloads and LTI launches bypass tab gating entirely.
//!
//! # Example
//!
//! ```
//! use canvas_navigator::{GateDecision, Tab, TabGate};
//!
//! let gate = TabGate::new();
//! assert!(gate.is_routable(&Tab::new("files", "Files")));
//! assert!(!gate.is_routable(&Tab::new("files", "Files").locked()));
//! assert!(gate.is_linkable(&Tab::new("grades", "Grades").locked().hidden()));
//!
//! let decision = gate.authorize(&Tab::new("context_external_tool_3", "Tool").hidden().external());
//! assert_eq!(decision, GateDecision::RejectSilently);
//! ```

use crate::accessor::{Quiz, Tab};
use crate::error::RoutingError;
use crate::route::{RouteDescriptor, RouteKind, ScreenKind};
use crate::{debug_log, trace_log};
use std::collections::BTreeSet;

/// Tabs that stay linkable while locked or hidden.
pub const ALWAYS_LINKABLE_TABS: [&str; 3] = ["people", "discussions", "grades"];

/// Question types the in-app quiz screen can render.
pub const NATIVE_QUESTION_TYPES: [&str; 8] = [
    "multiple_choice_question",
    "true_false_question",
    "short_answer_question",
    "essay_question",
    "multiple_answers_question",
    "matching_question",
    "numerical_question",
    "text_only_question",
];

/// Verdict of the tab gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Go ahead.
    Allow,
    /// Hidden external tab: drop the navigation without telling the user.
    RejectSilently,
    /// Locked or otherwise unavailable: tell the user.
    Deny(RoutingError),
}

impl GateDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// Decides whether a tab, and the screens under it, may be shown.
#[derive(Debug, Clone)]
pub struct TabGate {
    always_linkable: BTreeSet<String>,
}

impl TabGate {
    /// Gate with the default always-linkable set.
    pub fn new() -> Self {
        Self::with_always_linkable(ALWAYS_LINKABLE_TABS)
    }

    /// Gate with a custom always-linkable set.
    pub fn with_always_linkable<I, S>(tabs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            always_linkable: tabs.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if a tab stays reachable regardless of its lock/hidden state.
    pub fn is_always_linkable(&self, tab: &Tab) -> bool {
        self.always_linkable.contains(&tab.id)
    }

    /// A tab is routable unless it is both external and hidden, and not
    /// locked unless it is always linkable.
    pub fn is_routable(&self, tab: &Tab) -> bool {
        if tab.is_external && tab.is_hidden {
            return false;
        }
        !tab.is_locked || self.is_always_linkable(tab)
    }

    /// A tab is linkable when it is neither hidden nor locked, or always
    /// linkable.
    pub fn is_linkable(&self, tab: &Tab) -> bool {
        self.is_always_linkable(tab) || (!tab.is_hidden && !tab.is_locked)
    }

    /// Gate verdict for routing to a tab.
    pub fn authorize(&self, tab: &Tab) -> GateDecision {
        let decision = if tab.is_external && tab.is_hidden {
            GateDecision::RejectSilently
        } else if tab.is_locked && !self.is_always_linkable(tab) {
            GateDecision::Deny(RoutingError::LockedOrUnauthorized {
                tab: tab.id.clone(),
            })
        } else {
            GateDecision::Allow
        };
        debug_log!("Tab gate for '{}': {:?}", tab.id, decision);
        decision
    }

    /// Gate verdict for a resolved route. Routes without a resolved tab, and
    /// file download and LTI routes, are always allowed.
    pub fn authorize_route(&self, route: &RouteDescriptor, tab: Option<&Tab>) -> GateDecision {
        match route.kind() {
            RouteKind::FileDownload(_) | RouteKind::Lti(_) => {
                trace_log!("{} route bypasses tab gate", route.kind().name());
                GateDecision::Allow
            }
            _ => tab.map_or(GateDecision::Allow, |tab| self.authorize(tab)),
        }
    }

    /// Swap the generic quiz detail screen for the native quiz screen when
    /// the quiz qualifies. Any other target, including an already
    /// substituted one, is returned unchanged.
    pub fn substitute_quiz_target(&self, target: ScreenKind, quiz: Option<&Quiz>) -> ScreenKind {
        match (target, quiz) {
            (ScreenKind::QuizDetails, Some(quiz)) if is_native_quiz_eligible(quiz) => {
                debug_log!("Quiz {} qualifies for native presentation", quiz.id);
                ScreenKind::NativeQuiz
            }
            _ => target,
        }
    }
}

impl Default for TabGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if a quiz can be taken in the native quiz screen.
pub fn is_native_quiz_eligible(quiz: &Quiz) -> bool {
    if quiz.has_access_code || quiz.ip_filter.is_some() || quiz.requires_lockdown_browser {
        return false;
    }
    if quiz.one_question_at_a_time && quiz.cant_go_back {
        return false;
    }
    !quiz.question_types.is_empty()
        && quiz
            .question_types
            .iter()
            .all(|t| NATIVE_QUESTION_TYPES.contains(&t.as_str()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{QueryParams, RouteParams};
    use crate::route::{ContextRef, LtiTarget, ScreenTargets};

    fn route(kind: RouteKind) -> RouteDescriptor {
        RouteDescriptor::new(
            kind,
            RouteParams::new().with("courseId", "1"),
            QueryParams::new(),
            Some(ContextRef::Course(1)),
            "/courses/1",
        )
    }

    #[test]
    fn test_hidden_external_is_rejected_silently() {
        let gate = TabGate::new();
        let tab = Tab::new("context_external_tool_9", "Tool")
            .hidden()
            .external();
        assert!(!gate.is_routable(&tab));
        assert_eq!(gate.authorize(&tab), GateDecision::RejectSilently);
    }

    #[test]
    fn test_hidden_internal_is_routable_not_linkable() {
        let gate = TabGate::new();
        let tab = Tab::new("pages", "Pages").hidden();
        assert!(gate.is_routable(&tab));
        assert!(!gate.is_linkable(&tab));
        assert!(gate.authorize(&tab).is_allow());
    }

    #[test]
    fn test_locked_tab_is_denied() {
        let gate = TabGate::new();
        let tab = Tab::new("files", "Files").locked();
        assert_eq!(
            gate.authorize(&tab),
            GateDecision::Deny(RoutingError::LockedOrUnauthorized {
                tab: "files".to_string()
            })
        );
    }

    #[test]
    fn test_always_linkable_tabs_pass_when_locked() {
        let gate = TabGate::new();
        for id in ALWAYS_LINKABLE_TABS {
            let tab = Tab::new(id, id).locked().hidden();
            assert!(gate.is_routable(&tab), "{id} should stay routable");
            assert!(gate.is_linkable(&tab), "{id} should stay linkable");
            assert!(gate.authorize(&tab).is_allow());
        }
    }

    #[test]
    fn test_custom_always_linkable_set() {
        let gate = TabGate::with_always_linkable(["files"]);
        let files = Tab::new("files", "Files").locked();
        let grades = Tab::new("grades", "Grades").locked();
        assert!(gate.authorize(&files).is_allow());
        assert!(!gate.authorize(&grades).is_allow());
    }

    #[test]
    fn test_lti_and_downloads_bypass_gate() {
        let gate = TabGate::new();
        let hidden = Tab::new("context_external_tool_2", "Tool")
            .hidden()
            .external();
        let lti = route(RouteKind::Lti(LtiTarget {
            tool_id: Some(2),
            launch_url: None,
        }));
        assert!(gate.authorize_route(&lti, Some(&hidden)).is_allow());

        let files = ScreenTargets::master(ScreenKind::Files);
        let tabbed = route(RouteKind::for_targets(files));
        assert_eq!(
            gate.authorize_route(&tabbed, Some(&hidden)),
            GateDecision::RejectSilently
        );
        assert!(gate.authorize_route(&tabbed, None).is_allow());
    }

    #[test]
    fn test_quiz_substitution_is_idempotent() {
        let gate = TabGate::new();
        let quiz = Quiz::new(4, "Weekly", &["multiple_choice_question"]);

        let first = gate.substitute_quiz_target(ScreenKind::QuizDetails, Some(&quiz));
        assert_eq!(first, ScreenKind::NativeQuiz);
        let second = gate.substitute_quiz_target(first, Some(&quiz));
        assert_eq!(second, ScreenKind::NativeQuiz);
    }

    #[test]
    fn test_quiz_eligibility_rules() {
        let mut quiz = Quiz::new(1, "Q", &["essay_question", "true_false_question"]);
        assert!(is_native_quiz_eligible(&quiz));

        quiz.has_access_code = true;
        assert!(!is_native_quiz_eligible(&quiz));

        let mut quiz = Quiz::new(1, "Q", &["essay_question"]);
        quiz.one_question_at_a_time = true;
        assert!(is_native_quiz_eligible(&quiz));
        quiz.cant_go_back = true;
        assert!(!is_native_quiz_eligible(&quiz));

        let unsupported = Quiz::new(1, "Q", &["calculated_question"]);
        assert!(!is_native_quiz_eligible(&unsupported));
        assert!(!is_native_quiz_eligible(&Quiz::new(1, "Q", &[])));
    }

    #[test]
    fn test_ineligible_quiz_keeps_web_target() {
        let gate = TabGate::new();
        let mut quiz = Quiz::new(4, "Proctored", &["multiple_choice_question"]);
        quiz.requires_lockdown_browser = true;
        assert_eq!(
            gate.substitute_quiz_target(ScreenKind::QuizDetails, Some(&quiz)),
            ScreenKind::QuizDetails
        );
        assert_eq!(
            gate.substitute_quiz_target(ScreenKind::QuizDetails, None),
            ScreenKind::QuizDetails
        );
    }
}
