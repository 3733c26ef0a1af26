//! Error handling for the routing core.
//!
//! Every failure that can happen between receiving a reference and mutating
//! the back stack is classified into one [`RoutingError`] kind before it
//! reaches the placement engine. The placement engine and the host never see
//! raw accessor failures.
//!
//! - [`RoutingError`]: the classified failure (parse failure, not found,
//!   locked, network, host state, cancelled).
//! - [`FetchError`]: what an accessor reports; converted at the resolver
//!   boundary.
//! - [`HostError`]: what a [`NavigationHost`](crate::host::NavigationHost)
//!   reports when it refuses a mutation.
//! - [`NavigationResult`]: the outcome of every navigator entry point.
//!
//! # Examples
//!
//! ```
//! use canvas_navigator::error::{NavigationResult, RoutingError};
//!
//! let result = NavigationResult::Navigated { tag: "AssignmentDetails".into(), frames_pushed: 2 };
//! assert!(result.is_navigated());
//!
//! let locked = RoutingError::LockedOrUnauthorized { tab: "files".into() };
//! assert!(locked.user_message().is_some());
//! assert!(RoutingError::Cancelled.user_message().is_none());
//! ```

use std::fmt;

// ============================================================================
// RoutingError
// ============================================================================

/// Classified routing failure.
///
/// Implements [`std::error::Error`] and [`Display`](std::fmt::Display).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// The reference is malformed or not recognised.
    ///
    /// Recovered locally: the navigator falls back to the landing screen.
    ParseFailure { reference: String },

    /// The course, group, tab or item no longer exists or is inaccessible.
    NotFound { what: String },

    /// The tab is locked or hidden and not in the always-linkable set.
    LockedOrUnauthorized { tab: String },

    /// Transient failure while fetching a required entity.
    NetworkError { message: String },

    /// The host refused a stack mutation because it is being torn down.
    HostStateError { message: String },

    /// The job was superseded or its host went away.
    Cancelled,
}

impl RoutingError {
    /// Text shown to the user through
    /// [`NavigationHost::show_message`](crate::host::NavigationHost::show_message).
    ///
    /// Returns `None` for kinds that are never surfaced.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => Some("The requested content could not be found."),
            Self::LockedOrUnauthorized { .. } => Some("This content is locked."),
            Self::NetworkError { .. } => {
                Some("Something went wrong loading this content. Please try again.")
            }
            Self::ParseFailure { .. } | Self::HostStateError { .. } | Self::Cancelled => None,
        }
    }

    /// Short kind name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ParseFailure { .. } => "ParseFailure",
            Self::NotFound { .. } => "NotFound",
            Self::LockedOrUnauthorized { .. } => "LockedOrUnauthorized",
            Self::NetworkError { .. } => "NetworkError",
            Self::HostStateError { .. } => "HostStateError",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::ParseFailure { reference } => {
                write!(f, "Could not parse reference: {}", reference)
            }
            RoutingError::NotFound { what } => write!(f, "Not found: {}", what),
            RoutingError::LockedOrUnauthorized { tab } => {
                write!(f, "Tab is locked or unauthorized: {}", tab)
            }
            RoutingError::NetworkError { message } => write!(f, "Network error: {}", message),
            RoutingError::HostStateError { message } => {
                write!(f, "Host rejected navigation: {}", message)
            }
            RoutingError::Cancelled => write!(f, "Navigation job cancelled"),
        }
    }
}

impl std::error::Error for RoutingError {}

// ============================================================================
// FetchError
// ============================================================================

/// Failure reported by an external accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Entity does not exist (null / 404).
    NotFound,
    /// Transport-level failure.
    Network(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NotFound => write!(f, "entity not found"),
            FetchError::Network(message) => write!(f, "network failure: {}", message),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Classify this failure for the entity described by `what`.
    pub fn classify(self, what: impl Into<String>) -> RoutingError {
        match self {
            FetchError::NotFound => RoutingError::NotFound { what: what.into() },
            FetchError::Network(message) => RoutingError::NetworkError { message },
        }
    }
}

// ============================================================================
// HostError
// ============================================================================

/// Failure reported by a host when asked to mutate its stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host is mid-teardown and its state can no longer be changed.
    StateLoss,
    /// The host refused for another reason.
    Rejected(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::StateLoss => write!(f, "host state already saved or torn down"),
            HostError::Rejected(reason) => write!(f, "host rejected mutation: {}", reason),
        }
    }
}

impl std::error::Error for HostError {}

impl From<HostError> for RoutingError {
    fn from(err: HostError) -> Self {
        RoutingError::HostStateError {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// NavigationResult
// ============================================================================

/// Outcome of a navigator entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationResult {
    /// Frames were pushed; `tag` is the back stack tag of the new top frame.
    Navigated { tag: String, frames_pushed: usize },
    /// Resolution is in flight; finish it with
    /// [`Navigator::complete`](crate::navigator::Navigator::complete).
    Pending,
    /// The reference was handed to a non-screen collaborator (file opener).
    Delegated,
    /// The reference could not be parsed; the landing screen was shown.
    FellBack,
    /// Dropped by the debounce window.
    Suppressed,
    /// A side-menu tap on the already visible screen closed the menu instead.
    MenuClosed,
    /// Hidden external tab; rejected without a message.
    Rejected,
    /// Classified failure; any user message has already been shown.
    Failed(RoutingError),
    /// Stale job result (superseded, cancelled, or host torn down).
    Discarded,
}

impl NavigationResult {
    /// Check if frames were pushed.
    pub fn is_navigated(&self) -> bool {
        matches!(self, NavigationResult::Navigated { .. })
    }

    /// Check if the result is still pending.
    pub fn is_pending(&self) -> bool {
        matches!(self, NavigationResult::Pending)
    }

    /// Check if navigation failed with a classified error.
    pub fn is_failed(&self) -> bool {
        matches!(self, NavigationResult::Failed(_))
    }

    /// Check if the stack is guaranteed untouched.
    pub fn left_stack_untouched(&self) -> bool {
        !matches!(
            self,
            NavigationResult::Navigated { .. }
                | NavigationResult::FellBack
                | NavigationResult::MenuClosed
        )
    }

    /// Get the error, if failed.
    pub fn error(&self) -> Option<&RoutingError> {
        match self {
            NavigationResult::Failed(err) => Some(err),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_result_navigated() {
        let result = NavigationResult::Navigated {
            tag: "Grades".to_string(),
            frames_pushed: 1,
        };
        assert!(result.is_navigated());
        assert!(!result.is_failed());
        assert!(!result.left_stack_untouched());
    }

    #[test]
    fn test_navigation_result_failed() {
        let result = NavigationResult::Failed(RoutingError::NotFound {
            what: "course 7".to_string(),
        });
        assert!(result.is_failed());
        assert!(result.left_stack_untouched());
        assert_eq!(result.error().map(RoutingError::kind), Some("NotFound"));
    }

    #[test]
    fn test_fetch_error_classification() {
        assert_eq!(
            FetchError::NotFound.classify("course 1"),
            RoutingError::NotFound {
                what: "course 1".to_string()
            }
        );
        assert_eq!(
            FetchError::Network("timeout".into()).classify("course 1"),
            RoutingError::NetworkError {
                message: "timeout".to_string()
            }
        );
    }

    #[test]
    fn test_silent_kinds_have_no_message() {
        assert!(RoutingError::ParseFailure {
            reference: "x".into()
        }
        .user_message()
        .is_none());
        assert!(RoutingError::HostStateError {
            message: "x".into()
        }
        .user_message()
        .is_none());
        assert!(RoutingError::NetworkError {
            message: "x".into()
        }
        .user_message()
        .is_some());
    }

    #[test]
    fn test_routing_error_display() {
        let error = RoutingError::NotFound {
            what: "course 12".to_string(),
        };
        assert_eq!(error.to_string(), "Not found: course 12");

        let error: RoutingError = HostError::StateLoss.into();
        assert_eq!(error.kind(), "HostStateError");
    }
}
