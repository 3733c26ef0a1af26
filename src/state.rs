//! Back stack state.
//!
//! [`NavigationStack`] is the history a host owns. Once the first frame is
//! pushed it never becomes empty through ordinary navigation: popping the
//! last frame is refused, because leaving the last screen means leaving the
//! application flow, which is the host's call.

use crate::arena::ScreenKey;
use crate::route::ScreenIdentity;
use std::fmt;

/// Structural role a screen takes in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Top-level screen (dashboard, course home, tab lists).
    Master,
    /// Screen pushed on top of a master.
    Detail,
    /// Overlay; a true modal on large hosts, a detail on small ones.
    Dialog,
    /// Modal utility screen (bookmarks and the like).
    Fullscreen,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Placement::Master => "master",
            Placement::Detail => "detail",
            Placement::Dialog => "dialog",
            Placement::Fullscreen => "fullscreen",
        };
        f.write_str(name)
    }
}

/// One entry in the back stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationFrame {
    pub screen_identity: ScreenIdentity,
    pub placement: Placement,
    pub backstack_tag: String,
    /// Screen instance adopted by the host for this frame, if any.
    pub screen_key: Option<ScreenKey>,
}

impl NavigationFrame {
    /// Frame tagged with the screen type name.
    pub fn new(screen_identity: ScreenIdentity, placement: Placement) -> Self {
        let backstack_tag = screen_identity.backstack_tag().to_string();
        Self {
            screen_identity,
            placement,
            backstack_tag,
            screen_key: None,
        }
    }
}

/// Ordered history of frames, bottom first.
#[derive(Debug, Clone, Default)]
pub struct NavigationStack {
    frames: Vec<NavigationFrame>,
}

impl NavigationStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame on top.
    pub fn push(&mut self, frame: NavigationFrame) {
        self.frames.push(frame);
    }

    /// Pop the top frame. Refuses to remove the last remaining frame.
    pub fn pop(&mut self) -> Option<NavigationFrame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Top frame, if any.
    pub fn top(&self) -> Option<&NavigationFrame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut NavigationFrame> {
        self.frames.last_mut()
    }

    /// Check if any frame has the given placement.
    pub fn contains_placement(&self, placement: Placement) -> bool {
        self.frames.iter().any(|f| f.placement == placement)
    }

    /// Frames bottom first.
    pub fn frames(&self) -> &[NavigationFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Check if popping would leave the flow.
    pub fn can_go_back(&self) -> bool {
        self.frames.len() > 1
    }

    /// Tags bottom first, handy for assertions and persistence.
    pub fn tags(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.backstack_tag.as_str()).collect()
    }

    /// Drop every frame. Only used on teardown.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
