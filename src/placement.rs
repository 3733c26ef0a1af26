//! How a new screen composes with the existing back stack.
//!
//! The [`PlacementEngine`] never suspends. It is called synchronously once a
//! route has been resolved (or for a menu tap, right away) and turns one
//! request into zero, one or two host pushes:
//!
//! - `Master`: landing first if the stack is empty. A side-menu tap on the
//!   master already on top closes the menu instead of pushing.
//! - `Detail`: landing first if the stack has no master frame.
//! - `Dialog`: a detail on phones, a modal on tablets. Landing first if the
//!   stack is empty.
//! - `Fullscreen`: modal overlay, landing first if the stack is empty.
//!
//! Non-direct pushes (raw UI taps) arriving within the debounce window of
//! the previous push are dropped. Direct pushes always proceed.

use crate::host::NavigationHost;
use crate::route::{ScreenIdentity, ScreenKind};
use crate::state::{NavigationFrame, Placement};
use crate::{debug_log, error_log, trace_log};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Time source for the debounce window.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Remembers when the last push was initiated.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check if a push at `now` falls inside the window of the last one.
    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.last
            .is_some_and(|last| now.saturating_duration_since(last) < self.window)
    }

    /// Record a successfully initiated push.
    pub fn record(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

/// Where a placement request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOrigin {
    /// A tap in the persistent side menu or tab bar.
    Menu,
    /// The routing engine, after resolving a reference.
    Route,
}

/// Result of one placement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Frames were pushed; `landing` says whether a landing frame went first.
    Pushed { frames: usize, landing: bool },
    /// Dropped by the debounce window.
    Suppressed,
    /// The screen was already showing; the side menu was closed instead.
    MenuClosed,
    /// The host refused the mutation; logged and dropped.
    HostRejected,
}

impl PlacementOutcome {
    pub fn is_pushed(&self) -> bool {
        matches!(self, PlacementOutcome::Pushed { .. })
    }
}

/// Result of a back press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackOutcome {
    /// The open side menu intercepted back and closed.
    MenuClosed,
    /// The top frame was removed.
    Popped(NavigationFrame),
    /// Only one frame remained; the host left the flow.
    ExitedFlow,
    /// The host refused the mutation.
    HostRejected,
}

/// Placement state machine with its debounce window.
pub struct PlacementEngine {
    debouncer: Debouncer,
    clock: Rc<dyn Clock>,
    landing: ScreenKind,
}

impl PlacementEngine {
    /// Engine on the wall clock.
    pub fn new(window: Duration, landing: ScreenKind) -> Self {
        Self::with_clock(window, landing, Rc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, landing: ScreenKind, clock: Rc<dyn Clock>) -> Self {
        Self {
            debouncer: Debouncer::new(window),
            clock,
            landing,
        }
    }

    pub fn set_clock(&mut self, clock: Rc<dyn Clock>) {
        self.clock = clock;
    }

    pub fn landing_screen(&self) -> ScreenKind {
        self.landing
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Place one screen.
    pub fn place<H: NavigationHost + ?Sized>(
        &mut self,
        host: &mut H,
        identity: ScreenIdentity,
        placement: Placement,
        is_direct: bool,
        origin: PushOrigin,
    ) -> PlacementOutcome {
        let now = self.clock.now();
        if !is_direct && self.debouncer.is_suppressed(now) {
            debug_log!(
                "Suppressing {} push inside the {:?} debounce window",
                identity.kind,
                self.debouncer.window()
            );
            return PlacementOutcome::Suppressed;
        }

        if placement == Placement::Master
            && origin == PushOrigin::Menu
            && host.is_menu_open()
            && host.current_top_frame().is_some_and(|top| {
                top.placement == Placement::Master && top.screen_identity.kind == identity.kind
            })
        {
            debug_log!("{} already visible, closing the side menu", identity.kind);
            host.close_menu();
            return PlacementOutcome::MenuClosed;
        }

        let placement = match placement {
            Placement::Dialog if !host.form_factor().has_modal_dialogs() => Placement::Detail,
            other => other,
        };

        let needs_landing = match placement {
            Placement::Master => host.frame_count() == 0 && identity.kind != self.landing,
            Placement::Detail => !host
                .frames()
                .iter()
                .any(|frame| frame.placement == Placement::Master),
            Placement::Dialog | Placement::Fullscreen => host.frame_count() == 0,
        };

        let mut frames = 0;
        if needs_landing {
            trace_log!("Inserting {} landing frame", self.landing);
            if let Err(err) =
                host.push_frame(ScreenIdentity::new(self.landing), Placement::Master, true)
            {
                error_log!("Host rejected landing frame: {}", err);
                return PlacementOutcome::HostRejected;
            }
            frames += 1;
        }

        let kind = identity.kind;
        if let Err(err) = host.push_frame(identity, placement, is_direct) {
            error_log!("Host rejected {} frame: {}", kind, err);
            return PlacementOutcome::HostRejected;
        }
        frames += 1;

        self.debouncer.record(now);
        debug_log!("Placed {} as {} ({} frames)", kind, placement, frames);
        PlacementOutcome::Pushed {
            frames,
            landing: needs_landing,
        }
    }

    /// Handle a back press.
    pub fn navigate_back<H: NavigationHost + ?Sized>(&mut self, host: &mut H) -> BackOutcome {
        if host.is_menu_open() {
            host.close_menu();
            return BackOutcome::MenuClosed;
        }
        if host.frame_count() <= 1 {
            debug_log!("Back on the last frame, leaving the flow");
            host.exit_flow();
            return BackOutcome::ExitedFlow;
        }
        match host.pop_frame() {
            Ok(Some(frame)) => {
                trace_log!("Popped {}", frame.backstack_tag);
                BackOutcome::Popped(frame)
            }
            Ok(None) => {
                host.exit_flow();
                BackOutcome::ExitedFlow
            }
            Err(err) => {
                error_log!("Host rejected pop: {}", err);
                BackOutcome::HostRejected
            }
        }
    }
}

impl fmt::Debug for PlacementEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacementEngine")
            .field("debouncer", &self.debouncer)
            .field("landing", &self.landing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FormFactor, StackHost};
    use std::cell::Cell;

    struct StepClock {
        base: Instant,
        offset_ms: Cell<u64>,
    }

    impl StepClock {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                base: Instant::now(),
                offset_ms: Cell::new(0),
            })
        }

        fn advance(&self, ms: u64) {
            self.offset_ms.set(self.offset_ms.get() + ms);
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> Instant {
            self.base + Duration::from_millis(self.offset_ms.get())
        }
    }

    fn engine(clock: Rc<StepClock>) -> PlacementEngine {
        PlacementEngine::with_clock(Duration::from_millis(200), ScreenKind::Dashboard, clock)
    }

    fn screen(kind: ScreenKind) -> ScreenIdentity {
        ScreenIdentity::new(kind)
    }

    /// Menu taps are raw, route pushes are direct.
    fn master(
        engine: &mut PlacementEngine,
        host: &mut StackHost,
        kind: ScreenKind,
        is_direct: bool,
    ) -> PlacementOutcome {
        let origin = if is_direct {
            PushOrigin::Route
        } else {
            PushOrigin::Menu
        };
        engine.place(host, screen(kind), Placement::Master, is_direct, origin)
    }

    fn top_placement(host: &StackHost) -> Option<Placement> {
        host.current_top_frame().map(|frame| frame.placement)
    }

    #[test]
    fn test_detail_on_empty_stack_gets_landing() {
        let mut host = StackHost::new();
        let mut engine = engine(StepClock::new());
        let outcome = engine.place(
            &mut host,
            screen(ScreenKind::AssignmentDetails),
            Placement::Detail,
            true,
            PushOrigin::Route,
        );
        assert_eq!(
            outcome,
            PlacementOutcome::Pushed {
                frames: 2,
                landing: true
            }
        );
        assert_eq!(host.tags(), vec!["Dashboard", "AssignmentDetails"]);
    }

    #[test]
    fn test_landing_not_doubled() {
        let mut host = StackHost::new();
        let mut engine = engine(StepClock::new());
        engine.place(
            &mut host,
            screen(ScreenKind::Dashboard),
            Placement::Master,
            true,
            PushOrigin::Route,
        );
        assert_eq!(host.tags(), vec!["Dashboard"]);
    }

    #[test]
    fn test_non_direct_debounce() {
        let clock = StepClock::new();
        let mut host = StackHost::new();
        let mut engine = engine(clock.clone());
        master(&mut engine, &mut host, ScreenKind::Dashboard, true);

        clock.advance(300);
        assert!(master(&mut engine, &mut host, ScreenKind::Grades, false).is_pushed());
        clock.advance(50);
        let repeated = master(&mut engine, &mut host, ScreenKind::Grades, false);
        assert_eq!(repeated, PlacementOutcome::Suppressed);
        clock.advance(10);
        assert!(master(&mut engine, &mut host, ScreenKind::People, true).is_pushed());

        clock.advance(200);
        assert!(master(&mut engine, &mut host, ScreenKind::Files, false).is_pushed());
        let expected = vec!["Dashboard", "Grades", "People", "Files"];
        assert_eq!(host.tags(), expected);
    }

    #[test]
    fn test_menu_tap_on_visible_screen_closes_menu() {
        let clock = StepClock::new();
        let mut host = StackHost::new();
        let mut engine = engine(clock.clone());
        master(&mut engine, &mut host, ScreenKind::Dashboard, true);
        host.set_menu_open(true);
        clock.advance(500);

        let outcome = engine.place(
            &mut host,
            screen(ScreenKind::Dashboard),
            Placement::Master,
            false,
            PushOrigin::Menu,
        );
        assert_eq!(outcome, PlacementOutcome::MenuClosed);
        assert!(!host.is_menu_open());
        assert_eq!(host.frame_count(), 1);
    }

    #[test]
    fn test_dialog_depends_on_form_factor() {
        let mut phone = StackHost::new();
        let mut engine = engine(StepClock::new());
        engine.place(
            &mut phone,
            screen(ScreenKind::NotificationPreferences),
            Placement::Dialog,
            true,
            PushOrigin::Route,
        );
        assert_eq!(phone.tags(), vec!["Dashboard", "NotificationPreferences"]);
        assert_eq!(top_placement(&phone), Some(Placement::Detail));

        let mut tablet = StackHost::with_form_factor(FormFactor::Tablet);
        engine.place(
            &mut tablet,
            screen(ScreenKind::NotificationPreferences),
            Placement::Dialog,
            true,
            PushOrigin::Route,
        );
        assert_eq!(top_placement(&tablet), Some(Placement::Dialog));
        assert_eq!(tablet.frame_count(), 2);
    }

    #[test]
    fn test_back_navigation() {
        let mut host = StackHost::new();
        let mut engine = engine(StepClock::new());
        engine.place(
            &mut host,
            screen(ScreenKind::Grades),
            Placement::Detail,
            true,
            PushOrigin::Route,
        );

        host.set_menu_open(true);
        assert_eq!(engine.navigate_back(&mut host), BackOutcome::MenuClosed);
        assert_eq!(host.frame_count(), 2);

        let popped = engine.navigate_back(&mut host);
        assert!(matches!(popped, BackOutcome::Popped(_)));
        assert_eq!(engine.navigate_back(&mut host), BackOutcome::ExitedFlow);
        assert!(host.has_exited());
        assert_eq!(host.tags(), vec!["Dashboard"]);
    }

    #[test]
    fn test_host_rejection_is_swallowed() {
        let mut host = StackHost::new();
        host.teardown();
        let mut engine = engine(StepClock::new());
        let outcome = engine.place(
            &mut host,
            screen(ScreenKind::Grades),
            Placement::Master,
            true,
            PushOrigin::Route,
        );
        assert_eq!(outcome, PlacementOutcome::HostRejected);
        assert_eq!(host.frame_count(), 0);
    }
}
