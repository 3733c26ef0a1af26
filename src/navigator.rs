//! Routing entry points.
//!
//! [`Navigator`] ties the pieces together for one host: it parses
//! references, runs resolution jobs, applies the tab gate and places
//! screens. It owns its host, so everything it does is scoped to that host
//! and torn down with it.
//!
//! # Flow
//!
//! ```text
//! reference ─► parse ─┬─ none ──────────────► landing screen (FellBack)
//!                     ├─ file download ─────► host.open_file (Delegated)
//!                     ├─ notification prefs ► dialog (Navigated)
//!                     └─ anything else ─────► job + NavigationTask (Pending)
//!
//! task.resolve().await ─► complete ─► stale? ─► Discarded
//!                                     failed? ► message, Failed
//!                                     gate ───► Rejected / Failed
//!                                     place ──► Navigated
//! ```
//!
//! Resolution futures own their inputs, so a caller may start another
//! navigation while one is pending. Only the most recent job of each
//! category is ever applied.
//!
//! # Example
//!
//! ```ignore
//! let mut navigator = Navigator::new(StackHost::new(), accessors, factory);
//! let outcome = navigator.route_from_external_reference("/courses/1/grades");
//! if let Some(task) = outcome.task {
//!     let completion = task.resolve().await;
//!     navigator.complete(completion);
//! }
//! ```

use crate::accessor::{ScreenFactory, ScreenInstance};
use crate::config::NavigatorConfig;
use crate::error::{NavigationResult, RoutingError};
use crate::guards::{GateDecision, TabGate};
use crate::host::NavigationHost;
use crate::jobs::{JobRegistry, JobTicket};
use crate::parser::RouteParser;
use crate::placement::{BackOutcome, Clock, PlacementEngine, PlacementOutcome, PushOrigin};
use crate::resolver::{category_for, Accessors, ContextResolver, ResolvedContext};
use crate::route::{RouteDescriptor, RouteKind, ScreenIdentity, ScreenKind};
use crate::state::Placement;
use crate::{debug_log, info_log, trace_log, warn_log};
use futures::future::LocalBoxFuture;
use std::fmt;
use std::rc::Rc;

/// A pending resolution, handed to the caller to drive.
pub struct NavigationTask {
    ticket: JobTicket,
    route: RouteDescriptor,
    future: LocalBoxFuture<'static, Result<ResolvedContext, RoutingError>>,
}

impl NavigationTask {
    pub fn ticket(&self) -> &JobTicket {
        &self.ticket
    }

    pub fn route(&self) -> &RouteDescriptor {
        &self.route
    }

    /// Cancel the job. Its completion will be discarded.
    pub fn cancel(&self) {
        self.ticket.cancel();
    }

    /// Run resolution to the end. Pass the result to
    /// [`Navigator::complete`].
    pub async fn resolve(self) -> Completion {
        let outcome = self.future.await;
        Completion {
            ticket: self.ticket,
            route: self.route,
            outcome,
        }
    }
}

impl fmt::Debug for NavigationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationTask")
            .field("ticket", &self.ticket)
            .field("route", &self.route.original_url())
            .finish_non_exhaustive()
    }
}

/// A finished resolution, not yet applied.
#[derive(Debug)]
pub struct Completion {
    ticket: JobTicket,
    route: RouteDescriptor,
    outcome: Result<ResolvedContext, RoutingError>,
}

impl Completion {
    pub fn ticket(&self) -> &JobTicket {
        &self.ticket
    }

    pub fn outcome(&self) -> &Result<ResolvedContext, RoutingError> {
        &self.outcome
    }
}

/// What an external reference turned into.
#[derive(Debug)]
pub struct RouteOutcome {
    /// [`NavigationResult::Pending`] exactly when `task` is set.
    pub result: NavigationResult,
    pub task: Option<NavigationTask>,
}

impl RouteOutcome {
    fn done(result: NavigationResult) -> Self {
        Self { result, task: None }
    }
}

/// Deep-link router and screen placer for one host.
pub struct Navigator<H: NavigationHost> {
    host: H,
    parser: RouteParser,
    resolver: ContextResolver,
    jobs: JobRegistry,
    gate: TabGate,
    engine: PlacementEngine,
    factory: Rc<dyn ScreenFactory>,
    config: NavigatorConfig,
    last_successful: Option<RouteDescriptor>,
    torn_down: bool,
}

impl<H: NavigationHost> Navigator<H> {
    /// Navigator with the default configuration.
    pub fn new(host: H, accessors: Accessors, factory: Rc<dyn ScreenFactory>) -> Self {
        Self::with_config(host, accessors, factory, NavigatorConfig::default())
    }

    pub fn with_config(
        host: H,
        accessors: Accessors,
        factory: Rc<dyn ScreenFactory>,
        config: NavigatorConfig,
    ) -> Self {
        let mut parser = RouteParser::new();
        #[cfg(feature = "cache")]
        {
            parser = parser.with_cache_capacity(config.cache_capacity());
        }
        if let Some(domain) = config.domain() {
            parser.set_domain(Some(domain.to_string()));
        }

        Self {
            host,
            parser,
            resolver: ContextResolver::new(accessors).with_cache(config.prefer_cache()),
            jobs: JobRegistry::new(),
            gate: TabGate::with_always_linkable(config.always_linkable_tabs().iter().cloned()),
            engine: PlacementEngine::new(config.debounce_window(), config.landing_screen()),
            factory,
            config,
            last_successful: None,
            torn_down: false,
        }
    }

    /// Replace the debounce clock.
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.engine.set_clock(clock);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn parser(&self) -> &RouteParser {
        &self.parser
    }

    pub fn gate(&self) -> &TabGate {
        &self.gate
    }

    /// Number of resolution jobs in flight.
    pub fn pending_jobs(&self) -> usize {
        self.jobs.active_count()
    }

    /// The last route that reached the stack, for persisting across
    /// process death.
    pub fn last_successful_route(&self) -> Option<&RouteDescriptor> {
        self.last_successful.as_ref()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Route a bookmark, push notification payload or clicked link.
    ///
    /// The host's current top frame scopes context-relative references.
    pub fn route_from_external_reference(&mut self, reference: &str) -> RouteOutcome {
        if self.torn_down {
            warn_log!("Ignoring '{}' on a torn down navigator", reference);
            return RouteOutcome::done(NavigationResult::Discarded);
        }
        info_log!("Routing external reference '{}'", reference);

        let known_context = self
            .host
            .current_top_frame()
            .and_then(|frame| frame.screen_identity.context);
        match self.parser.parse_memoized(reference, known_context) {
            Some(route) => self.dispatch(route),
            None => RouteOutcome::done(self.fall_back()),
        }
    }

    /// Re-issue a persisted route.
    pub fn restore(&mut self, route: RouteDescriptor) -> RouteOutcome {
        if self.torn_down {
            return RouteOutcome::done(NavigationResult::Discarded);
        }
        info_log!("Restoring route '{}'", route.original_url());
        self.dispatch(route)
    }

    /// Re-issue the last successful route, if any.
    pub fn restore_last(&mut self) -> Option<RouteOutcome> {
        let route = self.last_successful.clone()?;
        Some(self.restore(route))
    }

    /// Route a reference and drive its resolution to the end.
    pub async fn navigate(&mut self, reference: &str) -> NavigationResult {
        let outcome = self.route_from_external_reference(reference);
        match outcome.task {
            Some(task) => {
                let completion = task.resolve().await;
                self.complete(completion)
            }
            None => outcome.result,
        }
    }

    fn dispatch(&mut self, route: RouteDescriptor) -> RouteOutcome {
        match route.kind() {
            RouteKind::FileDownload(download) => {
                debug_log!("Delegating file download '{}'", download.url);
                self.host.open_file(download);
                RouteOutcome::done(NavigationResult::Delegated)
            }
            RouteKind::NotificationPreferences => {
                let identity = ScreenIdentity::new(ScreenKind::NotificationPreferences);
                let result = match self.show_screens(vec![(identity, Placement::Dialog)]) {
                    Ok(frames_pushed) => self.navigated(route, frames_pushed),
                    Err(err) => self.fail(err),
                };
                RouteOutcome::done(result)
            }
            _ => {
                let ticket = self.jobs.begin(category_for(&route));
                let future = self.resolver.resolve(route.clone(), ticket.token().clone());
                RouteOutcome {
                    result: NavigationResult::Pending,
                    task: Some(NavigationTask {
                        ticket,
                        route,
                        future,
                    }),
                }
            }
        }
    }

    /// Apply a finished resolution.
    ///
    /// Results of superseded or cancelled jobs, and anything arriving after
    /// teardown, are discarded without touching the host.
    pub fn complete(&mut self, completion: Completion) -> NavigationResult {
        let Completion {
            ticket,
            route,
            outcome,
        } = completion;

        if self.torn_down || !self.jobs.is_current(&ticket) {
            debug_log!(
                "Discarding stale job {} ({}) for '{}'",
                ticket.id(),
                ticket.category(),
                route.original_url()
            );
            self.jobs.finish(&ticket);
            return NavigationResult::Discarded;
        }
        self.jobs.finish(&ticket);

        let resolved = match outcome {
            Ok(resolved) => resolved,
            Err(RoutingError::Cancelled) => return NavigationResult::Discarded,
            Err(err) => return self.fail(err),
        };

        match self
            .gate
            .authorize_route(&resolved.route, resolved.tab.as_ref())
        {
            GateDecision::Allow => {}
            GateDecision::RejectSilently => {
                debug_log!("Route '{}' rejected by tab gate", route.original_url());
                return NavigationResult::Rejected;
            }
            GateDecision::Deny(err) => return self.fail(err),
        }

        let steps = self.screen_steps(&resolved);
        match self.show_screens(steps) {
            Ok(frames_pushed) => self.navigated(route, frames_pushed),
            Err(err) => self.fail(err),
        }
    }

    /// Route an in-app menu or tab tap.
    ///
    /// Raw taps (`is_direct == false`) are subject to the debounce window.
    pub fn route_from_menu_action(
        &mut self,
        identity: ScreenIdentity,
        is_direct: bool,
    ) -> NavigationResult {
        if self.torn_down {
            return NavigationResult::Discarded;
        }
        trace_log!("Menu action for {} (direct: {})", identity.kind, is_direct);

        if let Some(tab) = &identity.tab {
            match self.gate.authorize(tab) {
                GateDecision::Allow => {}
                GateDecision::RejectSilently => return NavigationResult::Rejected,
                GateDecision::Deny(err) => return self.fail(err),
            }
        }

        let Some(screen) = self.factory.create_screen(&identity) else {
            return self.fail(unsupported(identity.kind));
        };
        let placement = identity.kind.default_placement();
        let kind = identity.kind;
        match self.engine.place(
            &mut self.host,
            identity,
            placement,
            is_direct,
            PushOrigin::Menu,
        ) {
            PlacementOutcome::Pushed { frames, .. } => {
                self.host.adopt_screen(screen);
                NavigationResult::Navigated {
                    tag: self.top_tag(),
                    frames_pushed: frames,
                }
            }
            PlacementOutcome::Suppressed => NavigationResult::Suppressed,
            PlacementOutcome::MenuClosed => NavigationResult::MenuClosed,
            PlacementOutcome::HostRejected => self.fail(host_rejected(kind)),
        }
    }

    /// Handle a back press.
    pub fn navigate_back(&mut self) -> BackOutcome {
        self.engine.navigate_back(&mut self.host)
    }

    /// Cancel every pending job and release the host. Later completions are
    /// discarded and later entry points do nothing.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        let cancelled = self.jobs.cancel_all();
        info_log!("Navigator torn down, {} pending jobs cancelled", cancelled);
        self.torn_down = true;
        self.host.teardown();
    }

    fn fall_back(&mut self) -> NavigationResult {
        let landing = self.engine.landing_screen();
        let already_there = self
            .host
            .current_top_frame()
            .is_some_and(|frame| frame.screen_identity.kind == landing);
        if already_there {
            return NavigationResult::FellBack;
        }
        match self.show_screens(vec![(ScreenIdentity::new(landing), Placement::Master)]) {
            Ok(_) => NavigationResult::FellBack,
            Err(err) => self.fail(err),
        }
    }

    /// Screens to push for a resolved route, bottom first.
    fn screen_steps(&self, resolved: &ResolvedContext) -> Vec<(ScreenIdentity, Placement)> {
        let route = &resolved.route;
        match route.kind() {
            RouteKind::Lti(_) => {
                let mut identity = route.screen_identity(ScreenKind::LtiLaunch);
                if let Some(launch) = &resolved.lti {
                    identity.params.insert("url", launch.url.clone());
                }
                vec![(identity, Placement::Detail)]
            }
            RouteKind::NotificationPreferences => vec![(
                ScreenIdentity::new(ScreenKind::NotificationPreferences),
                Placement::Dialog,
            )],
            RouteKind::FileDownload(_) => Vec::new(),
            RouteKind::ContentTab(targets) | RouteKind::Generic(targets) => {
                let mut steps = Vec::with_capacity(2);

                let master_showing = self.host.current_top_frame().is_some_and(|frame| {
                    frame.screen_identity.kind == targets.master
                        && frame.screen_identity.context == route.context()
                });
                if targets.detail.is_none() || !master_showing {
                    let mut master = route.screen_identity(targets.master);
                    if let Some(tab) = &resolved.tab {
                        master = master.from_tab(tab.clone());
                    }
                    steps.push((master, targets.master.default_placement()));
                }

                if let Some(detail) = targets.detail {
                    let detail = self
                        .gate
                        .substitute_quiz_target(detail, resolved.quiz.as_ref());
                    let mut identity = route.screen_identity(detail);
                    if let (ScreenKind::ModuleProgression, Some(modules)) =
                        (detail, &resolved.modules)
                    {
                        identity.params.insert("moduleId", modules.module_id.to_string());
                        if let Some(item) = modules.current() {
                            identity.params.insert("moduleItemId", item.id.to_string());
                        }
                    }
                    steps.push((identity, detail.default_placement()));
                }
                steps
            }
        }
    }

    /// Build every screen first, then push them as direct pushes.
    fn show_screens(
        &mut self,
        steps: Vec<(ScreenIdentity, Placement)>,
    ) -> Result<usize, RoutingError> {
        let mut built: Vec<(ScreenIdentity, Placement, Box<dyn ScreenInstance>)> =
            Vec::with_capacity(steps.len());
        for (identity, placement) in steps {
            let screen = self
                .factory
                .create_screen(&identity)
                .ok_or_else(|| unsupported(identity.kind))?;
            built.push((identity, placement, screen));
        }

        let mut pushed = 0;
        for (identity, placement, screen) in built {
            let kind = identity.kind;
            match self.engine.place(
                &mut self.host,
                identity,
                placement,
                true,
                PushOrigin::Route,
            ) {
                PlacementOutcome::Pushed { frames, .. } => {
                    pushed += frames;
                    self.host.adopt_screen(screen);
                }
                PlacementOutcome::HostRejected => return Err(host_rejected(kind)),
                PlacementOutcome::Suppressed | PlacementOutcome::MenuClosed => {
                    trace_log!("{} placement skipped", kind);
                }
            }
        }
        Ok(pushed)
    }

    fn navigated(&mut self, route: RouteDescriptor, frames_pushed: usize) -> NavigationResult {
        let tag = self.top_tag();
        info_log!("Navigated to {} ({} frames)", tag, frames_pushed);
        self.last_successful = Some(route);
        NavigationResult::Navigated { tag, frames_pushed }
    }

    /// Surface a classified failure; kinds without a user message are only
    /// logged.
    fn fail(&mut self, err: RoutingError) -> NavigationResult {
        match err.user_message() {
            Some(message) => {
                warn_log!("Navigation failed: {}", err);
                self.host.show_message(message);
            }
            None => {
                debug_log!("Navigation failed silently: {}", err);
            }
        }
        NavigationResult::Failed(err)
    }

    fn top_tag(&self) -> String {
        self.host
            .current_top_frame()
            .map(|frame| frame.backstack_tag.clone())
            .unwrap_or_default()
    }
}

fn unsupported(kind: ScreenKind) -> RoutingError {
    RoutingError::NotFound {
        what: format!("{} screen", kind),
    }
}

fn host_rejected(kind: ScreenKind) -> RoutingError {
    RoutingError::HostStateError {
        message: format!("{} frame was not pushed", kind),
    }
}

impl<H: NavigationHost + fmt::Debug> fmt::Debug for Navigator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("host", &self.host)
            .field("parser", &self.parser)
            .field("jobs", &self.jobs)
            .field("engine", &self.engine)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}
