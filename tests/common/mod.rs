//! Test utilities for navigation tests
//!
//! Provides an in-memory backend implementing every accessor, a screen
//! factory, a manual clock and navigator fixtures.

#![allow(dead_code)]

use canvas_navigator::accessor::{emit_cached_then_network, emit_once};
use canvas_navigator::*;
use futures::channel::oneshot;
use futures::{FutureExt, StreamExt};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Tab ids every fixture course starts with.
pub const DEFAULT_TABS: [&str; 10] = [
    "assignments",
    "syllabus",
    "discussions",
    "announcements",
    "files",
    "grades",
    "people",
    "pages",
    "quizzes",
    "modules",
];

pub fn course(id: u64, name: &str) -> CanvasContext {
    CanvasContext::Course {
        id,
        name: name.to_string(),
        course_code: None,
    }
}

pub fn group(id: u64, name: &str) -> CanvasContext {
    CanvasContext::Group {
        id,
        name: name.to_string(),
    }
}

pub fn default_tabs() -> Vec<Tab> {
    DEFAULT_TABS.iter().map(|id| Tab::new(*id, *id)).collect()
}

pub fn module_item(id: u64, module_id: u64, position: u32) -> ModuleItem {
    ModuleItem {
        id,
        module_id,
        title: format!("Item {}", id),
        position,
    }
}

type ContextResult = Result<CanvasContext, FetchError>;

/// In-memory accessor backend.
///
/// Contexts answer immediately unless a fetch was held with
/// [`FakeBackend::hold_context`], in which case the fetch only completes
/// when the returned sender fires.
#[derive(Default)]
pub struct FakeBackend {
    contexts: RefCell<HashMap<ContextRef, ContextResult>>,
    cached: RefCell<HashMap<ContextRef, CanvasContext>>,
    held: RefCell<HashMap<ContextRef, VecDeque<oneshot::Receiver<ContextResult>>>>,
    tabs: RefCell<HashMap<ContextRef, Vec<Tab>>>,
    quizzes: RefCell<HashMap<u64, Quiz>>,
    modules: RefCell<HashMap<u64, Vec<ModuleItem>>>,
    launch: RefCell<Option<LtiLaunch>>,
    context_fetches: Cell<usize>,
}

impl FakeBackend {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Register a course with the default tab list.
    pub fn add_course(&self, id: u64, name: &str) {
        let context = ContextRef::Course(id);
        self.contexts.borrow_mut().insert(context, Ok(course(id, name)));
        self.tabs.borrow_mut().insert(context, default_tabs());
    }

    pub fn add_group(&self, id: u64, name: &str) {
        let context = ContextRef::Group(id);
        self.contexts.borrow_mut().insert(context, Ok(group(id, name)));
        self.tabs.borrow_mut().insert(context, default_tabs());
    }

    pub fn set_tabs(&self, context: ContextRef, tabs: Vec<Tab>) {
        self.tabs.borrow_mut().insert(context, tabs);
    }

    /// Replace one tab of a context's tab list.
    pub fn replace_tab(&self, context: ContextRef, tab: Tab) {
        let mut tabs = self.tabs.borrow_mut();
        let list = tabs.entry(context).or_default();
        list.retain(|t| t.id != tab.id);
        list.push(tab);
    }

    pub fn fail_context(&self, context: ContextRef, err: FetchError) {
        self.contexts.borrow_mut().insert(context, Err(err));
    }

    /// Emit `stale` from cache before the registered network value.
    pub fn cache_context(&self, context: ContextRef, stale: CanvasContext) {
        self.cached.borrow_mut().insert(context, stale);
    }

    /// Hold the next fetch of `context` until the sender fires.
    pub fn hold_context(&self, context: ContextRef) -> oneshot::Sender<ContextResult> {
        let (tx, rx) = oneshot::channel();
        self.held
            .borrow_mut()
            .entry(context)
            .or_default()
            .push_back(rx);
        tx
    }

    pub fn add_quiz(&self, quiz: Quiz) {
        self.quizzes.borrow_mut().insert(quiz.id, quiz);
    }

    pub fn add_module(&self, module_id: u64, items: Vec<ModuleItem>) {
        self.modules.borrow_mut().insert(module_id, items);
    }

    pub fn set_launch(&self, launch: LtiLaunch) {
        *self.launch.borrow_mut() = Some(launch);
    }

    pub fn context_fetches(&self) -> usize {
        self.context_fetches.get()
    }
}

impl ContextAccessor for FakeBackend {
    fn fetch_context(&self, context: ContextRef, use_cache: bool) -> Emissions<CanvasContext> {
        self.context_fetches.set(self.context_fetches.get() + 1);

        let held = self
            .held
            .borrow_mut()
            .get_mut(&context)
            .and_then(VecDeque::pop_front);
        if let Some(rx) = held {
            return rx
                .map(|sent| sent.unwrap_or_else(|_| Err(FetchError::Network("dropped".into()))))
                .into_stream()
                .boxed_local();
        }

        let network = self
            .contexts
            .borrow()
            .get(&context)
            .cloned()
            .unwrap_or(Err(FetchError::NotFound));
        match self.cached.borrow().get(&context) {
            Some(stale) if use_cache => emit_cached_then_network(Ok(stale.clone()), network),
            _ => emit_once(network),
        }
    }
}

impl TabAccessor for FakeBackend {
    fn fetch_tabs(&self, context: &CanvasContext, _use_cache: bool) -> Emissions<Vec<Tab>> {
        let tabs = self
            .tabs
            .borrow()
            .get(&context.context_ref())
            .cloned()
            .ok_or(FetchError::NotFound);
        emit_once(tabs)
    }
}

impl ModuleAccessor for FakeBackend {
    fn fetch_item_sequence(
        &self,
        _context: &CanvasContext,
        module_item_id: u64,
        _use_cache: bool,
    ) -> Emissions<ModuleItemSequence> {
        let items: Vec<ModuleItem> = self
            .modules
            .borrow()
            .values()
            .flatten()
            .filter(|item| item.id == module_item_id)
            .cloned()
            .collect();
        if items.is_empty() {
            emit_once(Err(FetchError::NotFound))
        } else {
            emit_once(Ok(ModuleItemSequence { items }))
        }
    }

    fn fetch_module_items(
        &self,
        _context: &CanvasContext,
        module_id: u64,
        _use_cache: bool,
    ) -> Emissions<Vec<ModuleItem>> {
        let items = self
            .modules
            .borrow()
            .get(&module_id)
            .cloned()
            .ok_or(FetchError::NotFound);
        emit_once(items)
    }
}

impl QuizAccessor for FakeBackend {
    fn fetch_quiz(
        &self,
        _context: &CanvasContext,
        quiz_id: u64,
        _use_cache: bool,
    ) -> Emissions<Quiz> {
        let quiz = self
            .quizzes
            .borrow()
            .get(&quiz_id)
            .cloned()
            .ok_or(FetchError::NotFound);
        emit_once(quiz)
    }
}

impl LtiAccessor for FakeBackend {
    fn fetch_launch(&self, _context: &CanvasContext, _target: &LtiTarget) -> Emissions<LtiLaunch> {
        emit_once(self.launch.borrow().clone().ok_or(FetchError::NotFound))
    }
}

#[derive(Debug)]
pub struct TestScreen {
    pub identity: ScreenIdentity,
}

impl ScreenInstance for TestScreen {
    fn kind(&self) -> ScreenKind {
        self.identity.kind
    }
}

/// Builds a [`TestScreen`] for every kind not marked unsupported.
#[derive(Default)]
pub struct TestScreens {
    unsupported: RefCell<HashSet<ScreenKind>>,
    built: Cell<usize>,
}

impl TestScreens {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn unsupport(&self, kind: ScreenKind) {
        self.unsupported.borrow_mut().insert(kind);
    }

    pub fn built(&self) -> usize {
        self.built.get()
    }
}

impl ScreenFactory for TestScreens {
    fn create_screen(&self, identity: &ScreenIdentity) -> Option<Box<dyn ScreenInstance>> {
        if self.unsupported.borrow().contains(&identity.kind) {
            return None;
        }
        self.built.set(self.built.get() + 1);
        Some(Box::new(TestScreen {
            identity: identity.clone(),
        }))
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    base: Instant,
    offset: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            base: Instant::now(),
            offset: Cell::new(Duration::ZERO),
        })
    }

    pub fn advance_ms(&self, ms: u64) {
        self.offset.set(self.offset.get() + Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

/// Everything a navigation test needs.
pub struct Fixture {
    pub navigator: Navigator<StackHost>,
    pub backend: Rc<FakeBackend>,
    pub screens: Rc<TestScreens>,
    pub clock: Rc<ManualClock>,
}

impl Fixture {
    /// Phone host, course 1 "Biology" and group 7 "Lab Partners" registered.
    pub fn new() -> Self {
        Self::with_host(StackHost::new())
    }

    pub fn with_host(host: StackHost) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let backend = FakeBackend::new();
        backend.add_course(1, "Biology");
        backend.add_group(7, "Lab Partners");
        let screens = TestScreens::new();
        let clock = ManualClock::new();

        let navigator = Navigator::new(
            host,
            Accessors::shared(backend.clone()),
            screens.clone(),
        )
        .with_clock(clock.clone());

        Self {
            navigator,
            backend,
            screens,
            clock,
        }
    }

    pub fn host(&self) -> &StackHost {
        self.navigator.host()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.navigator.host().tags()
    }

    /// Route a reference and drive it to completion.
    pub fn navigate(&mut self, reference: &str) -> NavigationResult {
        pollster::block_on(self.navigator.navigate(reference))
    }

    /// Push the landing screen directly and let the debounce window pass.
    pub fn seed_landing(&mut self) {
        let result = self
            .navigator
            .route_from_menu_action(ScreenIdentity::new(ScreenKind::Dashboard), true);
        assert!(result.is_navigated(), "seeding failed: {:?}", result);
        self.clock.advance_ms(1_000);
    }
}

/// Assert the stack tags, bottom first.
pub fn assert_tags(fixture: &Fixture, expected: &[&str]) {
    assert_eq!(fixture.tags(), expected, "unexpected back stack");
}
