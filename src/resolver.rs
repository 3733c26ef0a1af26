//! Asynchronous resolution of the entities a route needs.
//!
//! [`ContextResolver::resolve`] turns a [`RouteDescriptor`] into a
//! [`ResolvedContext`]: the course or group, its tab, and, depending on the
//! route, a module progression, quiz settings or an LTI launch. Every fetch
//! is a suspension point raced against the job's cancellation token.
//!
//! Accessors may emit a cached value followed by a network value. Only the
//! first emission is used; the stream is dropped right after, so a late
//! emission can never reach the stack.
//!
//! Failures are classified here. Nothing past this module sees a
//! [`FetchError`](crate::error::FetchError).

use crate::accessor::{
    ContextAccessor, Emissions, LtiAccessor, LtiLaunch, ModuleAccessor, ModuleProgression, Quiz,
    QuizAccessor, Tab, TabAccessor,
};
use crate::error::RoutingError;
use crate::jobs::{or_cancel, JobCategory};
use crate::route::{
    CanvasContext, ContextType, RouteDescriptor, RouteKind, ScreenKind, ScreenTargets,
};
use crate::{debug_log, trace_log, warn_log};
use futures::future::LocalBoxFuture;
use futures::{FutureExt, StreamExt};
use std::fmt;
use std::rc::Rc;
use tokio_util::sync::CancellationToken;

/// The accessors a resolver fetches through.
#[derive(Clone)]
pub struct Accessors {
    pub contexts: Rc<dyn ContextAccessor>,
    pub tabs: Rc<dyn TabAccessor>,
    pub modules: Rc<dyn ModuleAccessor>,
    pub quizzes: Rc<dyn QuizAccessor>,
    pub lti: Rc<dyn LtiAccessor>,
}

impl Accessors {
    pub fn new(
        contexts: Rc<dyn ContextAccessor>,
        tabs: Rc<dyn TabAccessor>,
        modules: Rc<dyn ModuleAccessor>,
        quizzes: Rc<dyn QuizAccessor>,
        lti: Rc<dyn LtiAccessor>,
    ) -> Self {
        Self {
            contexts,
            tabs,
            modules,
            quizzes,
            lti,
        }
    }

    /// Use one object for every accessor role.
    pub fn shared<A>(accessor: Rc<A>) -> Self
    where
        A: ContextAccessor + TabAccessor + ModuleAccessor + QuizAccessor + LtiAccessor + 'static,
    {
        Self {
            contexts: accessor.clone(),
            tabs: accessor.clone(),
            modules: accessor.clone(),
            quizzes: accessor.clone(),
            lti: accessor,
        }
    }
}

impl fmt::Debug for Accessors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessors").finish_non_exhaustive()
    }
}

/// Everything placement needs to show a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    /// The route as it will be shown. Differs from the requested route when
    /// a missing tab fell through to the context home.
    pub route: RouteDescriptor,
    pub context: Option<CanvasContext>,
    /// The route's tab, when it names one and the context has it.
    pub tab: Option<Tab>,
    pub modules: Option<ModuleProgression>,
    pub quiz: Option<Quiz>,
    pub lti: Option<LtiLaunch>,
}

impl ResolvedContext {
    fn new(route: RouteDescriptor) -> Self {
        Self {
            route,
            context: None,
            tab: None,
            modules: None,
            quiz: None,
            lti: None,
        }
    }
}

/// Job category a route resolves in.
pub fn category_for(route: &RouteDescriptor) -> JobCategory {
    match route.kind() {
        RouteKind::Lti(_) => JobCategory::LtiLaunch,
        _ if route.module_item_id().is_some() => JobCategory::ModuleProgression,
        _ => JobCategory::CanvasContextLookup,
    }
}

/// Take the first value and drop the rest of the stream.
///
/// An error emission (a cold cache, say) only counts when nothing
/// follows it; the last error is the one classified.
async fn first_emission<T: 'static>(
    emissions: Emissions<T>,
    token: &CancellationToken,
    what: &str,
) -> Result<T, RoutingError> {
    let mut emissions = emissions;
    let mut last_err = None;
    loop {
        let emitted = or_cancel(emissions.next(), token)
            .await
            .map_err(|_| RoutingError::Cancelled)?;
        match emitted {
            Some(Ok(value)) => {
                drop(emissions);
                if token.is_cancelled() {
                    return Err(RoutingError::Cancelled);
                }
                return Ok(value);
            }
            Some(Err(err)) => {
                trace_log!("Skipping failed emission for {}: {}", what, err);
                last_err = Some(err);
            }
            None => break,
        }
    }

    if token.is_cancelled() {
        return Err(RoutingError::Cancelled);
    }
    match last_err {
        Some(err) => {
            debug_log!("Fetching {} failed: {}", what, err);
            Err(err.classify(what))
        }
        None => Err(RoutingError::NotFound {
            what: what.to_string(),
        }),
    }
}

/// Resolves routes through a set of [`Accessors`].
#[derive(Debug, Clone)]
pub struct ContextResolver {
    accessors: Accessors,
    use_cache: bool,
}

impl ContextResolver {
    pub fn new(accessors: Accessors) -> Self {
        Self {
            accessors,
            use_cache: true,
        }
    }

    /// Whether accessors may answer from cache first.
    #[must_use]
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Resolve a route.
    ///
    /// The returned future owns everything it needs, so the caller stays
    /// free to start other navigations while it is pending. It completes
    /// with [`RoutingError::Cancelled`] once `token` fires.
    pub fn resolve(
        &self,
        route: RouteDescriptor,
        token: CancellationToken,
    ) -> LocalBoxFuture<'static, Result<ResolvedContext, RoutingError>> {
        let accessors = self.accessors.clone();
        let use_cache = self.use_cache;
        async move { resolve_route(&accessors, use_cache, route, &token).await }.boxed_local()
    }
}

async fn resolve_route(
    accessors: &Accessors,
    use_cache: bool,
    route: RouteDescriptor,
    token: &CancellationToken,
) -> Result<ResolvedContext, RoutingError> {
    trace_log!("Resolving {} route '{}'", route.kind().name(), route.original_url());
    let mut resolved = ResolvedContext::new(route);

    let Some(context_ref) = resolved.route.context() else {
        return Ok(resolved);
    };
    let context = first_emission(
        accessors.contexts.fetch_context(context_ref, use_cache),
        token,
        &context_ref.to_string(),
    )
    .await?;

    resolve_tab(accessors, use_cache, &context, &mut resolved, token).await?;

    if let Some(item_id) = resolved.route.module_item_id() {
        let progression =
            resolve_module_progression(accessors, use_cache, &context, item_id, token).await?;
        if resolved.route.target_detail_screen() != Some(ScreenKind::ModuleProgression) {
            if let Some(master) = resolved.route.target_master_screen() {
                resolved.route = resolved
                    .route
                    .retargeted(ScreenTargets::with_detail(master, ScreenKind::ModuleProgression));
            }
        }
        resolved.modules = Some(progression);
    }

    if resolved.route.target_detail_screen() == Some(ScreenKind::QuizDetails) {
        if let Some(quiz_id) = resolved.route.path_params().get_as::<u64>("quizId") {
            let quiz = first_emission(
                accessors.quizzes.fetch_quiz(&context, quiz_id, use_cache),
                token,
                &format!("quiz {}", quiz_id),
            )
            .await?;
            resolved.quiz = Some(quiz);
        }
    }

    if let RouteKind::Lti(target) = resolved.route.kind() {
        let launch = first_emission(
            accessors.lti.fetch_launch(&context, target),
            token,
            &format!("external tool in {}", context_ref),
        )
        .await?;
        resolved.lti = Some(launch);
    }

    debug_log!(
        "Resolved '{}' in {} ({})",
        resolved.route.original_url(),
        context.name(),
        context_ref
    );
    resolved.context = Some(context);
    Ok(resolved)
}

/// Look up the route's tab. A tab the context does not have falls through
/// to the context home.
async fn resolve_tab(
    accessors: &Accessors,
    use_cache: bool,
    context: &CanvasContext,
    resolved: &mut ResolvedContext,
    token: &CancellationToken,
) -> Result<(), RoutingError> {
    if context.context_type() == ContextType::User {
        return Ok(());
    }
    let Some(tab_id) = resolved
        .route
        .target_master_screen()
        .and_then(ScreenKind::tab_id)
    else {
        return Ok(());
    };

    let tabs = first_emission(
        accessors.tabs.fetch_tabs(context, use_cache),
        token,
        &format!("tabs of {}", context.context_ref()),
    )
    .await?;

    match tabs.into_iter().find(|tab| tab.id == tab_id) {
        Some(tab) => resolved.tab = Some(tab),
        None => {
            warn_log!(
                "{} has no '{}' tab, falling back to its home",
                context.context_ref(),
                tab_id
            );
            resolved.route = resolved
                .route
                .retargeted(ScreenTargets::master(ScreenKind::ContextHome));
        }
    }
    Ok(())
}

/// Locate an item's module and load its siblings in order.
async fn resolve_module_progression(
    accessors: &Accessors,
    use_cache: bool,
    context: &CanvasContext,
    item_id: u64,
    token: &CancellationToken,
) -> Result<ModuleProgression, RoutingError> {
    let what = format!("module item {}", item_id);
    let sequence = first_emission(
        accessors.modules.fetch_item_sequence(context, item_id, use_cache),
        token,
        &what,
    )
    .await?;
    let module_id = sequence
        .items
        .iter()
        .find(|item| item.id == item_id)
        .or_else(|| sequence.items.first())
        .map(|item| item.module_id)
        .ok_or_else(|| RoutingError::NotFound { what: what.clone() })?;

    let mut items = first_emission(
        accessors.modules.fetch_module_items(context, module_id, use_cache),
        token,
        &format!("module {}", module_id),
    )
    .await?;
    items.sort_by_key(|item| item.position);

    let current_index = items
        .iter()
        .position(|item| item.id == item_id)
        .ok_or(RoutingError::NotFound { what })?;

    Ok(ModuleProgression {
        module_id,
        items,
        current_index,
    })
}
