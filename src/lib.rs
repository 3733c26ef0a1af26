//! Deep-link routing and back-stack placement for a learning-management
//! mobile client.
//!
//! The crate turns an incoming reference (a bookmark, a push notification
//! payload, a clicked link or an in-app menu tap) into a consistent,
//! cancellable sequence of screen pushes:
//!
//! 1. [`RouteParser`] parses the reference into a [`RouteDescriptor`]
//!    without any I/O.
//! 2. [`ContextResolver`] fetches the course, group, tab, module, quiz or
//!    LTI data the route needs, through host-supplied accessors.
//! 3. [`TabGate`] decides whether the target may be shown.
//! 4. [`PlacementEngine`] composes the new screens with the back stack,
//!    which the [`NavigationHost`] owns.
//!
//! [`Navigator`] wires these together for one host.
//!
//! # Features
//!
//! - `log` (default): log through the `log` crate.
//! - `tracing`: log through `tracing` instead.
//! - `cache` (default): LRU memo of parse results.

pub mod accessor;
pub mod arena;
#[cfg(feature = "cache")]
pub mod cache;
pub mod config;
pub mod error;
pub mod guards;
pub mod host;
pub mod jobs;
pub mod logging;
pub mod navigator;
pub mod params;
pub mod parser;
pub mod placement;
pub mod resolver;
pub mod route;
pub mod state;

pub use accessor::{
    ContextAccessor, Emissions, LtiAccessor, LtiLaunch, ModuleAccessor, ModuleItem,
    ModuleItemSequence, ModuleProgression, Quiz, QuizAccessor, ScreenFactory, ScreenInstance, Tab,
    TabAccessor,
};
pub use arena::{ScreenArena, ScreenKey};
#[cfg(feature = "cache")]
pub use cache::{CacheStats, RouteCache};
pub use config::NavigatorConfig;
pub use error::{FetchError, HostError, NavigationResult, RoutingError};
pub use guards::{GateDecision, TabGate};
pub use host::{FormFactor, NavigationHost, StackHost};
pub use jobs::{JobCategory, JobRegistry, JobTicket};
pub use navigator::{Completion, NavigationTask, Navigator, RouteOutcome};
pub use params::{QueryParams, RouteParams};
pub use parser::RouteParser;
pub use placement::{
    BackOutcome, Clock, PlacementEngine, PlacementOutcome, PushOrigin, SystemClock,
};
pub use resolver::{Accessors, ContextResolver, ResolvedContext};
pub use route::{
    CanvasContext, ContextRef, ContextType, FileDownload, LtiTarget, RouteDescriptor, RouteKind,
    ScreenIdentity, ScreenKind, ScreenTargets,
};
pub use state::{NavigationFrame, NavigationStack, Placement};
