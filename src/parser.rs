//! Turning raw references into [`RouteDescriptor`]s.
//!
//! A reference is anything a user or the system can hand the router: a
//! bookmark, the url inside a push notification, a link clicked in another
//! app, or a bare path. Parsing is pure and deterministic; it never touches
//! the network. A reference the parser cannot make sense of yields `None`,
//! and the caller falls back to the landing screen.
//!
//! # Recognised shapes
//!
//! - **File downloads**: any matched path whose query carries both a
//!   `verifier` and a truthy `download_frd`. These never name a screen.
//! - **LTI launches**: `…/external_tools/{toolId}` and
//!   `…/external_tools/retrieve?url=…`.
//! - **Notification preferences**: `/profile/communication`, with no
//!   course or group.
//! - **Everything else**: a course (`/courses/{courseId}/…`), group
//!   (`/groups/{groupId}/…`) or user (`/users/{userId}/files…`) route.
//!   Ids must be numeric (or `<shard>~<local>`).
//! - **Unknown course and group paths**: a path under a valid course or
//!   group id that no table entry accepts opens that context's home screen.
//!   A malformed context id fails the parse.
//!
//! Absolute (`https://`, `canvas-courses://`, `canvas-student://`) and
//! relative references are accepted; a leading `/api/v1` is ignored.
//!
//! # Example
//!
//! ```
//! use canvas_navigator::parser::RouteParser;
//! use canvas_navigator::route::{ContextType, ScreenKind};
//!
//! let parser = RouteParser::new();
//! let route = parser
//!     .parse("https://school.example.com/courses/42/assignments/7", None)
//!     .unwrap();
//! assert_eq!(route.context_type(), Some(ContextType::Course));
//! assert_eq!(route.path_params().get("courseId"), Some("42"));
//! assert_eq!(route.target_detail_screen(), Some(ScreenKind::AssignmentDetails));
//!
//! assert!(parser.parse("/courses/abc/grades", None).is_none());
//! ```

#[cfg(feature = "cache")]
use crate::cache::{CacheKey, CacheStats, RouteCache};
use crate::params::{QueryParams, RouteParams};
use crate::route::{
    parse_canvas_id, ContextRef, ContextType, FileDownload, LtiTarget, RouteDescriptor, RouteKind,
    ScreenKind, ScreenTargets,
};
use crate::{debug_log, error_log, trace_log};
use matchit::Router;
use url::Url;

/// Host used to resolve relative references; never a real domain.
const RELATIVE_BASE: &str = "https://relative.invalid/";
const RELATIVE_HOST: &str = "relative.invalid";

/// Schemes an absolute reference may use.
const ACCEPTED_SCHEMES: [&str; 4] = ["https", "http", "canvas-courses", "canvas-student"];

/// Query key carrying the file access verifier.
pub const VERIFIER_PARAM: &str = "verifier";
/// Query flag asking for the raw file instead of its preview page.
pub const FORCE_DOWNLOAD_PARAM: &str = "download_frd";

/// What a matched pattern turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Template {
    Screens(ScreenTargets),
    ExternalTool,
    NotificationPreferences,
    /// Only meaningful as a file download.
    FileOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RouteEntry {
    context: Option<ContextType>,
    template: Template,
}

use ScreenKind as S;
use Template::Screens;

/// Patterns mounted under both `/courses/{courseId}` and `/groups/{groupId}`.
const CONTEXT_ROUTES: &[(&str, Template)] = &[
    ("", Screens(ScreenTargets::master(S::ContextHome))),
    ("/assignments", Screens(ScreenTargets::master(S::Assignments))),
    ("/assignments/syllabus", Screens(ScreenTargets::master(S::Syllabus))),
    (
        "/assignments/{assignmentId}",
        Screens(ScreenTargets::with_detail(S::Assignments, S::AssignmentDetails)),
    ),
    ("/syllabus", Screens(ScreenTargets::master(S::Syllabus))),
    ("/discussion_topics", Screens(ScreenTargets::master(S::Discussions))),
    (
        "/discussion_topics/{topicId}",
        Screens(ScreenTargets::with_detail(S::Discussions, S::DiscussionDetails)),
    ),
    ("/announcements", Screens(ScreenTargets::master(S::Announcements))),
    (
        "/announcements/{topicId}",
        Screens(ScreenTargets::with_detail(S::Announcements, S::AnnouncementDetails)),
    ),
    ("/files", Screens(ScreenTargets::master(S::Files))),
    ("/files/folder/{*folderPath}", Screens(ScreenTargets::master(S::Files))),
    (
        "/files/{fileId}",
        Screens(ScreenTargets::with_detail(S::Files, S::FileDetails)),
    ),
    (
        "/files/{fileId}/download",
        Screens(ScreenTargets::with_detail(S::Files, S::FileDetails)),
    ),
    (
        "/files/{fileId}/preview",
        Screens(ScreenTargets::with_detail(S::Files, S::FileDetails)),
    ),
    ("/grades", Screens(ScreenTargets::master(S::Grades))),
    ("/users", Screens(ScreenTargets::master(S::People))),
    (
        "/users/{userId}",
        Screens(ScreenTargets::with_detail(S::People, S::PersonDetails)),
    ),
    ("/people", Screens(ScreenTargets::master(S::People))),
    (
        "/people/{userId}",
        Screens(ScreenTargets::with_detail(S::People, S::PersonDetails)),
    ),
    ("/pages", Screens(ScreenTargets::master(S::Pages))),
    (
        "/pages/{pageId}",
        Screens(ScreenTargets::with_detail(S::Pages, S::PageDetails)),
    ),
    ("/wiki", Screens(ScreenTargets::master(S::Pages))),
    (
        "/wiki/{pageId}",
        Screens(ScreenTargets::with_detail(S::Pages, S::PageDetails)),
    ),
    ("/quizzes", Screens(ScreenTargets::master(S::Quizzes))),
    (
        "/quizzes/{quizId}",
        Screens(ScreenTargets::with_detail(S::Quizzes, S::QuizDetails)),
    ),
    ("/modules", Screens(ScreenTargets::master(S::Modules))),
    ("/modules/{moduleId}", Screens(ScreenTargets::master(S::Modules))),
    (
        "/modules/items/{moduleItemId}",
        Screens(ScreenTargets::with_detail(S::Modules, S::ModuleProgression)),
    ),
    ("/external_tools/retrieve", Template::ExternalTool),
    ("/external_tools/{toolId}", Template::ExternalTool),
];

/// Patterns mounted under `/users/{userId}`.
const USER_ROUTES: &[(&str, Template)] = &[
    ("/files", Screens(ScreenTargets::master(S::Files))),
    (
        "/files/{fileId}",
        Screens(ScreenTargets::with_detail(S::Files, S::FileDetails)),
    ),
];

/// Patterns with no context.
const TOP_LEVEL_ROUTES: &[(&str, Template)] = &[
    ("/profile/communication", Template::NotificationPreferences),
    ("/profile/notifications", Template::NotificationPreferences),
    ("/files/{fileId}", Template::FileOnly),
    ("/files/{fileId}/download", Template::FileOnly),
];

/// `/courses/{courseId}` and friends.
fn context_prefix_pattern(context: ContextType) -> String {
    format!("/{}/{{{}}}", context.path_segment(), context.id_param())
}

/// Build the matcher from the static tables.
///
/// Conflicting patterns are logged and skipped.
fn build_matcher() -> Router<RouteEntry> {
    let mut router = Router::new();
    let mut insert = |pattern: String, entry: RouteEntry| {
        if let Err(err) = router.insert(pattern.as_str(), entry) {
            error_log!("Route pattern '{}' rejected: {}", pattern, err);
        }
    };

    let mounts = [
        (ContextType::Course, CONTEXT_ROUTES),
        (ContextType::Group, CONTEXT_ROUTES),
        (ContextType::User, USER_ROUTES),
    ];
    for (context, routes) in mounts {
        let prefix = context_prefix_pattern(context);
        for (suffix, template) in routes {
            insert(
                format!("{}{}", prefix, suffix),
                RouteEntry {
                    context: Some(context),
                    template: *template,
                },
            );
        }
    }
    for (pattern, template) in TOP_LEVEL_ROUTES {
        insert(
            (*pattern).to_string(),
            RouteEntry {
                context: None,
                template: *template,
            },
        );
    }
    router
}

/// Catch-all for course and group paths the tables do not know.
///
/// Only the context id is captured, so an unknown tail or a malformed
/// inner id still lands on the context's home screen.
fn build_context_matcher() -> Router<ContextType> {
    let mut router = Router::new();
    for context in [ContextType::Course, ContextType::Group] {
        let pattern = format!("{}/{{*rest}}", context_prefix_pattern(context));
        if let Err(err) = router.insert(pattern.as_str(), context) {
            error_log!("Context pattern '{}' rejected: {}", pattern, err);
        }
    }
    router
}

/// Collapse repeated slashes, drop the trailing slash and the `/api/v1`
/// prefix.
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let segments = match segments.as_slice() {
        ["api", "v1", rest @ ..] => rest,
        all => all,
    };
    format!("/{}", segments.join("/"))
}

/// Check if a path already names its own context.
fn has_context_prefix(path: &str) -> bool {
    ["/courses/", "/groups/", "/users/"]
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Validate and canonicalise id parameters.
///
/// `pageId` is a slug and `folderPath` a free path; every other `…Id` must
/// be numeric or a shard id, except `userId`, which also accepts `self`.
fn canonical_params(raw: RouteParams) -> Option<RouteParams> {
    let mut params = RouteParams::new();
    for (key, value) in raw.iter() {
        let verbatim =
            key == "pageId" || !key.ends_with("Id") || (key == "userId" && value == "self");
        let canonical = if verbatim {
            value.to_string()
        } else {
            match parse_canvas_id(value) {
                Some(id) => id.to_string(),
                None => {
                    debug_log!("Rejecting non-numeric {} '{}'", key, value);
                    return None;
                }
            }
        };
        params.insert(key, canonical);
    }
    Some(params)
}

/// Deterministic reference parser.
pub struct RouteParser {
    matcher: Router<RouteEntry>,
    context_matcher: Router<ContextType>,
    domain: Option<String>,
    #[cfg(feature = "cache")]
    cache: RouteCache,
}

impl RouteParser {
    /// Parser accepting absolute references from any host.
    pub fn new() -> Self {
        Self {
            matcher: build_matcher(),
            context_matcher: build_context_matcher(),
            domain: None,
            #[cfg(feature = "cache")]
            cache: RouteCache::new(),
        }
    }

    /// Only accept absolute references whose host is `domain`.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.set_domain(Some(domain.into()));
        self
    }

    /// Memoise up to `capacity` parse results.
    #[cfg(feature = "cache")]
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = RouteCache::with_capacity(capacity);
        self
    }

    /// Change the accepted domain. Clears the parse memo.
    pub fn set_domain(&mut self, domain: Option<String>) {
        self.domain = domain.map(|d| d.trim().to_ascii_lowercase());
        #[cfg(feature = "cache")]
        self.cache.clear();
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Parse a reference.
    ///
    /// `known_context` scopes context-relative references such as
    /// `/assignments/5`; references that name their own context ignore it.
    pub fn parse(
        &self,
        reference: &str,
        known_context: Option<ContextRef>,
    ) -> Option<RouteDescriptor> {
        let result = self.parse_uncached(reference, known_context);
        match &result {
            Some(route) => {
                debug_log!(
                    "Parsed '{}' as {} ({:?})",
                    reference,
                    route.kind().name(),
                    route.context()
                );
            }
            None => {
                debug_log!("Could not parse '{}'", reference);
            }
        }
        result
    }

    /// [`parse`](Self::parse) through the memo.
    pub fn parse_memoized(
        &mut self,
        reference: &str,
        known_context: Option<ContextRef>,
    ) -> Option<RouteDescriptor> {
        #[cfg(feature = "cache")]
        {
            let key = CacheKey::new(reference, known_context);
            if let Some(result) = self.cache.get(&key) {
                return result;
            }
            let result = self.parse(reference, known_context);
            self.cache.insert(key, result.clone());
            result
        }
        #[cfg(not(feature = "cache"))]
        {
            self.parse(reference, known_context)
        }
    }

    /// Parse memo statistics.
    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    fn parse_uncached(
        &self,
        reference: &str,
        known_context: Option<ContextRef>,
    ) -> Option<RouteDescriptor> {
        let url = self.to_url(reference)?;
        let path = normalize_path(url.path());
        let query = QueryParams::from_pairs(url.query_pairs());

        if let Some((entry, params)) = self.match_path(&path) {
            if let Some(route) = Self::build(entry, params, query.clone(), reference) {
                return Some(route);
            }
        }
        if has_context_prefix(&path) {
            return self.context_home(&path, query, reference);
        }

        let context = known_context?;
        let scoped = if path == "/" {
            context.path_prefix()
        } else {
            format!("{}{}", context.path_prefix(), path)
        };
        trace_log!("Retrying '{}' scoped to {} as '{}'", path, context, scoped);
        let (entry, params) = self.match_path(&scoped)?;
        Self::build(entry, params, query, reference)
    }

    /// Resolve the reference against the relative base and apply the
    /// scheme and domain rules.
    fn to_url(&self, reference: &str) -> Option<Url> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        let base = Url::parse(RELATIVE_BASE).ok()?;
        let url = match Url::parse(reference) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                // "school.example.com/courses/1": a host without a scheme.
                let first = reference.split('/').next().unwrap_or_default();
                if first.contains('.') && !first.starts_with('.') {
                    Url::parse(&format!("https://{}", reference)).ok()?
                } else {
                    base.join(reference).ok()?
                }
            }
            Err(_) => return None,
        };

        if !ACCEPTED_SCHEMES.contains(&url.scheme()) {
            trace_log!("Scheme '{}' is not routable", url.scheme());
            return None;
        }
        let host = url.host_str().unwrap_or_default();
        if host != RELATIVE_HOST {
            if let Some(domain) = &self.domain {
                if !host.eq_ignore_ascii_case(domain) {
                    debug_log!("Host '{}' does not match domain '{}'", host, domain);
                    return None;
                }
            }
        }
        Some(url)
    }

    fn match_path(&self, path: &str) -> Option<(RouteEntry, RouteParams)> {
        let matched = self.matcher.at(path).ok()?;
        let params = matched
            .params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Some((*matched.value, params))
    }

    /// Home screen of the context a path names, for paths the route
    /// tables reject.
    fn context_home(
        &self,
        path: &str,
        query: QueryParams,
        reference: &str,
    ) -> Option<RouteDescriptor> {
        let matched = self.context_matcher.at(path).ok()?;
        let context = *matched.value;
        let id_param = context.id_param();
        let params = RouteParams::new().with(id_param, matched.params.get(id_param)?);
        debug_log!(
            "No route for '{}', falling back to its {:?} home",
            path,
            context
        );
        let entry = RouteEntry {
            context: Some(context),
            template: Screens(ScreenTargets::master(S::ContextHome)),
        };
        Self::build(entry, params, query, reference)
    }

    fn build(
        entry: RouteEntry,
        raw_params: RouteParams,
        query: QueryParams,
        original: &str,
    ) -> Option<RouteDescriptor> {
        let params = canonical_params(raw_params)?;
        let context = match entry.context {
            Some(ContextType::Course) => Some(ContextRef::Course(
                params.get_as(ContextType::Course.id_param())?,
            )),
            Some(ContextType::Group) => Some(ContextRef::Group(
                params.get_as(ContextType::Group.id_param())?,
            )),
            Some(ContextType::User) => match params.get(ContextType::User.id_param())? {
                "self" => Some(ContextRef::User(None)),
                id => Some(ContextRef::User(Some(id.parse().ok()?))),
            },
            None => None,
        };

        let verifier = query.get(VERIFIER_PARAM).filter(|v| !v.is_empty());
        if let (Some(verifier), true) = (verifier, query.flag(FORCE_DOWNLOAD_PARAM)) {
            let kind = RouteKind::FileDownload(FileDownload {
                url: original.trim().to_string(),
                file_id: params.get_as("fileId"),
                verifier: verifier.to_string(),
            });
            return Some(RouteDescriptor::new(kind, params, query, context, original));
        }

        let kind = match entry.template {
            Template::Screens(targets) => RouteKind::for_targets(targets),
            Template::ExternalTool => {
                let tool_id = params.get_as("toolId");
                let launch_url = query.get("url").map(str::to_string);
                if tool_id.is_none() && launch_url.is_none() {
                    return None;
                }
                RouteKind::Lti(LtiTarget {
                    tool_id,
                    launch_url,
                })
            }
            Template::NotificationPreferences => RouteKind::NotificationPreferences,
            Template::FileOnly => return None,
        };
        Some(RouteDescriptor::new(kind, params, query, context, original))
    }
}

impl Default for RouteParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RouteParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteParser")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}
