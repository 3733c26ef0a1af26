//! The parsed, immutable description of "where to go".
//!
//! A [`RouteDescriptor`] is what [`RouteParser`](crate::parser::RouteParser)
//! produces. Its [`RouteKind`] is a tagged union: only the screen-bearing
//! kinds carry [`ScreenTargets`], so a file download can never name a screen
//! and a notification-preferences route can never carry a context.
//!
//! The module also holds the small identity types shared by every other
//! module: [`ContextRef`], [`CanvasContext`], [`ScreenKind`] and
//! [`ScreenIdentity`].

use crate::accessor::Tab;
use crate::params::{QueryParams, RouteParams};
use crate::state::Placement;
use std::fmt;

/// Multiplier that turns a `<shard>~<local>` id into a global id.
pub const SHARD_FACTOR: u64 = 10_000_000_000_000;

/// Parse an entity id, expanding the `<shard>~<local>` short form.
///
/// ```
/// use canvas_navigator::route::parse_canvas_id;
///
/// assert_eq!(parse_canvas_id("42"), Some(42));
/// assert_eq!(parse_canvas_id("7~12"), Some(70_000_000_000_012));
/// assert_eq!(parse_canvas_id("abc"), None);
/// assert_eq!(parse_canvas_id(""), None);
/// ```
pub fn parse_canvas_id(raw: &str) -> Option<u64> {
    fn digits(s: &str) -> Option<u64> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    }

    match raw.split_once('~') {
        Some((shard, local)) => {
            let shard = digits(shard)?;
            let local = digits(local)?;
            if local >= SHARD_FACTOR {
                return None;
            }
            shard.checked_mul(SHARD_FACTOR)?.checked_add(local)
        }
        None => digits(raw),
    }
}

// ============================================================================
// Contexts
// ============================================================================

/// Kind of entity a screen is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextType {
    Course,
    Group,
    User,
}

impl ContextType {
    /// Path parameter name carrying this context's id.
    pub fn id_param(self) -> &'static str {
        match self {
            ContextType::Course => "courseId",
            ContextType::Group => "groupId",
            ContextType::User => "userId",
        }
    }

    /// First path segment of this context's routes.
    pub fn path_segment(self) -> &'static str {
        match self {
            ContextType::Course => "courses",
            ContextType::Group => "groups",
            ContextType::User => "users",
        }
    }
}

/// Unresolved reference to a context, as found in a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextRef {
    Course(u64),
    Group(u64),
    /// `None` is the signed-in user (`/users/self`).
    User(Option<u64>),
}

impl ContextRef {
    /// The context's type.
    pub fn context_type(&self) -> ContextType {
        match self {
            ContextRef::Course(_) => ContextType::Course,
            ContextRef::Group(_) => ContextType::Group,
            ContextRef::User(_) => ContextType::User,
        }
    }

    /// Numeric id, `None` for the signed-in user.
    pub fn id(&self) -> Option<u64> {
        match self {
            ContextRef::Course(id) | ContextRef::Group(id) => Some(*id),
            ContextRef::User(id) => *id,
        }
    }

    /// Path prefix this context is addressed by.
    pub fn path_prefix(&self) -> String {
        match self {
            ContextRef::Course(id) => format!("/courses/{}", id),
            ContextRef::Group(id) => format!("/groups/{}", id),
            ContextRef::User(Some(id)) => format!("/users/{}", id),
            ContextRef::User(None) => "/users/self".to_string(),
        }
    }
}

impl fmt::Display for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextRef::Course(id) => write!(f, "course {}", id),
            ContextRef::Group(id) => write!(f, "group {}", id),
            ContextRef::User(Some(id)) => write!(f, "user {}", id),
            ContextRef::User(None) => write!(f, "current user"),
        }
    }
}

/// Resolved context entity with minimal display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasContext {
    Course { id: u64, name: String, course_code: Option<String> },
    Group { id: u64, name: String },
    User { id: u64, name: String },
}

impl CanvasContext {
    /// Entity id.
    pub fn id(&self) -> u64 {
        match self {
            CanvasContext::Course { id, .. }
            | CanvasContext::Group { id, .. }
            | CanvasContext::User { id, .. } => *id,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            CanvasContext::Course { name, .. }
            | CanvasContext::Group { name, .. }
            | CanvasContext::User { name, .. } => name,
        }
    }

    /// The context's type.
    pub fn context_type(&self) -> ContextType {
        match self {
            CanvasContext::Course { .. } => ContextType::Course,
            CanvasContext::Group { .. } => ContextType::Group,
            CanvasContext::User { .. } => ContextType::User,
        }
    }

    /// Reference addressing this context.
    pub fn context_ref(&self) -> ContextRef {
        match self {
            CanvasContext::Course { id, .. } => ContextRef::Course(*id),
            CanvasContext::Group { id, .. } => ContextRef::Group(*id),
            CanvasContext::User { id, .. } => ContextRef::User(Some(*id)),
        }
    }
}

// ============================================================================
// Screens
// ============================================================================

/// Abstract screen type identifier.
///
/// Concrete screens live in the host; the routing core only needs to know a
/// screen's name, its owning tab and its natural placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenKind {
    Dashboard,
    ContextHome,
    Assignments,
    AssignmentDetails,
    Syllabus,
    Discussions,
    DiscussionDetails,
    Announcements,
    AnnouncementDetails,
    Files,
    FileDetails,
    Grades,
    People,
    PersonDetails,
    Pages,
    PageDetails,
    Quizzes,
    QuizDetails,
    NativeQuiz,
    Modules,
    ModuleProgression,
    LtiLaunch,
    NotificationPreferences,
    Bookmarks,
}

impl ScreenKind {
    /// Stable type name, used as the back stack tag.
    pub fn name(self) -> &'static str {
        match self {
            ScreenKind::Dashboard => "Dashboard",
            ScreenKind::ContextHome => "ContextHome",
            ScreenKind::Assignments => "Assignments",
            ScreenKind::AssignmentDetails => "AssignmentDetails",
            ScreenKind::Syllabus => "Syllabus",
            ScreenKind::Discussions => "Discussions",
            ScreenKind::DiscussionDetails => "DiscussionDetails",
            ScreenKind::Announcements => "Announcements",
            ScreenKind::AnnouncementDetails => "AnnouncementDetails",
            ScreenKind::Files => "Files",
            ScreenKind::FileDetails => "FileDetails",
            ScreenKind::Grades => "Grades",
            ScreenKind::People => "People",
            ScreenKind::PersonDetails => "PersonDetails",
            ScreenKind::Pages => "Pages",
            ScreenKind::PageDetails => "PageDetails",
            ScreenKind::Quizzes => "Quizzes",
            ScreenKind::QuizDetails => "QuizDetails",
            ScreenKind::NativeQuiz => "NativeQuiz",
            ScreenKind::Modules => "Modules",
            ScreenKind::ModuleProgression => "ModuleProgression",
            ScreenKind::LtiLaunch => "LtiLaunch",
            ScreenKind::NotificationPreferences => "NotificationPreferences",
            ScreenKind::Bookmarks => "Bookmarks",
        }
    }

    /// Id of the course/group tab this screen belongs to, if any.
    pub fn tab_id(self) -> Option<&'static str> {
        match self {
            ScreenKind::Assignments | ScreenKind::AssignmentDetails => Some("assignments"),
            ScreenKind::Syllabus => Some("syllabus"),
            ScreenKind::Discussions | ScreenKind::DiscussionDetails => Some("discussions"),
            ScreenKind::Announcements | ScreenKind::AnnouncementDetails => Some("announcements"),
            ScreenKind::Files | ScreenKind::FileDetails => Some("files"),
            ScreenKind::Grades => Some("grades"),
            ScreenKind::People | ScreenKind::PersonDetails => Some("people"),
            ScreenKind::Pages | ScreenKind::PageDetails => Some("pages"),
            ScreenKind::Quizzes | ScreenKind::QuizDetails | ScreenKind::NativeQuiz => {
                Some("quizzes")
            }
            ScreenKind::Modules | ScreenKind::ModuleProgression => Some("modules"),
            ScreenKind::Dashboard
            | ScreenKind::ContextHome
            | ScreenKind::LtiLaunch
            | ScreenKind::NotificationPreferences
            | ScreenKind::Bookmarks => None,
        }
    }

    /// Placement used when nothing more specific is requested.
    pub fn default_placement(self) -> Placement {
        match self {
            ScreenKind::Dashboard
            | ScreenKind::ContextHome
            | ScreenKind::Assignments
            | ScreenKind::Syllabus
            | ScreenKind::Discussions
            | ScreenKind::Announcements
            | ScreenKind::Files
            | ScreenKind::Grades
            | ScreenKind::People
            | ScreenKind::Pages
            | ScreenKind::Quizzes
            | ScreenKind::Modules => Placement::Master,
            ScreenKind::AssignmentDetails
            | ScreenKind::DiscussionDetails
            | ScreenKind::AnnouncementDetails
            | ScreenKind::FileDetails
            | ScreenKind::PersonDetails
            | ScreenKind::PageDetails
            | ScreenKind::QuizDetails
            | ScreenKind::NativeQuiz
            | ScreenKind::ModuleProgression
            | ScreenKind::LtiLaunch => Placement::Detail,
            ScreenKind::NotificationPreferences => Placement::Dialog,
            ScreenKind::Bookmarks => Placement::Fullscreen,
        }
    }
}

impl fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A screen type plus everything needed to construct it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenIdentity {
    /// Screen type.
    pub kind: ScreenKind,
    /// Constructor parameters.
    pub params: RouteParams,
    /// Context the screen is scoped to.
    pub context: Option<ContextRef>,
    /// Tab the screen was opened from, checked by the tab gate.
    pub tab: Option<Tab>,
}

impl ScreenIdentity {
    /// Identity with no parameters or context.
    pub fn new(kind: ScreenKind) -> Self {
        Self {
            kind,
            params: RouteParams::new(),
            context: None,
            tab: None,
        }
    }

    /// Set constructor parameters.
    #[must_use]
    pub fn with_params(mut self, params: RouteParams) -> Self {
        self.params = params;
        self
    }

    /// Scope the screen to a context.
    #[must_use]
    pub fn in_context(mut self, context: ContextRef) -> Self {
        self.context = Some(context);
        self
    }

    /// Attach the tab the screen is opened from.
    #[must_use]
    pub fn from_tab(mut self, tab: Tab) -> Self {
        self.tab = Some(tab);
        self
    }

    /// Back stack tag: the screen type name.
    pub fn backstack_tag(&self) -> &'static str {
        self.kind.name()
    }
}

// ============================================================================
// Route kinds
// ============================================================================

/// Screens a route wants to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenTargets {
    pub master: ScreenKind,
    pub detail: Option<ScreenKind>,
}

impl ScreenTargets {
    /// Master screen only.
    pub const fn master(master: ScreenKind) -> Self {
        Self {
            master,
            detail: None,
        }
    }

    /// Master with a detail screen on top.
    pub const fn with_detail(master: ScreenKind, detail: ScreenKind) -> Self {
        Self {
            master,
            detail: Some(detail),
        }
    }
}

/// A file the host should open with its binary/media collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileDownload {
    pub url: String,
    pub file_id: Option<u64>,
    pub verifier: String,
}

/// An LTI tool reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LtiTarget {
    /// Numeric tool id from `external_tools/{toolId}`.
    pub tool_id: Option<u64>,
    /// Launch url from `external_tools/retrieve?url=`.
    pub launch_url: Option<String>,
}

/// What kind of route this is, with the payload specific to that kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteKind {
    /// A screen that belongs to a course/group tab.
    ContentTab(ScreenTargets),
    /// A binary download; never shows a screen.
    FileDownload(FileDownload),
    /// An LTI tool launch; bypasses tab gating.
    Lti(LtiTarget),
    /// Notification preferences; needs no context.
    NotificationPreferences,
    /// Any other screen route.
    Generic(ScreenTargets),
}

impl RouteKind {
    /// Short kind name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            RouteKind::ContentTab(_) => "ContentTab",
            RouteKind::FileDownload(_) => "FileDownload",
            RouteKind::Lti(_) => "Lti",
            RouteKind::NotificationPreferences => "NotificationPreferences",
            RouteKind::Generic(_) => "Generic",
        }
    }

    /// Screen targets, for the screen-bearing kinds.
    pub fn targets(&self) -> Option<&ScreenTargets> {
        match self {
            RouteKind::ContentTab(targets) | RouteKind::Generic(targets) => Some(targets),
            _ => None,
        }
    }

    /// Classify screen targets: tab-bound masters make a `ContentTab` route.
    pub fn for_targets(targets: ScreenTargets) -> Self {
        if targets.master.tab_id().is_some() {
            RouteKind::ContentTab(targets)
        } else {
            RouteKind::Generic(targets)
        }
    }
}

// ============================================================================
// RouteDescriptor
// ============================================================================

/// Parsed, immutable navigation intent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteDescriptor {
    kind: RouteKind,
    path_params: RouteParams,
    query_params: QueryParams,
    context: Option<ContextRef>,
    original_url: String,
}

impl RouteDescriptor {
    /// Assemble a descriptor. Used by the parser and by hosts restoring a
    /// persisted route.
    pub fn new(
        kind: RouteKind,
        path_params: RouteParams,
        query_params: QueryParams,
        context: Option<ContextRef>,
        original_url: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path_params,
            query_params,
            context,
            original_url: original_url.into(),
        }
    }

    pub fn kind(&self) -> &RouteKind {
        &self.kind
    }

    pub fn path_params(&self) -> &RouteParams {
        &self.path_params
    }

    pub fn query_params(&self) -> &QueryParams {
        &self.query_params
    }

    pub fn context(&self) -> Option<ContextRef> {
        self.context
    }

    pub fn context_type(&self) -> Option<ContextType> {
        self.context.map(|c| c.context_type())
    }

    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    pub fn target_master_screen(&self) -> Option<ScreenKind> {
        self.kind.targets().map(|t| t.master)
    }

    pub fn target_detail_screen(&self) -> Option<ScreenKind> {
        self.kind.targets().and_then(|t| t.detail)
    }

    /// Module item this route progresses through, from the path or the
    /// `module_item_id` query parameter.
    pub fn module_item_id(&self) -> Option<u64> {
        self.path_params
            .get("moduleItemId")
            .or_else(|| self.query_params.get("module_item_id"))
            .or_else(|| self.query_params.get("moduleItemId"))
            .and_then(parse_canvas_id)
    }

    /// Same route pointed at different screens. Path and query parameters
    /// are kept; the kind is re-derived from the new targets.
    #[must_use]
    pub fn retargeted(&self, targets: ScreenTargets) -> Self {
        Self {
            kind: RouteKind::for_targets(targets),
            ..self.clone()
        }
    }

    /// Identity of the screen a target kind should be built with.
    pub fn screen_identity(&self, kind: ScreenKind) -> ScreenIdentity {
        let identity = ScreenIdentity::new(kind).with_params(self.path_params.clone());
        match self.context {
            Some(context) => identity.in_context(context),
            None => identity,
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
    fn test_parse_canvas_id_shard_bounds() {
        assert_eq!(parse_canvas_id("0~1"), Some(1));
        assert_eq!(parse_canvas_id("1~0"), Some(SHARD_FACTOR));
        assert_eq!(parse_canvas_id("1~"), None);
        assert_eq!(parse_canvas_id("~5"), None);
        assert_eq!(parse_canvas_id("1~10000000000000"), None);
        assert_eq!(parse_canvas_id("-4"), None);
        assert_eq!(parse_canvas_id("99999999999999999999"), None);
    }

    #[test]
    fn test_kind_for_targets() {
        let tab = RouteKind::for_targets(ScreenTargets::master(ScreenKind::Grades));
        assert_eq!(tab.name(), "ContentTab");

        let home = RouteKind::for_targets(ScreenTargets::master(ScreenKind::ContextHome));
        assert_eq!(home.name(), "Generic");
    }

    #[test]
    fn test_file_download_carries_no_screens() {
        let route = RouteDescriptor::new(
            RouteKind::FileDownload(FileDownload {
                url: "/files/1/download".into(),
                file_id: Some(1),
                verifier: "v".into(),
            }),
            RouteParams::new(),
            QueryParams::new(),
            Some(ContextRef::Course(1)),
            "/courses/1/files/1/download?verifier=v&download_frd=1",
        );
        assert_eq!(route.target_master_screen(), None);
        assert_eq!(route.target_detail_screen(), None);
    }

    #[test]
    fn test_module_item_id_sources() {
        let from_query = RouteDescriptor::new(
            RouteKind::Generic(ScreenTargets::master(ScreenKind::ContextHome)),
            RouteParams::new(),
            QueryParams::from_query_string("module_item_id=12"),
            Some(ContextRef::Course(1)),
            "/courses/1?module_item_id=12",
        );
        assert_eq!(from_query.module_item_id(), Some(12));

        let from_path = RouteDescriptor::new(
            RouteKind::for_targets(ScreenTargets::with_detail(
                ScreenKind::Modules,
                ScreenKind::ModuleProgression,
            )),
            RouteParams::new().with("courseId", "1").with("moduleItemId", "5"),
            QueryParams::new(),
            Some(ContextRef::Course(1)),
            "/courses/1/modules/items/5",
        );
        assert_eq!(from_path.module_item_id(), Some(5));
    }

    #[test]
    fn test_retargeted_keeps_params() {
        let route = RouteDescriptor::new(
            RouteKind::for_targets(ScreenTargets::master(ScreenKind::Grades)),
            RouteParams::new().with("courseId", "3"),
            QueryParams::new(),
            Some(ContextRef::Course(3)),
            "/courses/3/grades",
        );
        let home = route.retargeted(ScreenTargets::master(ScreenKind::ContextHome));
        assert_eq!(home.kind().name(), "Generic");
        assert_eq!(home.path_params().get("courseId"), Some("3"));
        assert_eq!(home.original_url(), "/courses/3/grades");
    }

    #[test]
    fn test_screen_identity_tag() {
        let identity = ScreenIdentity::new(ScreenKind::Bookmarks);
        assert_eq!(identity.backstack_tag(), "Bookmarks");
        assert_eq!(ScreenKind::Bookmarks.default_placement(), Placement::Fullscreen);
        assert_eq!(ScreenKind::NativeQuiz.tab_id(), Some("quizzes"));
    }
}
