//! The contract a screen-hosting shell implements.
//!
//! The host exclusively owns the back stack. The routing core never touches
//! UI state itself; it reads what it needs through [`NavigationHost`] and
//! asks the host to mutate.
//!
//! [`StackHost`] is a complete in-memory host, used by headless embedders
//! and by the tests.

use crate::accessor::ScreenInstance;
use crate::arena::{ScreenArena, ScreenKey};
use crate::error::HostError;
use crate::route::{FileDownload, ScreenIdentity};
use crate::state::{NavigationFrame, NavigationStack, Placement};
use crate::{debug_log, info_log, trace_log};

/// Size class of the host, deciding how dialogs are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormFactor {
    #[default]
    Phone,
    Tablet,
}

impl FormFactor {
    /// Check if dialogs are presented as true modals.
    pub fn has_modal_dialogs(self) -> bool {
        matches!(self, FormFactor::Tablet)
    }
}

/// Screen-hosting shell.
pub trait NavigationHost {
    /// Push a frame. `is_direct` marks pushes issued by the routing engine
    /// rather than by a raw UI tap.
    fn push_frame(
        &mut self,
        identity: ScreenIdentity,
        placement: Placement,
        is_direct: bool,
    ) -> Result<(), HostError>;

    /// Pop the top frame. Never removes the last frame.
    fn pop_frame(&mut self) -> Result<Option<NavigationFrame>, HostError>;

    /// Frames, bottom first.
    fn frames(&self) -> &[NavigationFrame];

    fn current_top_frame(&self) -> Option<&NavigationFrame> {
        self.frames().last()
    }

    fn frame_count(&self) -> usize {
        self.frames().len()
    }

    /// Show a short message to the user.
    fn show_message(&mut self, text: &str);

    /// Check if the persistent side menu (drawer) is open.
    fn is_menu_open(&self) -> bool {
        false
    }

    fn close_menu(&mut self) {}

    fn form_factor(&self) -> FormFactor {
        FormFactor::Phone
    }

    /// Hand a file to the binary/media opener.
    fn open_file(&mut self, download: &FileDownload);

    /// Leave the application flow; back was pressed on the last frame.
    fn exit_flow(&mut self);

    /// Take ownership of the screen built for the top frame.
    fn adopt_screen(&mut self, screen: Box<dyn ScreenInstance>) -> Option<ScreenKey>;

    /// Release everything the host holds for the routing core. Called once,
    /// when the navigator is torn down.
    fn teardown(&mut self) {}
}

/// In-memory [`NavigationHost`].
///
/// # Example
///
/// ```
/// use canvas_navigator::host::{NavigationHost, StackHost};
/// use canvas_navigator::route::{ScreenIdentity, ScreenKind};
/// use canvas_navigator::state::Placement;
///
/// let mut host = StackHost::new();
/// host.push_frame(ScreenIdentity::new(ScreenKind::Dashboard), Placement::Master, true)
///     .unwrap();
/// assert_eq!(host.frame_count(), 1);
///
/// host.teardown();
/// assert!(host
///     .push_frame(ScreenIdentity::new(ScreenKind::Grades), Placement::Master, true)
///     .is_err());
/// ```
#[derive(Debug, Default)]
pub struct StackHost {
    stack: NavigationStack,
    screens: ScreenArena<Box<dyn ScreenInstance>>,
    messages: Vec<String>,
    opened_files: Vec<FileDownload>,
    form_factor: FormFactor,
    menu_open: bool,
    exited: bool,
    torn_down: bool,
}

impl StackHost {
    /// Phone-sized host with an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form_factor(form_factor: FormFactor) -> Self {
        Self {
            form_factor,
            ..Self::default()
        }
    }

    pub fn stack(&self) -> &NavigationStack {
        &self.stack
    }

    /// Back stack tags, bottom first.
    pub fn tags(&self) -> Vec<&str> {
        self.stack.tags()
    }

    /// Messages shown so far, oldest first.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn opened_files(&self) -> &[FileDownload] {
        &self.opened_files
    }

    pub fn set_menu_open(&mut self, open: bool) {
        self.menu_open = open;
    }

    /// Check if back was pressed on the last frame.
    pub fn has_exited(&self) -> bool {
        self.exited
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Screen adopted for a frame.
    pub fn screen(&self, key: ScreenKey) -> Option<&dyn ScreenInstance> {
        self.screens.get(key).map(|screen| &**screen)
    }

    /// Number of live adopted screens.
    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    fn check_alive(&self) -> Result<(), HostError> {
        if self.torn_down {
            Err(HostError::StateLoss)
        } else {
            Ok(())
        }
    }
}

impl NavigationHost for StackHost {
    fn push_frame(
        &mut self,
        identity: ScreenIdentity,
        placement: Placement,
        is_direct: bool,
    ) -> Result<(), HostError> {
        self.check_alive()?;
        trace_log!(
            "Host push {} as {} (direct: {})",
            identity.kind,
            placement,
            is_direct
        );
        self.stack.push(NavigationFrame::new(identity, placement));
        Ok(())
    }

    fn pop_frame(&mut self) -> Result<Option<NavigationFrame>, HostError> {
        self.check_alive()?;
        let popped = self.stack.pop();
        if let Some(key) = popped.as_ref().and_then(|frame| frame.screen_key) {
            self.screens.remove(key);
        }
        Ok(popped)
    }

    fn frames(&self) -> &[NavigationFrame] {
        self.stack.frames()
    }

    fn show_message(&mut self, text: &str) {
        info_log!("Host message: {}", text);
        self.messages.push(text.to_string());
    }

    fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    fn close_menu(&mut self) {
        self.menu_open = false;
    }

    fn form_factor(&self) -> FormFactor {
        self.form_factor
    }

    fn open_file(&mut self, download: &FileDownload) {
        debug_log!("Host opening file {}", download.url);
        self.opened_files.push(download.clone());
    }

    fn exit_flow(&mut self) {
        self.exited = true;
    }

    fn adopt_screen(&mut self, screen: Box<dyn ScreenInstance>) -> Option<ScreenKey> {
        if self.torn_down {
            return None;
        }
        let frame = self.stack.top_mut()?;
        if let Some(old) = frame.screen_key.take() {
            self.screens.remove(old);
        }
        let key = self.screens.insert(screen);
        frame.screen_key = Some(key);
        Some(key)
    }

    fn teardown(&mut self) {
        debug_log!(
            "Host torn down with {} frames and {} screens",
            self.stack.len(),
            self.screens.len()
        );
        self.torn_down = true;
        self.screens.clear();
    }
}
