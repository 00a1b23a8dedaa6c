//! The contract between the coordinator and the editor side of the
//! integration: the input events it consumes and the RPC surface it
//! drives.

use std::time::Duration;

use futures_util::future::BoxFuture;
use pum_core::{CompleteOption, Config, InsertChange, Item, PopupChangeEvent};

/// Raw editor input events, in the order the bridge observed them. The
/// coordinator owns the interpretation; bridges only translate.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A key was pressed in insert mode, before the text changed.
    InsertCharPre(char),
    InsertEnter(u64),
    InsertLeave,
    /// Insert-mode text change while the popup is hidden.
    TextChangedI(u64, InsertChange),
    /// Insert-mode text change while the popup is visible.
    TextChangedP(u64, InsertChange),
    /// The editor closed the popup; the payload is the committed row, if
    /// any.
    CompleteDone(Option<Item>),
    /// The highlighted popup row changed.
    MenuPopupChanged(PopupChangeEvent),
    /// The user reconfigured the engine. Applies to the live config
    /// without restarting a running session.
    ConfigChanged(Config),
}

/// Commands the coordinator sends to the editor. Commands arrive in
/// batches through [`EditorBridge::notify`]; a batch must be applied as
/// one atomic notification.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    PopupShow {
        /// 1-based screen column the popup anchors to.
        col: u32,
        rows: Vec<Item>,
        /// Index to preselect, -1 for none.
        preselect: i64,
    },
    PopupHide,
    SetCandidates(Vec<Item>),
    /// Push the completion options the popup needs while a session runs.
    SetCompleteopt(String),
    /// Put back whatever the user had before the session pushed its own.
    RestoreCompleteopt,
    /// Map the digit keys 1..9 to select-and-commit.
    MapNumberSelect,
    UnmapNumberSelect,
    SetLine {
        lnum: u32,
        text: String,
    },
    MoveCursor {
        lnum: u32,
        col: u32,
    },
    /// A single-line error message for the user.
    EchoError(String),
}

/// The editor RPC surface the coordinator drives.
///
/// `notify` is fire-and-forget and must stay cheap; the queries suspend
/// the coordinator and are answered from the editor's current state.
pub trait EditorBridge: Send + Sync + 'static {
    fn notify(&self, batch: Vec<EditorCommand>) -> anyhow::Result<()>;

    /// Where a completion would start right now, or `None` when the
    /// cursor position supports no completion.
    fn get_complete_option(&self) -> BoxFuture<'static, anyhow::Result<Option<CompleteOption>>>;

    /// Current line text from start to cursor.
    fn pretext(&self) -> BoxFuture<'static, anyhow::Result<String>>;

    /// Whether a popup menu is currently visible, ours or anyone else's.
    fn pum_visible(&self) -> BoxFuture<'static, anyhow::Result<bool>>;
}

/// Placement of the documentation float next to the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FloatBounds {
    pub col: u32,
    pub row: u32,
    pub height: u32,
    pub width: u32,
    pub scrollbar: bool,
}

impl From<&PopupChangeEvent> for FloatBounds {
    fn from(ev: &PopupChangeEvent) -> FloatBounds {
        FloatBounds {
            col: ev.col,
            row: ev.row,
            height: ev.height,
            width: ev.width,
            scrollbar: ev.scrollbar,
        }
    }
}

/// Handle to the editor's documentation float.
pub trait FloatingWindow: Send + Sync + 'static {
    /// Render `docs` next to the popup. The handle is canceled when the
    /// selection moves on; a slow renderer should stop painting then.
    fn show(
        &self,
        docs: Vec<pum_core::Documentation>,
        bounds: FloatBounds,
        handle: pum_event::TaskHandle,
    ) -> anyhow::Result<()>;

    fn close(&self);
}

/// The flavor of editor on the other side of the bridge. Legacy editors
/// repaint slower, so selection changes are debounced harder before a
/// resolve is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    Native,
    Legacy,
}

impl EditorKind {
    pub(crate) fn selection_debounce(self) -> Duration {
        match self {
            EditorKind::Native => Duration::from_millis(100),
            EditorKind::Legacy => Duration::from_millis(200),
        }
    }
}
