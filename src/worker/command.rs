//! Requests accepted by the worker task

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::oneshot;

use super::error::WorkerError;
use crate::cancel::CancelToken;
use crate::playback::{PlaybackId, PlaybackSession};
use crate::session::SessionHandle;
use crate::sftp::{
    Activation, BulkResult, ListingRow, NavigationContext, ParentOutcome, RecursiveListing,
};
use crate::vault::ServerProfile;

pub type Reply<T> = oneshot::Sender<Result<T, WorkerError>>;

/// A new session and the listing of the initial path.
///
/// The session stays up when only the listing fails; `listing_error` says
/// why and `navigation` is then empty.
#[derive(Debug, Serialize)]
pub struct Connected {
    pub handle: SessionHandle,
    pub navigation: NavigationSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_error: Option<WorkerError>,
}

/// What the presentation layer needs to draw the browser
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationSnapshot {
    #[serde(flatten)]
    pub context: NavigationContext,
    pub rows: Vec<ListingRow>,
    pub selected: Option<ListingRow>,
}

impl NavigationSnapshot {
    /// Row labels in display order
    pub fn labels(&self) -> Vec<String> {
        self.rows.iter().map(ListingRow::label).collect()
    }
}

pub enum WorkerCommand {
    SaveProfile {
        profile: ServerProfile,
        reply_tx: Reply<()>,
    },
    LoadProfile {
        reply_tx: Reply<ServerProfile>,
    },
    DeleteProfile {
        reply_tx: Reply<()>,
    },

    Connect {
        profile: ServerProfile,
        cancel: CancelToken,
        reply_tx: Reply<Connected>,
    },
    AutoLogin {
        cancel: CancelToken,
        reply_tx: Reply<Option<Connected>>,
    },
    Disconnect {
        reply_tx: Reply<bool>,
    },

    List {
        path: String,
        reply_tx: Reply<NavigationSnapshot>,
    },
    NavigateInto {
        name: String,
        reply_tx: Reply<NavigationSnapshot>,
    },
    NavigateParent {
        reply_tx: Reply<ParentOutcome>,
    },
    Select {
        index: usize,
        reply_tx: Reply<Option<ListingRow>>,
    },
    Activate {
        index: usize,
        reply_tx: Reply<Activation>,
    },
    DeleteSelected {
        reply_tx: Reply<String>,
    },
    Navigation {
        reply_tx: Reply<NavigationSnapshot>,
    },

    ListRecursive {
        /// `None` targets the selected directory, else the current one
        path: Option<String>,
        reply_tx: Reply<RecursiveListing>,
    },
    DeleteMany {
        paths: Vec<String>,
        reply_tx: Reply<BulkResult>,
    },

    Stage {
        remote_path: String,
        cancel: CancelToken,
        reply_tx: Reply<PathBuf>,
    },
    StartEmbedded {
        local_path: PathBuf,
        reply_tx: Reply<PlaybackSession>,
    },
    Seek {
        id: PlaybackId,
        position_secs: f64,
        reply_tx: Reply<PlaybackSession>,
    },
    PollPosition {
        id: PlaybackId,
        reply_tx: Reply<Option<f64>>,
    },
    SwitchToExternal {
        id: PlaybackId,
        reply_tx: Reply<PlaybackSession>,
    },
    PlayExternal {
        local_path: PathBuf,
        reply_tx: Reply<()>,
    },
    Stop {
        id: PlaybackId,
        reply_tx: Reply<()>,
    },
    SetStagingDir {
        dir: PathBuf,
        reply_tx: Reply<()>,
    },

    Shutdown {
        reply_tx: oneshot::Sender<()>,
    },
}
