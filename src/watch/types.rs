use std::path::{Path, PathBuf};

use crate::utils::path::normalize_path;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }

    /// Map a raw notify event kind. Access events and metadata-only
    /// modifications (mtime/atime/chmod noise) are not changes.
    pub fn from_event_kind(kind: &notify::EventKind) -> Option<Self> {
        use notify::EventKind;
        use notify::event::ModifyKind;

        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Remove(_) => Some(Self::Removed),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Modified),
            _ => None,
        }
    }
}

/// One raw change notification for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Split a notify event into per-path changes, skipping editor
    /// temp/backup artifacts.
    pub fn from_event(event: &notify::Event) -> Vec<Self> {
        let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
            return Vec::new();
        };
        event
            .paths
            .iter()
            .filter(|path| !is_temp_file(path))
            .map(|path| Self::new(normalize_path(path), kind))
            .collect()
    }
}

fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
}
