//! Filesystem watcher for the backing document.
//!
//! Watches the document's parent directory rather than the file itself so that
//! a rename-over replacement (which swaps the inode) keeps being observed.
//! Notifications are filtered by file name and kind, then forwarded to the
//! [`StatsTrigger`]; the watcher never reads the document.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{AccessKind, AccessMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::infra::error::InfraError;

use super::trigger::StatsTrigger;

/// Keeps the OS watch alive for as long as it is held.
pub struct ChangeWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl ChangeWatcher {
    pub fn start(document: &Path, trigger: Arc<StatsTrigger>) -> Result<Self, InfraError> {
        let path = document
            .canonicalize()
            .map_err(|err| InfraError::watcher(format!("{}: {err}", document.display())))?;
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| InfraError::watcher(format!("{} has no parent", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| InfraError::watcher(format!("{} has no file name", path.display())))?;

        let notify_path = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    if is_write_completion(&event.kind) && touches(&event, &file_name) {
                        debug!(event_kind = ?event.kind, "Backing document changed");
                        trigger.document_changed(&notify_path);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Filesystem watcher reported an error");
                }
            },
            Config::default(),
        )
        .map_err(|err| InfraError::watcher(format!("failed to create watcher: {err}")))?;

        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|err| {
                InfraError::watcher(format!("failed to watch {}: {err}", directory.display()))
            })?;

        info!(
            target = "catalog::stats",
            path = %path.display(),
            "Watching backing document for changes"
        );

        Ok(Self {
            _watcher: watcher,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether an event kind marks content that may have just been written.
fn is_write_completion(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(_)
            | EventKind::Access(AccessKind::Close(AccessMode::Write))
    )
}

fn touches(event: &Event, file_name: &OsString) -> bool {
    event
        .paths
        .iter()
        .any(|path| path.file_name() == Some(file_name.as_os_str()))
}

#[cfg(test)]
mod tests {
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};

    use super::*;

    #[test]
    fn write_kinds_trigger() {
        assert!(is_write_completion(&EventKind::Create(CreateKind::File)));
        assert!(is_write_completion(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(is_write_completion(&EventKind::Access(AccessKind::Close(
            AccessMode::Write
        ))));
    }

    #[test]
    fn read_and_remove_kinds_do_not_trigger() {
        assert!(!is_write_completion(&EventKind::Access(AccessKind::Read)));
        assert!(!is_write_completion(&EventKind::Access(AccessKind::Close(
            AccessMode::Read
        ))));
        assert!(!is_write_completion(&EventKind::Remove(RemoveKind::File)));
    }

    #[test]
    fn only_the_document_name_matches() {
        let name = OsString::from("items.json");
        let hit = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/srv/data/items.json"));
        let miss = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/srv/data/.tmpA1b2C3"));

        assert!(touches(&hit, &name));
        assert!(!touches(&miss, &name));
    }
}
