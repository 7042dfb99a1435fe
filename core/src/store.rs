//! Filesystem output layer.
//!
//! RULE: Only store.rs puts files in the output directory.
//! Producers stage every artifact first and commit them together, so a
//! command either leaves all of its outputs in place or none of them.
//! Outputs a commit would replace are moved aside to `.previous-*` first
//! and moved back if any rename fails, so a failed commit leaves the
//! earlier set intact.

use crate::error::EngagementResult;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    /// Open (or create) the output directory at `root`.
    pub fn open(root: impl AsRef<Path>) -> EngagementResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub fn begin(&self) -> Staging<'_> {
        Staging {
            store: self,
            entries: Vec::new(),
            committed: false,
        }
    }
}

/// A set of staged files awaiting commit. Dropping an uncommitted
/// staging removes everything it wrote.
pub struct Staging<'a> {
    store: &'a OutputStore,
    entries: Vec<StagedFile>,
    committed: bool,
}

struct StagedFile {
    staged: PathBuf,
    target: PathBuf,
    backup: PathBuf,
}

impl Staging<'_> {
    /// Reserve a staging path for a writer that produces the file itself
    /// (e.g. the chart backend). The extension is preserved because image
    /// encoders pick the format from it.
    pub fn reserve(&mut self, file_name: &str) -> PathBuf {
        let staged = self.store.root.join(format!(".partial-{file_name}"));
        self.entries.push(StagedFile {
            staged: staged.clone(),
            target: self.store.path_for(file_name),
            backup: self.store.root.join(format!(".previous-{file_name}")),
        });
        staged
    }

    pub fn stage_bytes(&mut self, file_name: &str, bytes: &[u8]) -> EngagementResult<()> {
        let staged = self.reserve(file_name);
        fs::write(&staged, bytes)?;
        Ok(())
    }

    /// Move every staged file into place. Returns the final paths in
    /// staging order. On error the output directory holds exactly what it
    /// held before the call.
    pub fn commit(mut self) -> EngagementResult<Vec<PathBuf>> {
        if let Some(entry) = self.entries.iter().find(|e| !e.staged.exists()) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("staged file {} was never written", entry.staged.display()),
            )
            .into());
        }

        let mut set_aside: Vec<&StagedFile> = Vec::new();
        for entry in &self.entries {
            if !entry.target.exists() {
                continue;
            }
            if let Err(e) = fs::rename(&entry.target, &entry.backup) {
                rollback(&[], &set_aside);
                return Err(e.into());
            }
            set_aside.push(entry);
        }

        let mut written = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if let Err(e) = fs::rename(&entry.staged, &entry.target) {
                log::warn!("store: commit of {} failed, restoring previous outputs", entry.target.display());
                rollback(&written, &set_aside);
                return Err(e.into());
            }
            log::debug!("store: wrote {}", entry.target.display());
            written.push(entry.target.clone());
        }

        for entry in &set_aside {
            let _ = fs::remove_file(&entry.backup);
        }
        self.committed = true;
        Ok(written)
    }
}

/// Undo a partial commit: drop the new files, then put the old ones back.
fn rollback(written: &[PathBuf], set_aside: &[&StagedFile]) {
    for target in written {
        let _ = fs::remove_file(target);
    }
    for entry in set_aside.iter().rev() {
        if let Err(e) = fs::rename(&entry.backup, &entry.target) {
            log::error!("store: could not restore {}: {e}", entry.target.display());
        }
    }
}

impl Drop for Staging<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for entry in &self.entries {
            if entry.staged.exists() {
                let _ = fs::remove_file(&entry.staged);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("engagement-store-{tag}-{}", std::process::id()))
    }

    #[test]
    fn commit_moves_all_files_into_place() {
        let root = temp_root("commit");
        let store = OutputStore::open(&root).unwrap();
        let mut staging = store.begin();
        staging.stage_bytes("a.txt", b"alpha").unwrap();
        staging.stage_bytes("b.txt", b"beta").unwrap();
        let written = staging.commit().unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(fs::read(store.path_for("a.txt")).unwrap(), b"alpha");
        assert!(!root.join(".partial-a.txt").exists());
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn dropped_staging_leaves_nothing_behind() {
        let root = temp_root("drop");
        let store = OutputStore::open(&root).unwrap();
        {
            let mut staging = store.begin();
            staging.stage_bytes("a.txt", b"alpha").unwrap();
        }
        assert!(!store.path_for("a.txt").exists());
        assert!(!root.join(".partial-a.txt").exists());
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn commit_fails_when_reserved_file_missing() {
        let root = temp_root("missing");
        let store = OutputStore::open(&root).unwrap();
        let mut staging = store.begin();
        staging.stage_bytes("a.txt", b"alpha").unwrap();
        let _ = staging.reserve("chart.png");
        assert!(staging.commit().is_err());
        assert!(!store.path_for("a.txt").exists(), "partial commit");
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn failed_commit_restores_previous_outputs() {
        let root = temp_root("rollback");
        let _ = fs::remove_dir_all(&root);
        let store = OutputStore::open(&root).unwrap();
        let mut first = store.begin();
        first.stage_bytes("a.txt", b"old").unwrap();
        first.commit().unwrap();

        // Both entries share one staged file, so the second rename finds
        // its source already moved and the commit fails midway.
        let mut staging = store.begin();
        staging.stage_bytes("a.txt", b"new").unwrap();
        let _ = staging.reserve("a.txt");
        assert!(staging.commit().is_err());

        assert_eq!(fs::read(store.path_for("a.txt")).unwrap(), b"old");
        assert!(!root.join(".previous-a.txt").exists());
        assert!(!root.join(".partial-a.txt").exists());
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn successful_commit_leaves_no_backups() {
        let root = temp_root("replace");
        let _ = fs::remove_dir_all(&root);
        let store = OutputStore::open(&root).unwrap();
        for body in [&b"one"[..], &b"two"[..]] {
            let mut staging = store.begin();
            staging.stage_bytes("a.txt", body).unwrap();
            staging.commit().unwrap();
        }
        assert_eq!(fs::read(store.path_for("a.txt")).unwrap(), b"two");
        assert!(!root.join(".previous-a.txt").exists());
        fs::remove_dir_all(&root).unwrap();
    }
}
