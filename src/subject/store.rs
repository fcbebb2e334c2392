//! Subject persistence
//!
//! Handles saving and loading subjects to/from a flat JSON file.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::config::data_dir;

use super::{Subject, SubjectId};

const SUBJECTS_FILE: &str = "subjects.json";

/// Shared handle to a subject store
///
/// Coordinators and the manager share one store on a single thread, so
/// `Rc<RefCell<..>>` is the ownership model.
pub type SharedSubjectStore = Rc<RefCell<dyn SubjectStore>>;

/// Persistence contract for subjects
///
/// Implementations are write-through: mutations hit the backing store
/// immediately. Callers treat failures as best-effort.
pub trait SubjectStore {
    /// Upsert a subject by id
    fn save(&mut self, subject: Subject) -> Result<()>;

    /// Get all persisted subjects
    fn find_all(&self) -> Vec<Subject>;

    /// Look up a subject by id
    fn find_by_id(&self, id: SubjectId) -> Option<Subject>;

    /// Delete a subject by id
    fn delete_by_id(&mut self, id: SubjectId) -> Result<()>;
}

/// Flat-JSON subject store
#[derive(Debug)]
pub struct JsonSubjectStore {
    subjects: Vec<Subject>,
    store_path: PathBuf,
}

impl JsonSubjectStore {
    /// Open the store at the default data location
    pub fn open() -> Self {
        Self::open_at(data_dir().join(SUBJECTS_FILE))
    }

    /// Open the store at a specific path (for testing)
    pub fn open_at(path: PathBuf) -> Self {
        let subjects = match Self::load_from(&path) {
            Ok(subjects) => subjects,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load subjects, starting empty"
                );
                Vec::new()
            }
        };
        Self {
            subjects,
            store_path: path,
        }
    }

    /// Get the path to the store file
    pub fn path(&self) -> &Path {
        &self.store_path
    }

    fn load_from(path: &Path) -> Result<Vec<Subject>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(path).context("Failed to read subjects file")?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).context("Failed to parse subjects file")
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.store_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create directory for subjects file")?;
        }

        let content =
            serde_json::to_string_pretty(&self.subjects).context("Failed to serialize subjects")?;

        std::fs::write(&self.store_path, content).context("Failed to write subjects file")?;

        Ok(())
    }
}

impl SubjectStore for JsonSubjectStore {
    fn save(&mut self, subject: Subject) -> Result<()> {
        match self.subjects.iter_mut().find(|s| s.id == subject.id) {
            Some(existing) => *existing = subject,
            None => self.subjects.push(subject),
        }
        self.persist()
    }

    fn find_all(&self) -> Vec<Subject> {
        self.subjects.clone()
    }

    fn find_by_id(&self, id: SubjectId) -> Option<Subject> {
        self.subjects.iter().find(|s| s.id == id).cloned()
    }

    fn delete_by_id(&mut self, id: SubjectId) -> Result<()> {
        self.subjects.retain(|s| s.id != id);
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_store(temp_dir: &TempDir) -> JsonSubjectStore {
        JsonSubjectStore::open_at(temp_dir.path().join(SUBJECTS_FILE))
    }

    #[test]
    fn test_open_nonexistent_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        assert!(store.find_all().is_empty());
    }

    #[test]
    fn test_save_and_find() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir);

        let subject = Subject::new("Algebra".to_string(), Duration::from_secs(3600));
        let id = subject.id;
        store.save(subject).unwrap();

        assert_eq!(store.find_all().len(), 1);
        assert!(store.find_by_id(id).is_some());
        assert!(store.find_by_id(SubjectId::new_v4()).is_none());
    }

    #[test]
    fn test_save_upserts() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir);

        let mut subject = Subject::new("Algebra".to_string(), Duration::from_secs(3600));
        let id = subject.id;
        store.save(subject.clone()).unwrap();

        subject.add_time_spent(Duration::from_secs(600));
        store.save(subject).unwrap();

        assert_eq!(store.find_all().len(), 1);
        let loaded = store.find_by_id(id).unwrap();
        assert_eq!(loaded.time_spent, Duration::from_secs(600));
    }

    #[test]
    fn test_delete_by_id() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir);

        let subject = Subject::new("Algebra".to_string(), Duration::from_secs(3600));
        let id = subject.id;
        store.save(subject).unwrap();

        store.delete_by_id(id).unwrap();
        assert!(store.find_all().is_empty());
        assert!(store.find_by_id(id).is_none());
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SUBJECTS_FILE);

        let subject = Subject::new("Physics".to_string(), Duration::from_secs(7200));
        let id = subject.id;
        {
            let mut store = JsonSubjectStore::open_at(path.clone());
            store.save(subject).unwrap();
        }

        let reopened = JsonSubjectStore::open_at(path);
        assert_eq!(reopened.find_all().len(), 1);
        assert_eq!(reopened.find_by_id(id).unwrap().name, "Physics");
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SUBJECTS_FILE);
        std::fs::write(&path, "not json at all").unwrap();

        let store = JsonSubjectStore::open_at(path);
        assert!(store.find_all().is_empty());
    }
}
