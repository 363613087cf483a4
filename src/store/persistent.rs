use crate::error::{FragmentError, Result};
use crate::model::{
    Course, DepartmentPartial, FragmentStats, Grade, Student, StudentCourseCount, StudentProfile,
};
use crate::store::FragmentStore;
use anyhow::anyhow;
use hashbrown::HashMap;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CF_STUDENT: &str = "student";
const CF_COURSE: &str = "course";
const CF_GRADE: &str = "grade";
const CF_METADATA: &str = "metadata";

const KEY_MANIFEST: &[u8] = b"manifest";
const STORAGE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StorageManifest {
    format_version: u32,
    app_version: String,
}

/// Fragment stored in its own RocksDB database, one column family per
/// relation. Rows are bincode-encoded.
pub struct PersistentFragmentStore {
    db: DB,
    path: PathBuf,
}

impl std::fmt::Debug for PersistentFragmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentFragmentStore")
            .field("path", &self.path)
            .finish()
    }
}

impl PersistentFragmentStore {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let db = open_db(path)?;
        validate_or_init_manifest(&db)?;
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| FragmentError::Storage(anyhow!("missing column family {name}")))
    }

    fn scan<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = entry?;
            rows.push(bincode::deserialize(&value)?);
        }
        Ok(rows)
    }

    fn count(&self, cf_name: &str) -> Result<usize> {
        let cf = self.cf(cf_name)?;
        let mut count = 0;
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    fn load_grade(&self, key: &[u8]) -> Result<Option<Grade>> {
        let cf = self.cf(CF_GRADE)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl FragmentStore for PersistentFragmentStore {
    fn insert_student(&mut self, student: &Student) -> Result<()> {
        let cf = self.cf(CF_STUDENT)?;
        let key = student.student_id.as_bytes();
        if self.db.get_pinned_cf(cf, key)?.is_some() {
            return Err(FragmentError::DuplicateKey {
                relation: "student",
                key: student.student_id.clone(),
            });
        }
        self.db.put_cf(cf, key, bincode::serialize(student)?)?;
        Ok(())
    }

    fn insert_course(&mut self, course: &Course) -> Result<()> {
        let cf = self.cf(CF_COURSE)?;
        let key = course.course_id.as_bytes();
        if self.db.get_pinned_cf(cf, key)?.is_none() {
            self.db.put_cf(cf, key, bincode::serialize(course)?)?;
        }
        Ok(())
    }

    fn insert_grade(&mut self, grade: &Grade) -> Result<bool> {
        let key = encode_grade_key(&grade.student_id, &grade.course_id);
        if self.load_grade(&key)?.is_some() {
            return Ok(false);
        }
        let cf = self.cf(CF_GRADE)?;
        self.db.put_cf(cf, key, bincode::serialize(grade)?)?;
        Ok(true)
    }

    fn update_grade(&mut self, student_id: &str, course_id: &str, score: i32) -> Result<bool> {
        let key = encode_grade_key(student_id, course_id);
        let Some(mut grade) = self.load_grade(&key)? else {
            return Ok(false);
        };
        grade.score = score;
        let cf = self.cf(CF_GRADE)?;
        self.db.put_cf(cf, key, bincode::serialize(&grade)?)?;
        Ok(true)
    }

    fn delete_grade(&mut self, student_id: &str, course_id: &str) -> Result<bool> {
        let key = encode_grade_key(student_id, course_id);
        if self.load_grade(&key)?.is_none() {
            return Ok(false);
        }
        let cf = self.cf(CF_GRADE)?;
        self.db.delete_cf(cf, key)?;
        Ok(true)
    }

    fn student_profile(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        let cf = self.cf(CF_STUDENT)?;
        match self.db.get_cf(cf, student_id.as_bytes())? {
            Some(bytes) => {
                let student: Student = bincode::deserialize(&bytes)?;
                Ok(Some(student.profile()))
            }
            None => Ok(None),
        }
    }

    fn department_partials(&self) -> Result<Vec<DepartmentPartial>> {
        let departments: HashMap<String, String> = self
            .scan::<Course>(CF_COURSE)?
            .into_iter()
            .map(|course| (course.course_id, course.department))
            .collect();

        let mut totals: BTreeMap<String, (i64, u64)> = BTreeMap::new();
        for grade in self.scan::<Grade>(CF_GRADE)? {
            let Some(department) = departments.get(&grade.course_id) else {
                continue;
            };
            let entry = totals.entry(department.clone()).or_default();
            entry.0 += i64::from(grade.score);
            entry.1 += 1;
        }
        Ok(totals
            .into_iter()
            .map(|(department, (score_sum, grade_count))| DepartmentPartial {
                department,
                score_sum,
                grade_count,
            })
            .collect())
    }

    fn course_counts(&self) -> Result<Vec<StudentCourseCount>> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for grade in self.scan::<Grade>(CF_GRADE)? {
            *counts.entry(grade.student_id).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(student_id, course_count)| StudentCourseCount {
                student_id,
                course_count,
            })
            .collect())
    }

    fn clear(&mut self) -> Result<()> {
        clear_cf(&self.db, CF_STUDENT)?;
        clear_cf(&self.db, CF_COURSE)?;
        clear_cf(&self.db, CF_GRADE)?;
        Ok(())
    }

    fn stats(&self) -> Result<FragmentStats> {
        Ok(FragmentStats {
            students: self.count(CF_STUDENT)?,
            courses: self.count(CF_COURSE)?,
            grades: self.count(CF_GRADE)?,
        })
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl Drop for PersistentFragmentStore {
    fn drop(&mut self) {
        let _ = self.db.flush();
    }
}

fn encode_grade_key(student_id: &str, course_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(student_id.len() + 1 + course_id.len());
    key.extend_from_slice(student_id.as_bytes());
    key.push(0);
    key.extend_from_slice(course_id.as_bytes());
    key
}

fn open_db(path: &Path) -> anyhow::Result<DB> {
    let mut options = Options::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);
    options.set_paranoid_checks(true);
    let cfs = vec![
        ColumnFamilyDescriptor::new(CF_STUDENT, Options::default()),
        ColumnFamilyDescriptor::new(CF_COURSE, Options::default()),
        ColumnFamilyDescriptor::new(CF_GRADE, Options::default()),
        ColumnFamilyDescriptor::new(CF_METADATA, Options::default()),
    ];
    Ok(DB::open_cf_descriptors(&options, path, cfs)?)
}

fn validate_or_init_manifest(db: &DB) -> anyhow::Result<()> {
    let metadata_cf = db
        .cf_handle(CF_METADATA)
        .ok_or_else(|| anyhow!("missing metadata column family"))?;
    if let Some(bytes) = db.get_cf(metadata_cf, KEY_MANIFEST)? {
        let manifest: StorageManifest = bincode::deserialize(&bytes)?;
        if manifest.format_version != STORAGE_FORMAT_VERSION {
            return Err(anyhow!(
                "storage format version mismatch: expected {}, found {}",
                STORAGE_FORMAT_VERSION,
                manifest.format_version
            ));
        }
        return Ok(());
    }

    let manifest = StorageManifest {
        format_version: STORAGE_FORMAT_VERSION,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    db.put_cf(metadata_cf, KEY_MANIFEST, bincode::serialize(&manifest)?)?;
    Ok(())
}

fn clear_cf(db: &DB, cf_name: &str) -> anyhow::Result<()> {
    let cf = db
        .cf_handle(cf_name)
        .ok_or_else(|| anyhow!("missing column family {cf_name}"))?;
    let keys: Vec<Vec<u8>> = db
        .iterator_cf(cf, IteratorMode::Start)
        .map(|entry| entry.map(|(key, _)| key.to_vec()))
        .collect::<Result<Vec<_>, _>>()?;
    if keys.is_empty() {
        return Ok(());
    }
    let mut batch = WriteBatch::default();
    for key in keys {
        batch.delete_cf(cf, key);
    }
    db.write(batch)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rows_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let mut store = PersistentFragmentStore::open(dir.path()).unwrap();
            store.insert_course(&Course::new("C1", "CS")).unwrap();
            store
                .insert_student(&Student::new("S1", "Alice", 20, "a@x.com"))
                .unwrap();
            store.insert_grade(&Grade::new("S1", "C1", 77)).unwrap();
        }

        let store = PersistentFragmentStore::open(dir.path()).unwrap();
        assert_eq!(store.path(), dir.path());
        let profile = store.student_profile("S1").unwrap().unwrap();
        assert_eq!(profile.to_string(), "Alice,a@x.com");
        assert_eq!(
            store.stats().unwrap(),
            FragmentStats {
                students: 1,
                courses: 1,
                grades: 1,
            }
        );
    }

    #[test]
    fn duplicate_student_and_idempotent_grade() {
        let dir = tempdir().unwrap();
        let mut store = PersistentFragmentStore::open(dir.path()).unwrap();
        store
            .insert_student(&Student::new("S1", "Alice", 20, "a@x.com"))
            .unwrap();
        let err = store
            .insert_student(&Student::new("S1", "Alice", 20, "a@x.com"))
            .unwrap_err();
        assert!(err.is_duplicate_key());

        assert!(store.insert_grade(&Grade::new("S1", "C1", 50)).unwrap());
        assert!(!store.insert_grade(&Grade::new("S1", "C1", 99)).unwrap());
        assert!(store.update_grade("S1", "C1", 70).unwrap());
        assert!(!store.update_grade("S1", "C2", 70).unwrap());

        store.insert_course(&Course::new("C1", "CS")).unwrap();
        let partials = store.department_partials().unwrap();
        assert_eq!(partials[0].score_sum, 70);
        assert_eq!(partials[0].grade_count, 1);
    }

    #[test]
    fn grade_keys_do_not_collide_across_students() {
        let dir = tempdir().unwrap();
        let mut store = PersistentFragmentStore::open(dir.path()).unwrap();
        store.insert_grade(&Grade::new("S1", "0C", 10)).unwrap();
        store.insert_grade(&Grade::new("S10", "C", 20)).unwrap();
        let counts = store.course_counts().unwrap();
        assert_eq!(counts.len(), 2);
        assert!(counts.iter().all(|count| count.course_count == 1));
    }

    #[test]
    fn clear_keeps_database_usable() {
        let dir = tempdir().unwrap();
        let mut store = PersistentFragmentStore::open(dir.path()).unwrap();
        store.insert_course(&Course::new("C1", "CS")).unwrap();
        store.insert_grade(&Grade::new("S1", "C1", 10)).unwrap();
        store.clear().unwrap();
        assert_eq!(store.stats().unwrap(), FragmentStats::default());
        assert!(store.delete_grade("S1", "C1").is_ok_and(|removed| !removed));
        store.insert_grade(&Grade::new("S1", "C1", 10)).unwrap();
        assert_eq!(store.stats().unwrap().grades, 1);
    }
}
