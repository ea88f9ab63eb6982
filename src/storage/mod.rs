// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::course::Course;
use crate::utils::error::StorageError;

/// Counters for one crawl of one site.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub site_id: String,
    pub university_title: String,
    pub run_date: Option<NaiveDate>,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub records: usize,
    pub dropped: usize,
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// `<base>/<site>/`, created on first use.
    pub fn site_dir(&self, site_id: &str) -> Result<PathBuf, StorageError> {
        let target_dir = self.base_dir.join(site_id);
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }
        Ok(target_dir)
    }

    pub fn debug_dir(&self, site_id: &str) -> Result<PathBuf, StorageError> {
        let target_dir = self.site_dir(site_id)?.join("debug");
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }
        Ok(target_dir)
    }

    fn file_stem(site_id: &str, run_date: NaiveDate) -> String {
        format!("{}_graduate_courses_{}", site_id, run_date.format("%Y-%m-%d"))
    }

    /// Writes the run's records as one pretty-printed JSON array.
    pub fn save_courses(&self, site_id: &str, run_date: NaiveDate, courses: &[Course]) -> Result<PathBuf, StorageError> {
        let file_path = self
            .site_dir(site_id)?
            .join(format!("{}.json", Self::file_stem(site_id, run_date)));

        let json = serde_json::to_string_pretty(courses)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, json).map_err(StorageError::IoError)?;

        tracing::info!("Saved {} course(s) to {}", courses.len(), file_path.display());
        Ok(file_path)
    }

    /// Saves the run summary next to the records in JSON format
    pub fn save_run_metadata(&self, summary: &RunSummary) -> Result<PathBuf, StorageError> {
        let run_date = summary.run_date.unwrap_or_else(|| chrono::Utc::now().date_naive());
        let file_path = self
            .site_dir(&summary.site_id)?
            .join(format!("{}_meta.json", Self::file_stem(&summary.site_id, run_date)));

        let metadata = serde_json::json!({
            "site_id": summary.site_id,
            "university_title": summary.university_title,
            "run_date": run_date.format("%Y-%m-%d").to_string(),
            "pages_fetched": summary.pages_fetched,
            "pages_failed": summary.pages_failed,
            "records": summary.records,
            "dropped": summary.dropped,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, metadata_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::Date;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_save_courses_names_file_by_site_and_date() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("output")).unwrap();
        let course = Course {
            title: "Data Science".to_string(),
            university_title: "Swansea University".to_string(),
            start_dates: vec![Date::new("Sep 2024")],
            ..Course::default()
        };

        let path = storage.save_courses("swansea", run_date(), &[course.clone()]).unwrap();
        assert!(path.ends_with("swansea/swansea_graduate_courses_2024-05-01.json"));

        let saved: Vec<Course> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, vec![course]);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"university_title\""));
        assert!(raw.contains("\"start_dates\""));
    }

    #[test]
    fn test_save_run_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let summary = RunSummary {
            site_id: "heriot".to_string(),
            university_title: "Heriot-Watt University".to_string(),
            run_date: Some(run_date()),
            pages_fetched: 3,
            pages_failed: 1,
            records: 4,
            dropped: 0,
        };

        let path = storage.save_run_metadata(&summary).unwrap();
        assert!(path.ends_with("heriot/heriot_graduate_courses_2024-05-01_meta.json"));

        let meta: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(meta["records"], 4);
        assert_eq!(meta["pages_failed"], 1);
        assert_eq!(meta["run_date"], "2024-05-01");
    }
}
