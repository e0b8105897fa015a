use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use chrono::{Datelike, NaiveDate};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::habit::Habit;
use crate::medication::Medication;

/// Everything medtrack persists, stored as one JSON document.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Database {
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub habits: Vec<Habit>,
    /// Medication intake marks for `intake_day`, keyed `"<medication_name>-<slot>"`.
    #[serde(default)]
    pub intake: BTreeMap<String, bool>,
    #[serde(default)]
    pub intake_day: String,
    /// Habit marks for `habit_week`, keyed `"<habit id>-<weekday>"` (Monday is 0).
    #[serde(default)]
    pub habit_marks: BTreeMap<String, bool>,
    #[serde(default)]
    pub habit_week: String,
}

impl Database {
    /// Loads the database from disk.
    ///
    /// A missing file is an empty database. A file holding just a list of
    /// medications (the pre-habit format) is migrated in place. If the file is
    /// corrupted, a backup is written next to it and an empty database returned.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no data file at {}, starting empty", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| TrackerError::io(path, e))?;

        if let Ok(db) = serde_json::from_str::<Database>(&contents) {
            return Ok(db);
        }

        if let Ok(medications) = serde_json::from_str::<Vec<Medication>>(&contents) {
            info!("migrating {} to the current format", path.display());
            let db = Database {
                medications,
                ..Self::default()
            };
            db.save(path)?;
            return Ok(db);
        }

        warn!("data file {} is corrupted and cannot be parsed", path.display());
        let backup_path = path.with_extension("json.corrupted");
        match fs::copy(path, &backup_path) {
            Ok(_) => warn!("backup written to {}", backup_path.display()),
            Err(e) => warn!("failed to back up corrupted data file: {}", e),
        }

        Ok(Self::default())
    }

    /// Saves the database atomically (temp file, then rename).
    ///
    /// On Unix the file is restricted to its owner (0600).
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| TrackerError::io(parent, e))?;
            }
        }

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &json).map_err(|e| TrackerError::io(&temp_path, e))?;

        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(TrackerError::io(path, e));
        }

        #[cfg(unix)]
        {
            if let Ok(metadata) = fs::metadata(path) {
                let mut perms = metadata.permissions();
                perms.set_mode(0o600);
                if let Err(e) = fs::set_permissions(path, perms) {
                    warn!("failed to set permissions on {}: {}", path.display(), e);
                }
            }
        }

        debug!("saved {}", path.display());
        Ok(())
    }

    /// Drops intake marks from an earlier day and habit marks from an earlier
    /// week. Returns true if anything changed.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        let mut changed = false;

        let day = today.format("%Y-%m-%d").to_string();
        if self.intake_day != day {
            if !self.intake.is_empty() {
                info!("new day, clearing {} intake mark(s)", self.intake.len());
            }
            self.intake.clear();
            self.intake_day = day;
            changed = true;
        }

        let iso = today.iso_week();
        let week = format!("{}-W{:02}", iso.year(), iso.week());
        if self.habit_week != week {
            if !self.habit_marks.is_empty() {
                info!("new week, clearing {} habit mark(s)", self.habit_marks.len());
            }
            self.habit_marks.clear();
            self.habit_week = week;
            changed = true;
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::DoseUnit;
    use tempfile::tempdir;

    fn sample_medication() -> Medication {
        Medication {
            medication_name: "Metoprolol 50 mg tabletten".to_string(),
            dose_amount: 50,
            dose_unit: DoseUnit::Milligram,
            amount_per_day: 1,
            time_to_take: vec!["08:00:00".to_string()],
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let db = Database::load(&dir.path().join("data.json")).unwrap();
        assert_eq!(db, Database::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");

        let mut db = Database::default();
        db.medications.push(sample_medication());
        db.intake.insert("Metoprolol 50 mg tabletten-0".to_string(), true);
        db.save(&path).unwrap();

        assert_eq!(Database::load(&path).unwrap(), db);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        Database::default().save(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_migrates_bare_medication_list() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let old = serde_json::to_string(&vec![sample_medication()]).unwrap();
        fs::write(&path, old).unwrap();

        let db = Database::load(&path).unwrap();
        assert_eq!(db.medications, vec![sample_medication()]);

        let rewritten: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(rewritten.get("medications").is_some());
    }

    #[test]
    fn test_corrupted_file_is_backed_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{ not json").unwrap();

        let db = Database::load(&path).unwrap();
        assert_eq!(db, Database::default());

        let backup = path.with_extension("json.corrupted");
        assert_eq!(fs::read_to_string(backup).unwrap(), "{ not json");
    }

    #[test]
    fn test_roll_over_clears_stale_marks() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let next_monday = NaiveDate::from_ymd_opt(2026, 10, 26).unwrap();

        let mut db = Database::default();
        assert!(db.roll_over(monday));
        db.intake.insert("a-0".to_string(), true);
        db.habit_marks.insert("1-0".to_string(), true);

        assert!(!db.roll_over(monday));
        assert_eq!(db.intake.len(), 1);

        assert!(db.roll_over(tuesday));
        assert!(db.intake.is_empty());
        assert_eq!(db.habit_marks.len(), 1);

        assert!(db.roll_over(next_monday));
        assert!(db.habit_marks.is_empty());
        assert_eq!(db.habit_week, "2026-W44");
    }
}
