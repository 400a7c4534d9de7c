use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::Utc;

use crate::config::Config;
use crate::store::repository::{
    self, QUESTIONS_KEY, Repository, SESSION_KEY, SETTINGS_KEY, USERS_KEY, load_or_default,
    stats_key, uid_from_stats_key,
};
use crate::store::schema::{EXPORT_VERSION, ExportData, StatsData};

/// One JSON file per key under `base_dir`, written via `.tmp` + rename.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(Config::default().data_path())
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn sanitize_key(key: &str) -> String {
        key.chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.json", Self::sanitize_key(key)))
    }

    fn write_file(path: &Path, contents: &str) -> Result<()> {
        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Bundle every record plus the config into one versioned document.
    pub fn export_all(&self, config: &Config) -> Result<ExportData> {
        let mut stats = BTreeMap::new();
        for key in self.keys()? {
            if let Some(uid) = uid_from_stats_key(&key) {
                stats.insert(uid.to_string(), load_or_default::<StatsData>(self, &key));
            }
        }
        Ok(ExportData {
            quizdeck_export_version: EXPORT_VERSION,
            exported_at: Utc::now(),
            config: config.clone(),
            questions: repository::load_questions(self),
            users: load_or_default(self, USERS_KEY),
            session: load_or_default(self, SESSION_KEY),
            settings: load_or_default(self, SETTINGS_KEY),
            stats,
        })
    }

    /// Transactional import: every record is staged to `.tmp` first; the
    /// commit renames originals to `.bak` and rolls back on any failure.
    pub fn import_all(&self, data: &ExportData) -> Result<()> {
        if data.quizdeck_export_version != EXPORT_VERSION {
            bail!(
                "Unsupported export version: {} (expected {})",
                data.quizdeck_export_version,
                EXPORT_VERSION
            );
        }

        let mut records: Vec<(String, String)> = vec![
            (
                QUESTIONS_KEY.to_string(),
                serde_json::to_string_pretty(&data.questions)?,
            ),
            (USERS_KEY.to_string(), serde_json::to_string_pretty(&data.users)?),
            (
                SESSION_KEY.to_string(),
                serde_json::to_string_pretty(&data.session)?,
            ),
            (
                SETTINGS_KEY.to_string(),
                serde_json::to_string_pretty(&data.settings)?,
            ),
        ];
        for (uid, stats) in &data.stats {
            records.push((stats_key(uid), serde_json::to_string_pretty(stats)?));
        }

        let staged = self.stage(&records)?;
        self.commit(&records, &staged)?;
        log::info!("imported {} records into {}", records.len(), self.base_dir.display());
        Ok(())
    }

    fn stage(&self, records: &[(String, String)]) -> Result<Vec<PathBuf>> {
        let mut staged: Vec<PathBuf> = Vec::new();
        for (key, json) in records {
            let tmp_path = self.file_path(key).with_extension("json.tmp");
            if let Err(e) = Self::write_file(&tmp_path, json) {
                for tmp in &staged {
                    let _ = fs::remove_file(tmp);
                }
                bail!("Import failed during staging: {e}");
            }
            staged.push(tmp_path);
        }
        Ok(staged)
    }

    fn commit(&self, records: &[(String, String)], staged: &[PathBuf]) -> Result<()> {
        // (final, backup, had_original) for rollback
        let mut committed: Vec<(PathBuf, PathBuf, bool)> = Vec::new();
        let rollback = |committed: &[(PathBuf, PathBuf, bool)], leftover: &[PathBuf]| {
            for (final_path, bak_path, had_original) in committed {
                if *had_original {
                    let _ = fs::rename(bak_path, final_path);
                } else {
                    let _ = fs::remove_file(final_path);
                }
            }
            for tmp in leftover {
                let _ = fs::remove_file(tmp);
            }
        };

        for (i, (key, _)) in records.iter().enumerate() {
            let final_path = self.file_path(key);
            let bak_path = final_path.with_extension("json.bak");
            let had_original = final_path.exists();

            if had_original && let Err(e) = fs::rename(&final_path, &bak_path) {
                rollback(&committed, staged);
                bail!("Import failed during commit (backup): {e}");
            }

            if let Err(e) = fs::rename(&staged[i], &final_path) {
                if had_original {
                    let _ = fs::rename(&bak_path, &final_path);
                }
                rollback(&committed, &staged[i..]);
                bail!("Import failed during commit (rename): {e}");
            }

            committed.push((final_path, bak_path, had_original));
        }

        for (_, bak_path, had_original) in &committed {
            if *had_original {
                let _ = fs::remove_file(bak_path);
            }
        }
        Ok(())
    }

    /// Remove `.bak` files left behind by an interrupted import.
    /// Returns true if any were found.
    pub fn check_interrupted_import(&self) -> bool {
        let Ok(entries) = fs::read_dir(&self.base_dir) else {
            return false;
        };
        let mut found = false;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|x| x.to_str()) == Some("bak") {
                found = true;
                let _ = fs::remove_file(&path);
            }
        }
        found
    }
}

impl Repository for JsonStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.file_path(key);
        if path.exists() {
            Ok(Some(fs::read_to_string(&path)?))
        } else {
            Ok(None)
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.file_path(key);
        let tmp_path = path.with_extension("json.tmp");
        Self::write_file(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if let Some(key) = name.strip_suffix(".json") {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
