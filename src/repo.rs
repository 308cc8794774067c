use crate::models::{
    AccountingDay, ActivityLevel, Gender, Goal, HistoricalDayRecord, Macros,
    UserProfile, WeightSample,
};
use crate::storage::{KeyValueStore, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

const USER_NS: &str = "user_prefs";
const SETTINGS_NS: &str = "settings";
const DAILY_NS: &str = "daily_stats";
const HISTORY_NS: &str = "history_prefs";
const WEIGHT_NS: &str = "weight_stats";

const K_CAL: &str = "cal";
const K_P: &str = "p";
const K_F: &str = "f";
const K_C: &str = "c";
const K_LAST_CUTOFF: &str = "last_cutoff_ms";
const K_ENTRIES: &str = "entries_json";
const K_DAYS: &str = "days_json";
const K_WEIGHTS: &str = "weights_json";
const K_ONBOARDING: &str = "onboarding_completed";
const K_LANGUAGE: &str = "language";

pub const DEFAULT_LANGUAGE: &str = "en";

pub trait ProfileRepository {
    fn load_profile(&self) -> UserProfile;
    fn save_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;
    fn onboarding_completed(&self) -> bool;
    fn set_onboarding_completed(&self, completed: bool) -> Result<(), StoreError>;
    fn language(&self) -> String;
    fn set_language(&self, language: &str) -> Result<(), StoreError>;
}

pub trait AccountingRepository {
    fn load_day(&self) -> AccountingDay;
    fn save_totals(&self, totals: &Macros) -> Result<(), StoreError>;
    /// Writes totals, entries and the rollover marker in one batch.
    fn save_day(&self, day: &AccountingDay) -> Result<(), StoreError>;
}

pub trait HistoryRepository {
    fn load_history(&self) -> Vec<HistoricalDayRecord>;
    fn save_history(&self, records: &[HistoricalDayRecord]) -> Result<(), StoreError>;
}

pub trait WeightRepository {
    fn load_weights(&self) -> Vec<WeightSample>;
    fn save_weights(&self, samples: &[WeightSample]) -> Result<(), StoreError>;
}

/// Every repository, backed by one shared key-value store.
#[derive(Clone)]
pub struct KvRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KvRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(crate::storage::MemoryStore::new()))
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    fn load_list<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Vec<T> {
        let Some(raw) = self.store.get(namespace, key) else {
            return Vec::new();
        };
        // stored either as a JSON array or as its string encoding
        let parsed = match raw {
            Value::String(text) => serde_json::from_str::<Value>(&text).unwrap_or_else(|err| {
                warn!(namespace, key, "unreadable list: {err}");
                Value::Null
            }),
            other => other,
        };
        let Value::Array(items) = parsed else {
            return Vec::new();
        };

        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<T>(item) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(namespace, key, "skipping malformed record: {err}");
                    None
                }
            })
            .collect()
    }

    fn list_value<T: Serialize>(items: &[T]) -> Result<Value, StoreError> {
        Ok(Value::String(serde_json::to_string(items)?))
    }
}

impl ProfileRepository for KvRepository {
    fn load_profile(&self) -> UserProfile {
        let store = self.store();
        UserProfile {
            name: store.get_string(USER_NS, "name", ""),
            gender: Gender::parse(&store.get_string(USER_NS, "gender", "")),
            age: store.get_u32(USER_NS, "age"),
            height_cm: store.get_u32(USER_NS, "height"),
            weight_kg: store.get_u32(USER_NS, "weight"),
            activity_level: ActivityLevel::parse(&store.get_string(USER_NS, "activityLevel", "")),
            goal: Goal::parse(&store.get_string(USER_NS, "goal", "")),
            targets: Macros {
                calories: store.get_u32(USER_NS, "dailyCalories"),
                proteins: store.get_u32(USER_NS, "dailyProteins"),
                fats: store.get_u32(USER_NS, "dailyFats"),
                carbs: store.get_u32(USER_NS, "dailyCarbs"),
            },
        }
    }

    fn save_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.store.put_all(
            USER_NS,
            vec![
                ("name", json!(profile.name)),
                ("gender", json!(profile.gender.map(Gender::as_str).unwrap_or(""))),
                ("age", json!(profile.age)),
                ("height", json!(profile.height_cm)),
                ("weight", json!(profile.weight_kg)),
                (
                    "activityLevel",
                    json!(profile.activity_level.map(ActivityLevel::as_str).unwrap_or("")),
                ),
                ("goal", json!(profile.goal.map(Goal::as_str).unwrap_or(""))),
                ("dailyCalories", json!(profile.targets.calories)),
                ("dailyProteins", json!(profile.targets.proteins)),
                ("dailyFats", json!(profile.targets.fats)),
                ("dailyCarbs", json!(profile.targets.carbs)),
            ],
        )
    }

    fn onboarding_completed(&self) -> bool {
        self.store.get_bool(USER_NS, K_ONBOARDING)
    }

    fn set_onboarding_completed(&self, completed: bool) -> Result<(), StoreError> {
        self.store.put(USER_NS, K_ONBOARDING, json!(completed))
    }

    fn language(&self) -> String {
        self.store.get_string(SETTINGS_NS, K_LANGUAGE, DEFAULT_LANGUAGE)
    }

    fn set_language(&self, language: &str) -> Result<(), StoreError> {
        self.store.put(SETTINGS_NS, K_LANGUAGE, json!(language))
    }
}

impl AccountingRepository for KvRepository {
    fn load_day(&self) -> AccountingDay {
        let store = self.store();
        AccountingDay {
            totals: Macros {
                calories: store.get_u32(DAILY_NS, K_CAL),
                proteins: store.get_u32(DAILY_NS, K_P),
                fats: store.get_u32(DAILY_NS, K_F),
                carbs: store.get_u32(DAILY_NS, K_C),
            },
            entries: self.load_list(DAILY_NS, K_ENTRIES),
            last_rollover_ms: store.get_i64(DAILY_NS, K_LAST_CUTOFF),
        }
    }

    fn save_totals(&self, totals: &Macros) -> Result<(), StoreError> {
        self.store.put_all(DAILY_NS, totals_values(totals))
    }

    fn save_day(&self, day: &AccountingDay) -> Result<(), StoreError> {
        let mut values = totals_values(&day.totals);
        values.push((K_ENTRIES, Self::list_value(&day.entries)?));
        if let Some(marker) = day.last_rollover_ms {
            values.push((K_LAST_CUTOFF, json!(marker)));
        }
        self.store.put_all(DAILY_NS, values)
    }
}

impl HistoryRepository for KvRepository {
    fn load_history(&self) -> Vec<HistoricalDayRecord> {
        let mut records: Vec<HistoricalDayRecord> = self.load_list(HISTORY_NS, K_DAYS);
        records.sort_by(|a, b| a.date.cmp(&b.date));
        records
    }

    fn save_history(&self, records: &[HistoricalDayRecord]) -> Result<(), StoreError> {
        self.store.put(HISTORY_NS, K_DAYS, Self::list_value(records)?)
    }
}

impl WeightRepository for KvRepository {
    fn load_weights(&self) -> Vec<WeightSample> {
        let mut samples: Vec<WeightSample> = self.load_list(WEIGHT_NS, K_WEIGHTS);
        samples.retain(|sample| sample.day_start_ms > 0);
        samples.sort_by_key(|sample| sample.day_start_ms);
        samples
    }

    fn save_weights(&self, samples: &[WeightSample]) -> Result<(), StoreError> {
        self.store.put(WEIGHT_NS, K_WEIGHTS, Self::list_value(samples)?)
    }
}

fn totals_values(totals: &Macros) -> Vec<(&'static str, Value)> {
    vec![
        (K_CAL, json!(totals.calories)),
        (K_P, json!(totals.proteins)),
        (K_F, json!(totals.fats)),
        (K_C, json!(totals.carbs)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_reads_defaults() {
        let repo = KvRepository::in_memory();

        assert_eq!(repo.load_day(), AccountingDay::default());
        assert_eq!(repo.load_profile(), UserProfile::default());
        assert!(!repo.onboarding_completed());
        assert_eq!(repo.language(), DEFAULT_LANGUAGE);
        assert!(repo.load_history().is_empty());
        assert!(repo.load_weights().is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let repo = KvRepository::in_memory();
        repo.store()
            .put(
                DAILY_NS,
                K_ENTRIES,
                json!(r#"[{"id": 1, "name": "Rice", "cal": 130}, 42, {"id": 2}]"#),
            )
            .unwrap();

        let day = repo.load_day();
        assert_eq!(day.entries.len(), 2);
        assert_eq!(day.entries[0].calories, 130);
        assert_eq!(day.entries[1].id, 2);
        assert_eq!(day.entries[1].name, "");
    }

    #[test]
    fn unparseable_entry_list_reads_empty() {
        let repo = KvRepository::in_memory();
        repo.store().put(DAILY_NS, K_ENTRIES, json!("[{oops")).unwrap();

        assert!(repo.load_day().entries.is_empty());
    }

    #[test]
    fn profile_round_trips_through_flat_keys() {
        let repo = KvRepository::in_memory();
        let profile = UserProfile {
            name: "Sam".into(),
            gender: Some(Gender::Female),
            age: 34,
            height_cm: 170,
            weight_kg: 64,
            activity_level: Some(ActivityLevel::VeryHigh),
            goal: Some(Goal::Gain),
            targets: Macros {
                calories: 2500,
                proteins: 115,
                fats: 51,
                carbs: 395,
            },
        };

        repo.save_profile(&profile).unwrap();
        assert_eq!(repo.load_profile(), profile);
        assert_eq!(
            repo.store().get_string(USER_NS, "activityLevel", ""),
            "very_high"
        );
    }

    #[test]
    fn history_loads_sorted_by_date() {
        let repo = KvRepository::in_memory();
        repo.save_history(&[
            HistoricalDayRecord::empty("2026-03-05"),
            HistoricalDayRecord::empty("2026-03-01"),
        ])
        .unwrap();

        let dates: Vec<_> = repo.load_history().into_iter().map(|r| r.date).collect();
        assert_eq!(dates, vec!["2026-03-01", "2026-03-05"]);
    }
}
