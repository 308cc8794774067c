//! The live accounting day.
//!
//! Every public operation first checks whether a cutoff has passed since the
//! last fold and, if so, archives the outgoing totals and starts a new day,
//! so callers never observe a stale day.

use crate::clock::Clock;
use crate::cutoff::{
    accounting_date, current_accounting_date, date_key, most_recent_cutoff, next_cutoff,
};
use crate::history;
use crate::models::{AccountingDay, DailyTotals, FoodEntry, Macros};
use crate::nutrition::scale_to_quantity;
use crate::repo::{AccountingRepository, HistoryRepository};
use crate::storage::StoreError;
use chrono::{DateTime, NaiveDate, NaiveTime};
use tracing::{debug, info, warn};

pub const DEFAULT_FOOD_NAME: &str = "Food";

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Signed change applied to the running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MacroDelta {
    pub calories: i64,
    pub proteins: i64,
    pub fats: i64,
    pub carbs: i64,
}

impl MacroDelta {
    pub fn negated(self) -> Self {
        Self {
            calories: -self.calories,
            proteins: -self.proteins,
            fats: -self.fats,
            carbs: -self.carbs,
        }
    }
}

impl From<Macros> for MacroDelta {
    fn from(macros: Macros) -> Self {
        Self {
            calories: i64::from(macros.calories),
            proteins: i64::from(macros.proteins),
            fats: i64::from(macros.fats),
            carbs: i64::from(macros.carbs),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rollover {
    /// The day is already current.
    Current,
    /// No marker was stored yet; it now points at the latest cutoff.
    Initialized,
    Folded { date: NaiveDate, totals: DailyTotals },
}

pub struct DailyLedger<R, C> {
    repo: R,
    clock: C,
    cutoff: NaiveTime,
    default_food_name: String,
}

impl<R, C> DailyLedger<R, C>
where
    R: AccountingRepository + HistoryRepository,
    C: Clock,
{
    pub fn new(repo: R, clock: C, cutoff: NaiveTime) -> Self {
        Self {
            repo,
            clock,
            cutoff,
            default_food_name: DEFAULT_FOOD_NAME.to_owned(),
        }
    }

    pub fn with_default_food_name(mut self, name: impl Into<String>) -> Self {
        self.default_food_name = name.into();
        self
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn cutoff(&self) -> NaiveTime {
        self.cutoff
    }

    pub fn most_recent_cutoff(&self) -> DateTime<C::Tz> {
        most_recent_cutoff(&self.clock.now(), self.cutoff)
    }

    pub fn next_cutoff(&self) -> DateTime<C::Tz> {
        next_cutoff(&self.clock.now(), self.cutoff)
    }

    /// Date the live day will be archived under.
    pub fn accounting_date(&self) -> NaiveDate {
        current_accounting_date(&self.clock.now(), self.cutoff)
    }

    pub fn totals(&self) -> Result<DailyTotals, StoreError> {
        self.ensure_rollover()?;
        Ok(self.repo.load_day().totals)
    }

    /// Entries of the live day, newest first.
    pub fn entries(&self) -> Result<Vec<FoodEntry>, StoreError> {
        self.ensure_rollover()?;
        Ok(self.repo.load_day().entries)
    }

    pub fn add_entry(
        &self,
        name: &str,
        per_100g: Macros,
        quantity_grams: u32,
    ) -> Result<FoodEntry, StoreError> {
        self.ensure_rollover()?;
        let mut day = self.repo.load_day();
        let now_ms = self.clock.now().timestamp_millis();

        let id = match day.entries.iter().map(|entry| entry.id).max() {
            Some(max) if max >= now_ms => max + 1,
            _ => now_ms,
        };
        let name = name.trim();
        let scaled = scale_to_quantity(per_100g, i64::from(quantity_grams));
        let entry = FoodEntry {
            id,
            name: if name.is_empty() {
                self.default_food_name.clone()
            } else {
                name.to_owned()
            },
            calories: scaled.calories,
            proteins: scaled.proteins,
            fats: scaled.fats,
            carbs: scaled.carbs,
            quantity_grams,
            created_at_ms: now_ms,
        };

        day.entries.insert(0, entry.clone());
        day.totals = apply_delta(day.totals, MacroDelta::from(scaled));
        // entries and totals go out in one batch so they cannot diverge
        self.repo.save_day(&day)?;
        debug!(id = entry.id, calories = entry.calories, "added food entry");
        Ok(entry)
    }

    /// Removes an entry and takes its macros back out of the totals. Unknown
    /// ids are ignored.
    pub fn remove_entry(&self, id: i64) -> Result<Option<FoodEntry>, StoreError> {
        self.ensure_rollover()?;
        let mut day = self.repo.load_day();
        let Some(index) = day.entries.iter().position(|entry| entry.id == id) else {
            debug!(id, "remove of unknown entry ignored");
            return Ok(None);
        };

        let removed = day.entries.remove(index);
        day.totals = apply_delta(day.totals, MacroDelta::from(removed.macros()).negated());
        self.repo.save_day(&day)?;
        Ok(Some(removed))
    }

    /// Adds `delta` to the totals without touching the entry list.
    pub fn adjust(&self, delta: MacroDelta) -> Result<DailyTotals, StoreError> {
        self.ensure_rollover()?;
        let day = self.repo.load_day();
        let totals = apply_delta(day.totals, delta);
        self.repo.save_totals(&totals)?;
        Ok(totals)
    }

    /// Archives the current totals under the day ending at the cutoff `at`,
    /// then starts an empty day. The marker becomes the latest cutoff that
    /// has passed, so the next check does not fold again.
    pub fn force_reset(&self, at: DateTime<C::Tz>) -> Result<Rollover, StoreError> {
        let day = self.repo.load_day();
        let date = accounting_date(&at);
        let totals = self.fold(&day, date, &self.most_recent_cutoff())?;
        info!(date = %date_key(date), "accounting day reset on request");
        Ok(Rollover::Folded { date, totals })
    }

    /// User-initiated reset: catches up on any passed cutoff, then archives
    /// the live day under its own date.
    pub fn reset_now(&self) -> Result<Rollover, StoreError> {
        self.ensure_rollover()?;
        self.force_reset(self.next_cutoff())
    }

    /// Folds the live day into history when a cutoff has passed since the
    /// last fold. Safe to call any number of times.
    ///
    /// Several missed cutoffs are folded once, at the latest one: days with
    /// no activity at all get no history record.
    pub fn ensure_rollover(&self) -> Result<Rollover, StoreError> {
        let cutoff = self.most_recent_cutoff();
        let marker = cutoff.timestamp_millis();
        let day = self.repo.load_day();

        match day.last_rollover_ms {
            None => {
                self.repo.save_day(&AccountingDay {
                    last_rollover_ms: Some(marker),
                    ..day
                })?;
                debug!(marker, "initialized rollover marker");
                Ok(Rollover::Initialized)
            }
            Some(last) if last >= marker => Ok(Rollover::Current),
            Some(last) => {
                if marker - last > DAY_MS {
                    info!(
                        skipped_ms = marker - last,
                        "several cutoffs passed; folding at the latest only"
                    );
                }
                let date = accounting_date(&cutoff);
                let totals = self.fold(&day, date, &cutoff)?;
                Ok(Rollover::Folded { date, totals })
            }
        }
    }

    fn fold(
        &self,
        day: &AccountingDay,
        date: NaiveDate,
        marker: &DateTime<C::Tz>,
    ) -> Result<DailyTotals, StoreError> {
        history::record_macros(&self.repo, date, day.totals)?;
        self.repo.save_day(&AccountingDay {
            totals: DailyTotals::default(),
            entries: Vec::new(),
            last_rollover_ms: Some(marker.timestamp_millis()),
        })?;

        info!(
            date = %date_key(date),
            calories = day.totals.calories,
            proteins = day.totals.proteins,
            fats = day.totals.fats,
            carbs = day.totals.carbs,
            entries = day.entries.len(),
            "folded accounting day into history"
        );
        Ok(day.totals)
    }
}

/// Applies `delta` field by field, clamping at zero. A clamp means the
/// totals and the entries have drifted apart; it is logged and absorbed.
fn apply_delta(totals: DailyTotals, delta: MacroDelta) -> DailyTotals {
    let field = |name: &'static str, current: u32, change: i64| -> u32 {
        let next = i64::from(current) + change;
        if next < 0 {
            warn!(field = name, current, change, "total would go negative; clamped to zero");
        }
        next.clamp(0, i64::from(u32::MAX)) as u32
    };

    Macros {
        calories: field("calories", totals.calories, delta.calories),
        proteins: field("proteins", totals.proteins, delta.proteins),
        fats: field("fats", totals.fats, delta.fats),
        carbs: field("carbs", totals.carbs, delta.carbs),
    }
}
