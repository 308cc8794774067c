//! Sparse per-day archive behind the trend charts. Macro fields come from
//! ledger folds and weight from the weight log; each source only touches
//! its own fields.

use crate::cutoff::date_key;
use crate::models::{DailyTotals, HistoricalDayRecord, Macros};
use crate::repo::HistoryRepository;
use crate::storage::StoreError;
use chrono::NaiveDate;

/// Partial update for one day. `None` fields keep whatever is stored.
#[derive(Debug, Clone, Default)]
pub struct DayUpdate {
    pub weight: Option<f32>,
    pub calories: Option<u32>,
    pub proteins: Option<u32>,
    pub fats: Option<u32>,
    pub carbs: Option<u32>,
}

impl DayUpdate {
    pub fn weight(kg: f32) -> Self {
        Self {
            weight: Some(kg),
            ..Self::default()
        }
    }

    pub fn macros(macros: Macros) -> Self {
        Self {
            calories: Some(macros.calories),
            proteins: Some(macros.proteins),
            fats: Some(macros.fats),
            carbs: Some(macros.carbs),
            ..Self::default()
        }
    }

    fn merge_into(self, record: &mut HistoricalDayRecord) {
        record.weight = self.weight.or(record.weight);
        record.calories = self.calories.or(record.calories);
        record.proteins = self.proteins.or(record.proteins);
        record.fats = self.fats.or(record.fats);
        record.carbs = self.carbs.or(record.carbs);
    }
}

pub fn upsert_day<R: HistoryRepository + ?Sized>(
    repo: &R,
    date: NaiveDate,
    update: DayUpdate,
) -> Result<HistoricalDayRecord, StoreError> {
    let key = date_key(date);
    let mut records = repo.load_history();

    let merged = match records.iter_mut().find(|record| record.date == key) {
        Some(record) => {
            update.merge_into(record);
            record.clone()
        }
        None => {
            let mut record = HistoricalDayRecord::empty(key);
            update.merge_into(&mut record);
            records.push(record.clone());
            record
        }
    };

    records.sort_by(|a, b| a.date.cmp(&b.date));
    repo.save_history(&records)?;
    Ok(merged)
}

pub fn record_macros<R: HistoryRepository + ?Sized>(
    repo: &R,
    date: NaiveDate,
    totals: DailyTotals,
) -> Result<HistoricalDayRecord, StoreError> {
    upsert_day(repo, date, DayUpdate::macros(totals))
}

pub fn record_weight<R: HistoryRepository + ?Sized>(
    repo: &R,
    date: NaiveDate,
    kg: f32,
) -> Result<HistoricalDayRecord, StoreError> {
    upsert_day(repo, date, DayUpdate::weight(kg))
}

/// Last `days` records by date. When `live` is given, that day's record
/// shows the running totals instead of anything archived, keeping weight.
pub fn series_last_days<R: HistoryRepository + ?Sized>(
    repo: &R,
    days: usize,
    live: Option<(NaiveDate, DailyTotals)>,
) -> Vec<HistoricalDayRecord> {
    let mut records = repo.load_history();

    if let Some((date, totals)) = live {
        let key = date_key(date);
        match records.iter_mut().find(|record| record.date == key) {
            Some(record) => *record = record.clone().with_macros(totals),
            None => records.push(HistoricalDayRecord::empty(key).with_macros(totals)),
        }
        records.sort_by(|a, b| a.date.cmp(&b.date));
    }

    let skip = records.len().saturating_sub(days);
    records.split_off(skip)
}
