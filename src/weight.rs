use crate::cutoff::start_of_day;
use crate::history;
use crate::models::WeightSample;
use crate::repo::{HistoryRepository, WeightRepository};
use crate::storage::StoreError;
use chrono::{DateTime, TimeZone};
use tracing::info;

pub const MAX_WEIGHT_KG: f32 = 500.0;

pub fn is_valid_weight(kg: f32) -> bool {
    kg.is_finite() && kg > 0.0 && kg < MAX_WEIGHT_KG
}

/// Records today's body weight, replacing any earlier value for the same
/// day, and mirrors it into that day's history record.
pub fn log_weight<R, Tz>(repo: &R, now: &DateTime<Tz>, kg: f32) -> Result<WeightSample, StoreError>
where
    R: WeightRepository + HistoryRepository + ?Sized,
    Tz: TimeZone,
{
    let day_start_ms = start_of_day(now).timestamp_millis();
    let sample = WeightSample { day_start_ms, kg };

    let mut samples = repo.load_weights();
    match samples.iter_mut().find(|existing| existing.day_start_ms == day_start_ms) {
        Some(existing) => existing.kg = kg,
        None => samples.push(sample),
    }
    samples.sort_by_key(|existing| existing.day_start_ms);
    repo.save_weights(&samples)?;

    history::record_weight(repo, now.date_naive(), kg)?;
    info!(kg, date = %now.date_naive(), "logged body weight");
    Ok(sample)
}
