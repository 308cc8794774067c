use crate::cutoff::date_key;
use crate::models::{
    DailyTotals, HistoricalDayRecord, StatsResponse, TrendPoint, WeeklyAveragePoint,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

const DAY_COUNT: i64 = 14;
const WEEK_COUNT: i64 = 8;

/// Chart data ending at `today`. `live` overlays the running totals of the
/// accounting day that has not been archived yet.
pub fn build_stats_at(
    today: NaiveDate,
    history: &[HistoricalDayRecord],
    live: Option<DailyTotals>,
) -> StatsResponse {
    let mut days: BTreeMap<String, HistoricalDayRecord> = history
        .iter()
        .map(|record| (record.date.clone(), record.clone()))
        .collect();
    if let Some(totals) = live {
        let key = date_key(today);
        let record = days
            .remove(&key)
            .unwrap_or_else(|| HistoricalDayRecord::empty(key.clone()));
        days.insert(key, record.with_macros(totals));
    }

    let mut last_14_days = Vec::with_capacity(DAY_COUNT as usize);
    for offset in (0..DAY_COUNT).rev() {
        let date = today - Duration::days(offset);
        last_14_days.push(trend_point(date, days.get(&date_key(date))));
    }

    let current_week_start = week_start(today);
    let mut weekly_averages = Vec::with_capacity(WEEK_COUNT as usize);

    for offset in (0..WEEK_COUNT).rev() {
        let start = current_week_start - Duration::weeks(offset);
        let end = start + Duration::days(6);

        let records: Vec<&HistoricalDayRecord> = (0..7)
            .filter_map(|day_offset| days.get(&date_key(start + Duration::days(day_offset))))
            .collect();
        let days_with_data = records
            .iter()
            .filter(|record| record.calories.is_some() || record.weight.is_some())
            .count() as u8;

        weekly_averages.push(WeeklyAveragePoint {
            week: week_label(start),
            start_date: start.to_string(),
            end_date: end.to_string(),
            days_with_data,
            avg_calories: average(records.iter().map(|r| r.calories.map(f64::from))),
            avg_proteins: average(records.iter().map(|r| r.proteins.map(f64::from))),
            avg_fats: average(records.iter().map(|r| r.fats.map(f64::from))),
            avg_carbs: average(records.iter().map(|r| r.carbs.map(f64::from))),
            avg_weight: average(records.iter().map(|r| r.weight.map(f64::from))),
        });
    }

    StatsResponse {
        last_14_days,
        weekly_averages,
    }
}

fn trend_point(date: NaiveDate, record: Option<&HistoricalDayRecord>) -> TrendPoint {
    TrendPoint {
        date: date.to_string(),
        weight: record.and_then(|r| r.weight),
        calories: record.and_then(|r| r.calories),
        proteins: record.and_then(|r| r.proteins),
        fats: record.and_then(|r| r.fats),
        carbs: record.and_then(|r| r.carbs),
    }
}

// Absent days are skipped rather than counted as zero.
fn average(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0u32), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}
