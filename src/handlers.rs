use crate::clock::Clock;
use crate::errors::AppError;
use crate::history::series_last_days;
use crate::ledger::MacroDelta;
use crate::models::{
    AddEntryRequest, AdjustRequest, DailyTotals, EstimateRequest, FoodEntry,
    HistoricalDayRecord, HistoryQuery, LanguageRequest, LanguageResponse, Macros, NameRequest,
    ProfileResponse, StatsResponse, TodayResponse, UserProfile, WeightRequest, WeightSample,
};
use crate::nutrition::Biometrics;
use crate::profile::{
    apply_estimate, calorie_progress, is_supported_language, remaining, set_manual_targets,
    set_name,
};
use crate::repo::{HistoryRepository, ProfileRepository, WeightRepository};
use crate::state::{AppLedger, AppState};
use crate::stats::build_stats_at;
use crate::weight::{is_valid_weight, log_weight};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

const DEFAULT_HISTORY_DAYS: usize = 14;

pub async fn get_today(State(state): State<AppState>) -> Result<Json<TodayResponse>, AppError> {
    let ledger = state.ledger.lock().await;
    Ok(Json(today_response(&state, &ledger)?))
}

pub async fn get_entries(State(state): State<AppState>) -> Result<Json<Vec<FoodEntry>>, AppError> {
    let ledger = state.ledger.lock().await;
    Ok(Json(ledger.entries()?))
}

pub async fn add_entry(
    State(state): State<AppState>,
    Json(payload): Json<AddEntryRequest>,
) -> Result<(StatusCode, Json<FoodEntry>), AppError> {
    let ledger = state.ledger.lock().await;
    let entry = ledger.add_entry(&payload.name, payload.per_100g, payload.quantity_grams)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn remove_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let ledger = state.ledger.lock().await;
    ledger.remove_entry(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn adjust(
    State(state): State<AppState>,
    Json(payload): Json<AdjustRequest>,
) -> Result<Json<DailyTotals>, AppError> {
    let ledger = state.ledger.lock().await;
    let totals = ledger.adjust(MacroDelta {
        calories: payload.calories,
        proteins: payload.proteins,
        fats: payload.fats,
        carbs: payload.carbs,
    })?;
    Ok(Json(totals))
}

pub async fn reset(State(state): State<AppState>) -> Result<Json<TodayResponse>, AppError> {
    let ledger = state.ledger.lock().await;
    state.scheduler.on_reset(&*ledger)?;
    Ok(Json(today_response(&state, &ledger)?))
}

pub async fn get_profile(State(state): State<AppState>) -> Json<ProfileResponse> {
    Json(profile_response(&state, state.repo.load_profile()))
}

pub async fn put_profile(
    State(state): State<AppState>,
    Json(mut profile): Json<UserProfile>,
) -> Result<Json<ProfileResponse>, AppError> {
    profile.name = profile.name.trim().to_owned();
    state.repo.save_profile(&profile)?;
    Ok(Json(profile_response(&state, profile)))
}

pub async fn put_name(
    State(state): State<AppState>,
    Json(payload): Json<NameRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = set_name(&state.repo, &payload.name)?;
    Ok(Json(profile_response(&state, profile)))
}

pub async fn put_targets(
    State(state): State<AppState>,
    Json(targets): Json<Macros>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = set_manual_targets(&state.repo, targets)?;
    Ok(Json(profile_response(&state, profile)))
}

pub async fn estimate(
    State(state): State<AppState>,
    Json(payload): Json<EstimateRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = apply_estimate(
        &state.repo,
        &Biometrics {
            gender: payload.gender,
            age: payload.age,
            height_cm: payload.height_cm,
            weight_kg: payload.weight_kg,
            activity: payload.activity_level,
            goal: payload.goal,
        },
    )?;
    Ok(Json(profile_response(&state, profile)))
}

pub async fn get_language(State(state): State<AppState>) -> Json<LanguageResponse> {
    Json(LanguageResponse {
        language: state.repo.language(),
    })
}

pub async fn put_language(
    State(state): State<AppState>,
    Json(payload): Json<LanguageRequest>,
) -> Result<Json<LanguageResponse>, AppError> {
    let language = payload.language.trim();
    if !is_supported_language(language) {
        return Err(AppError::bad_request("language must be one of en, ru, pl"));
    }

    state.repo.set_language(language)?;
    Ok(Json(LanguageResponse {
        language: language.to_owned(),
    }))
}

pub async fn get_weights(State(state): State<AppState>) -> Json<Vec<WeightSample>> {
    Json(state.repo.load_weights())
}

pub async fn post_weight(
    State(state): State<AppState>,
    Json(payload): Json<WeightRequest>,
) -> Result<(StatusCode, Json<WeightSample>), AppError> {
    if !is_valid_weight(payload.kg) {
        return Err(AppError::bad_request("kg must be between 0 and 500"));
    }

    // history is shared with the ledger's folds
    let ledger = state.ledger.lock().await;
    let sample = log_weight(&state.repo, &ledger.clock().now(), payload.kg)?;
    Ok((StatusCode::CREATED, Json(sample)))
}

pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoricalDayRecord>>, AppError> {
    let ledger = state.ledger.lock().await;
    let totals = ledger.totals()?;
    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    Ok(Json(series_last_days(
        &state.repo,
        days,
        Some((ledger.accounting_date(), totals)),
    )))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let ledger = state.ledger.lock().await;
    let totals = ledger.totals()?;
    let history = state.repo.load_history();
    Ok(Json(build_stats_at(ledger.accounting_date(), &history, Some(totals))))
}

fn today_response(state: &AppState, ledger: &AppLedger) -> Result<TodayResponse, AppError> {
    let totals = ledger.totals()?;
    let targets = state.repo.load_profile().targets;
    Ok(TodayResponse {
        date: ledger.accounting_date().to_string(),
        totals,
        targets,
        remaining: remaining(targets, totals),
        calorie_progress: calorie_progress(targets, totals),
    })
}

fn profile_response(state: &AppState, profile: UserProfile) -> ProfileResponse {
    ProfileResponse {
        profile,
        onboarding_completed: state.repo.onboarding_completed(),
    }
}
