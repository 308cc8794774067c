use crate::models::{Macros, UserProfile};
use crate::nutrition::{estimate_targets, Biometrics};
use crate::repo::ProfileRepository;
use crate::storage::StoreError;
use tracing::info;

pub const SUPPORTED_LANGUAGES: [&str; 3] = ["en", "ru", "pl"];

pub fn is_supported_language(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&code)
}

pub fn set_name<R: ProfileRepository + ?Sized>(repo: &R, name: &str) -> Result<UserProfile, StoreError> {
    let mut profile = repo.load_profile();
    profile.name = name.trim().to_owned();
    repo.save_profile(&profile)?;
    Ok(profile)
}

/// Stores manually entered targets and finishes onboarding. Biometric
/// fields are left alone.
pub fn set_manual_targets<R: ProfileRepository + ?Sized>(
    repo: &R,
    targets: Macros,
) -> Result<UserProfile, StoreError> {
    let mut profile = repo.load_profile();
    profile.targets = targets;
    repo.save_profile(&profile)?;
    repo.set_onboarding_completed(true)?;
    info!(calories = targets.calories, "saved manual targets");
    Ok(profile)
}

/// Merges the biometrics into the stored profile (zero values keep what was
/// there), computes a plan from the merged values and finishes onboarding.
pub fn apply_estimate<R: ProfileRepository + ?Sized>(
    repo: &R,
    input: &Biometrics,
) -> Result<UserProfile, StoreError> {
    let mut profile = repo.load_profile();

    profile.gender = Some(input.gender);
    profile.activity_level = Some(input.activity);
    profile.goal = Some(input.goal);
    if input.age > 0 {
        profile.age = input.age;
    }
    if input.height_cm > 0 {
        profile.height_cm = input.height_cm;
    }
    if input.weight_kg > 0 {
        profile.weight_kg = input.weight_kg;
    }

    let targets = estimate_targets(&Biometrics {
        age: profile.age,
        height_cm: profile.height_cm,
        weight_kg: profile.weight_kg,
        ..*input
    });
    profile.targets = targets;

    repo.save_profile(&profile)?;
    repo.set_onboarding_completed(true)?;
    info!(
        calories = targets.calories,
        proteins = targets.proteins,
        fats = targets.fats,
        carbs = targets.carbs,
        "saved estimated targets"
    );
    Ok(profile)
}

/// What is left of each target, never below zero.
pub fn remaining(targets: Macros, eaten: Macros) -> Macros {
    Macros {
        calories: targets.calories.saturating_sub(eaten.calories),
        proteins: targets.proteins.saturating_sub(eaten.proteins),
        fats: targets.fats.saturating_sub(eaten.fats),
        carbs: targets.carbs.saturating_sub(eaten.carbs),
    }
}

/// Share of the calorie target eaten, capped at 1. A zero target counts as 1 kcal.
pub fn calorie_progress(targets: Macros, eaten: Macros) -> f64 {
    let target = targets.calories.max(1);
    (f64::from(eaten.calories) / f64::from(target)).min(1.0)
}
