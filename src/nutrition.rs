use crate::models::{ActivityLevel, Gender, Goal, Macros};

pub const MIN_DAILY_CALORIES: u32 = 1200;
pub const FAT_PER_KG: f64 = 0.8;

const KCAL_PER_G_PROTEIN: i64 = 4;
const KCAL_PER_G_FAT: i64 = 9;
const KCAL_PER_G_CARB: f64 = 4.0;

/// Biometric inputs for a computed plan.
#[derive(Debug, Clone, Copy)]
pub struct Biometrics {
    pub gender: Gender,
    pub age: u32,
    pub height_cm: u32,
    pub weight_kg: u32,
    pub activity: ActivityLevel,
    pub goal: Goal,
}

/// Scales a per-100g profile to the logged quantity. Each field is rounded
/// on its own, half up.
pub fn scale_to_quantity(per_100: Macros, quantity_grams: i64) -> Macros {
    let factor = quantity_grams.max(0) as f64 / 100.0;
    let scale = |value: u32| round_u32(f64::from(value) * factor);

    Macros {
        calories: scale(per_100.calories),
        proteins: scale(per_100.proteins),
        fats: scale(per_100.fats),
        carbs: scale(per_100.carbs),
    }
}

/// Mifflin-St Jeor basal metabolic rate.
pub fn basal_metabolic_rate(gender: Gender, age: u32, height_cm: u32, weight_kg: u32) -> f64 {
    let base = 10.0 * f64::from(weight_kg) + 6.25 * f64::from(height_cm) - 5.0 * f64::from(age);
    match gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    }
}

pub fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::Light => 1.375,
        ActivityLevel::Moderate => 1.55,
        ActivityLevel::High => 1.725,
        ActivityLevel::VeryHigh => 1.9,
    }
}

pub fn goal_factor(goal: Goal) -> f64 {
    match goal {
        Goal::Lose => 0.85,
        Goal::Maintain => 1.0,
        Goal::Gain => 1.10,
    }
}

pub fn protein_per_kg(goal: Goal) -> f64 {
    match goal {
        Goal::Lose | Goal::Gain => 1.8,
        Goal::Maintain => 1.6,
    }
}

pub fn estimate_targets(input: &Biometrics) -> Macros {
    let bmr = basal_metabolic_rate(input.gender, input.age, input.height_cm, input.weight_kg);
    let mut calories = (bmr * activity_multiplier(input.activity)).round();
    if input.goal != Goal::Maintain {
        calories = (calories * goal_factor(input.goal)).round();
    }
    // floor goes in before the macro split so carbs are derived from it
    let calories = (calories.max(0.0) as u32).max(MIN_DAILY_CALORIES);

    let weight = f64::from(input.weight_kg);
    let proteins = round_u32(weight * protein_per_kg(input.goal));
    let fats = round_u32(weight * FAT_PER_KG);

    let from_protein_and_fat =
        i64::from(proteins) * KCAL_PER_G_PROTEIN + i64::from(fats) * KCAL_PER_G_FAT;
    let carbs = ((i64::from(calories) - from_protein_and_fat) as f64 / KCAL_PER_G_CARB)
        .round()
        .max(0.0) as u32;

    Macros {
        calories,
        proteins,
        fats,
        carbs,
    }
}

fn round_u32(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}
