use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Calories (kcal) plus protein, fat and carbohydrate grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Macros {
    pub calories: u32,
    pub proteins: u32,
    pub fats: u32,
    pub carbs: u32,
}

/// Running totals of the current accounting day.
pub type DailyTotals = Macros;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "cal", default, deserialize_with = "lenient_u32")]
    pub calories: u32,
    #[serde(rename = "p", default, deserialize_with = "lenient_u32")]
    pub proteins: u32,
    #[serde(rename = "f", default, deserialize_with = "lenient_u32")]
    pub fats: u32,
    #[serde(rename = "c", default, deserialize_with = "lenient_u32")]
    pub carbs: u32,
    #[serde(rename = "qty", default, deserialize_with = "lenient_u32")]
    pub quantity_grams: u32,
    #[serde(rename = "ts", default, deserialize_with = "lenient_i64")]
    pub created_at_ms: i64,
}

impl FoodEntry {
    pub fn macros(&self) -> Macros {
        Macros {
            calories: self.calories,
            proteins: self.proteins,
            fats: self.fats,
            carbs: self.carbs,
        }
    }
}

/// Live accounting state: totals, entries (newest first) and the last
/// cutoff folded into history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountingDay {
    pub totals: DailyTotals,
    pub entries: Vec<FoodEntry>,
    pub last_rollover_ms: Option<i64>,
}

/// One archived calendar day. `None` means nothing was recorded, which is
/// not the same as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDayRecord {
    pub date: String,
    #[serde(rename = "w", default, deserialize_with = "lenient_opt_f32")]
    pub weight: Option<f32>,
    #[serde(rename = "cal", default, deserialize_with = "lenient_opt_u32")]
    pub calories: Option<u32>,
    #[serde(rename = "p", default, deserialize_with = "lenient_opt_u32")]
    pub proteins: Option<u32>,
    #[serde(rename = "f", default, deserialize_with = "lenient_opt_u32")]
    pub fats: Option<u32>,
    #[serde(rename = "c", default, deserialize_with = "lenient_opt_u32")]
    pub carbs: Option<u32>,
}

impl HistoricalDayRecord {
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            weight: None,
            calories: None,
            proteins: None,
            fats: None,
            carbs: None,
        }
    }

    pub fn with_macros(mut self, macros: Macros) -> Self {
        self.calories = Some(macros.calories);
        self.proteins = Some(macros.proteins);
        self.fats = Some(macros.fats);
        self.carbs = Some(macros.carbs);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSample {
    #[serde(rename = "d", default, deserialize_with = "lenient_i64")]
    pub day_start_ms: i64,
    #[serde(default, deserialize_with = "lenient_f32")]
    pub kg: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Lose,
    Maintain,
    Gain,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

impl ActivityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::High => "high",
            ActivityLevel::VeryHigh => "very_high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sedentary" => Some(ActivityLevel::Sedentary),
            "light" => Some(ActivityLevel::Light),
            "moderate" => Some(ActivityLevel::Moderate),
            "high" => Some(ActivityLevel::High),
            "very_high" => Some(ActivityLevel::VeryHigh),
            _ => None,
        }
    }
}

impl Goal {
    pub fn as_str(self) -> &'static str {
        match self {
            Goal::Lose => "lose",
            Goal::Maintain => "maintain",
            Goal::Gain => "gain",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "lose" => Some(Goal::Lose),
            "maintain" => Some(Goal::Maintain),
            "gain" => Some(Goal::Gain),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub gender: Option<Gender>,
    pub age: u32,
    pub height_cm: u32,
    pub weight_kg: u32,
    pub activity_level: Option<ActivityLevel>,
    pub goal: Option<Goal>,
    pub targets: Macros,
}

#[derive(Debug, Deserialize)]
pub struct AddEntryRequest {
    #[serde(default)]
    pub name: String,
    pub per_100g: Macros,
    pub quantity_grams: u32,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    #[serde(default)]
    pub calories: i64,
    #[serde(default)]
    pub proteins: i64,
    #[serde(default)]
    pub fats: i64,
    #[serde(default)]
    pub carbs: i64,
}

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub gender: Gender,
    pub age: u32,
    pub height_cm: u32,
    pub weight_kg: u32,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguageResponse {
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct WeightRequest {
    pub kg: f32,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub profile: UserProfile,
    pub onboarding_completed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
    pub date: String,
    pub totals: DailyTotals,
    pub targets: Macros,
    pub remaining: Macros,
    pub calorie_progress: f64,
}

#[derive(Debug, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub weight: Option<f32>,
    pub calories: Option<u32>,
    pub proteins: Option<u32>,
    pub fats: Option<u32>,
    pub carbs: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyAveragePoint {
    pub week: String,
    pub start_date: String,
    pub end_date: String,
    pub days_with_data: u8,
    pub avg_calories: Option<f64>,
    pub avg_proteins: Option<f64>,
    pub avg_fats: Option<f64>,
    pub avg_carbs: Option<f64>,
    pub avg_weight: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub last_14_days: Vec<TrendPoint>,
    pub weekly_averages: Vec<WeeklyAveragePoint>,
}

// Persisted values come from an untyped store; anything unreadable falls
// back to the field default instead of failing the whole record.

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(as_i64(&value).unwrap_or(0))
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(as_u32(&value).unwrap_or(0))
}

fn lenient_f32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().map(|v| v as f32).unwrap_or(0.0))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_owned).unwrap_or_default())
}

fn lenient_opt_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(as_u32(&value))
}

fn lenient_opt_f32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().map(|v| v as f32))
}

fn as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|v| v as i64))
}

fn as_u32(value: &Value) -> Option<u32> {
    as_i64(value).map(|v| v.clamp(0, i64::from(u32::MAX)) as u32)
}
