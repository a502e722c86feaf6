//! Food catalogue and meal logging (mock data, nothing is persisted).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::{epoch_millis, iso_timestamp};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Food {
    pub id: u32,
    pub name: &'static str,
    pub calories: u32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

const SAMPLE_FOODS: [Food; 3] = [
    Food { id: 1, name: "Apple", calories: 95, protein: 0.5, carbs: 25.0, fat: 0.3 },
    Food { id: 2, name: "Banana", calories: 105, protein: 1.3, carbs: 27.0, fat: 0.4 },
    Food { id: 3, name: "Chicken Breast", calories: 165, protein: 31.0, carbs: 0.0, fat: 3.6 },
];

#[must_use]
pub fn sample_foods() -> Vec<Food> {
    SAMPLE_FOODS.to_vec()
}

/// Meal submitted by a client. Fields are echoed back untouched, so any JSON
/// shape is accepted.
#[derive(Debug, Default, Deserialize)]
pub struct NewMeal {
    pub name: Option<Value>,
    pub foods: Option<Value>,
    pub date: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foods: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Value>,
    pub created_at: String,
}

/// Stamp a meal with an id (epoch millis) and creation time.
#[must_use]
pub fn record_meal(meal: NewMeal, now: OffsetDateTime) -> Meal {
    Meal {
        id: epoch_millis(now),
        name: meal.name,
        foods: meal.foods,
        date: meal.date,
        created_at: iso_timestamp(now),
    }
}

#[cfg(test)]
#[path = "nutrition_test.rs"]
mod tests;
