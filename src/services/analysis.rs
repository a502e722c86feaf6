//! Menu analysis. Returns a fixed sample result until a real analyzer exists.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::iso_timestamp;

pub const SAMPLE_RESTAURANT: &str = "Sample Restaurant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthCategory {
    Healthy,
    Moderate,
    Indulgent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub name: &'static str,
    pub calories: u32,
    /// 0 to 10, higher is healthier.
    pub health_score: f64,
    pub category: HealthCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuAnalysis {
    pub restaurant: &'static str,
    pub items: Vec<MenuItem>,
    pub analysis_time: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub image_path: Option<String>,
}

const SAMPLE_ITEMS: [MenuItem; 4] = [
    MenuItem { name: "Grilled Chicken Salad", calories: 320, health_score: 8.5, category: HealthCategory::Healthy },
    MenuItem { name: "Caesar Salad", calories: 450, health_score: 6.2, category: HealthCategory::Moderate },
    MenuItem { name: "Chicken Burger", calories: 680, health_score: 4.1, category: HealthCategory::Indulgent },
    MenuItem { name: "Fish & Chips", calories: 850, health_score: 3.8, category: HealthCategory::Indulgent },
];

/// Analyze a previously uploaded menu image. The image is not inspected.
#[must_use]
pub fn analyze_menu(request: &AnalyzeRequest, now: OffsetDateTime) -> MenuAnalysis {
    tracing::debug!(image_path = request.image_path.as_deref().unwrap_or("<none>"), "menu analysis requested");
    MenuAnalysis { restaurant: SAMPLE_RESTAURANT, items: SAMPLE_ITEMS.to_vec(), analysis_time: iso_timestamp(now) }
}

#[cfg(test)]
#[path = "analysis_test.rs"]
mod tests;
