use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub symptoms: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub response: String,
    pub is_emergency: bool,
}

#[derive(Debug, Deserialize)]
pub struct BmiRequest {
    #[serde(default)]
    pub height_cm: f64,
    #[serde(default)]
    pub weight_kg: f64,
}

#[derive(Debug, Serialize)]
pub struct BmiResponse {
    pub bmi: f64,
    pub category: &'static str,
    pub category_color: &'static str,
}
