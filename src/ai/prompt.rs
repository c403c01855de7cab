use crate::profile::repo::Profile;

/// Fixed policy prompt sent with every completion. Medical judgment lives in
/// the hosted model; this constrains tone, structure and length.
pub const SYSTEM_PROMPT: &str = "You are a health assistant for preliminary symptom analysis.\n\
RULES: Never prescribe medicines or dosages. Always advise seeing a doctor when needed. \
For high-risk symptoms (chest pain, stroke signs, severe bleeding, breathing difficulty) \
put an emergency warning first. Use simple language. Self-care only (rest, hydration). \
Include: Risk (Low/Moderate/High), Doctor needed (Yes/No/Urgent). \
Sections: Possible Condition, Risk Level, Emergency Warning (if any), Self-Care Advice, \
Doctor Consultation. Keep each section to 1-2 short sentences.";

pub const NO_HISTORY: &str = "No medical history provided.";

/// Render the profile into the deterministic context block embedded in the
/// user message. Lines are only emitted for fields the user actually filled.
pub fn medical_context(profile: Option<&Profile>) -> String {
    let Some(profile) = profile else {
        return NO_HISTORY.to_string();
    };

    let mut lines = Vec::new();
    if !profile.name.is_empty() {
        lines.push(format!("Patient name: {}", profile.name));
    }
    if profile.age > 0 {
        lines.push(format!("Age: {} years", profile.age));
    }
    if let Some(gender) = profile.gender.as_deref().filter(|g| !g.is_empty()) {
        lines.push(format!("Gender: {gender}"));
    }
    if let (Some(height_cm), Some(weight_kg)) = (profile.height_cm, profile.weight_kg) {
        if height_cm > 0.0 && weight_kg > 0.0 {
            let bmi = crate::analysis::bmi::bmi_value(height_cm, weight_kg);
            lines.push(format!(
                "Height: {height_cm} cm, Weight: {weight_kg} kg (BMI: {bmi})"
            ));
        }
    }
    if let Some(v) = profile.existing_conditions.as_deref().filter(|v| !v.is_empty()) {
        lines.push(format!("Existing conditions: {v}"));
    }
    if let Some(v) = profile.allergies.as_deref().filter(|v| !v.is_empty()) {
        lines.push(format!("Allergies: {v}"));
    }
    if let Some(v) = profile.smoking_habit.as_deref().filter(|v| !v.is_empty()) {
        lines.push(format!("Smoking: {v}"));
    }
    if let Some(v) = profile.alcohol_habit.as_deref().filter(|v| !v.is_empty()) {
        lines.push(format!("Alcohol: {v}"));
    }

    if lines.is_empty() {
        NO_HISTORY.to_string()
    } else {
        lines.join("\n")
    }
}

pub fn user_message(symptoms: &str, profile: Option<&Profile>) -> String {
    format!(
        "Context:\n{}\n\nSymptoms: {}\n\nAnalyze briefly. If emergency signs, state warning first.",
        medical_context(profile),
        symptoms
    )
}

/// One completion exchange. Transient; nothing here is persisted.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: &'static str,
    pub user_message: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Fixed call parameters: short capped output, low temperature for
    /// repeatable phrasing.
    pub fn for_symptoms(symptoms: &str, profile: Option<&Profile>) -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT,
            user_message: user_message(symptoms, profile),
            max_output_tokens: 400,
            temperature: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn sample_profile() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Alex".into(),
            age: 34,
            gender: Some("male".into()),
            height_cm: Some(170.0),
            weight_kg: Some(70.0),
            existing_conditions: Some("asthma".into()),
            allergies: None,
            smoking_habit: Some("never".into()),
            alcohol_habit: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn missing_profile_yields_placeholder() {
        assert_eq!(medical_context(None), NO_HISTORY);
    }

    #[test]
    fn context_includes_bmi() {
        let ctx = medical_context(Some(&sample_profile()));
        assert!(ctx.contains("Patient name: Alex"));
        assert!(ctx.contains("Age: 34 years"));
        assert!(ctx.contains("BMI: 24.2"));
        assert!(ctx.contains("Existing conditions: asthma"));
        assert!(!ctx.contains("Allergies"));
    }

    #[test]
    fn user_message_embeds_context_and_symptoms() {
        let msg = user_message("headache and fever", Some(&sample_profile()));
        assert!(msg.starts_with("Context:\n"));
        assert!(msg.contains("Symptoms: headache and fever"));
        assert!(msg.ends_with("state warning first."));
    }

    #[test]
    fn request_parameters_are_fixed() {
        let req = CompletionRequest::for_symptoms("cough", None);
        assert_eq!(req.max_output_tokens, 400);
        assert!((req.temperature - 0.2).abs() < f32::EPSILON);
        assert!(req.user_message.contains(NO_HISTORY));
    }
}
