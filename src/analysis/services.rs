/// Keywords that mark assistant output as indicating urgent medical risk.
const EMERGENCY_MARKERS: &[&str] = &[
    "emergency",
    "urgent",
    "seek immediate",
    "call 911",
    "call ambulance",
    "go to the emergency",
    "high risk",
    "life-threatening",
];

/// Case-insensitive keyword scan over the assembled assistant text.
pub fn is_emergency(text: &str) -> bool {
    let lower = text.to_lowercase();
    EMERGENCY_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benign_text_is_not_an_emergency() {
        assert!(!is_emergency("Risk: Low\nAdvice: rest and stay hydrated."));
    }

    #[test]
    fn urgent_keyword_flags_emergency() {
        assert!(is_emergency("Doctor needed: Urgent"));
    }

    #[test]
    fn match_is_case_insensitive() {
        assert!(is_emergency("CALL 911 immediately"));
        assert!(is_emergency("This could be Life-Threatening."));
    }

    #[test]
    fn keyword_may_span_fragments_once_assembled() {
        let fragments = ["seek imme", "diate care"];
        assert!(is_emergency(&fragments.concat()));
    }
}
