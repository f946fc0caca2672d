use deskhive_schema::FrustrationLevel;

/// Markers that flag a message as angry outright.
pub const ANGRY_MARKERS: [&str; 10] = [
    "ridiculous",
    "unacceptable",
    "terrible",
    "worst",
    "lawsuit",
    "refund",
    "cancel",
    "angry",
    "furious",
    "outraged",
];

/// Markers for the milder frustrated tier.
pub const FRUSTRATED_MARKERS: [&str; 12] = [
    "frustrated",
    "annoying",
    "still not working",
    "tried everything",
    "waste of time",
    "useless",
    "doesn't help",
    "hours",
    "days",
    "again",
    "still",
    "keeps happening",
];

/// Classify a single user message.
///
/// Shouting is checked first: a message longer than ten characters with
/// more than half its characters uppercase is angry no matter what the
/// lexicons say. Otherwise matching is case-insensitive substring search,
/// angry markers before frustrated markers.
pub fn classify(message: &str) -> FrustrationLevel {
    let length = message.chars().count();
    if length > 10 {
        let upper = message.chars().filter(|c| c.is_uppercase()).count();
        if upper as f64 / length as f64 > 0.5 {
            return FrustrationLevel::Angry;
        }
    }

    let message_lower = message.to_lowercase();

    if ANGRY_MARKERS
        .iter()
        .any(|marker| message_lower.contains(marker))
    {
        return FrustrationLevel::Angry;
    }

    if FRUSTRATED_MARKERS
        .iter()
        .any(|marker| message_lower.contains(marker))
    {
        return FrustrationLevel::Frustrated;
    }

    FrustrationLevel::Normal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calm_message_is_normal() {
        assert_eq!(
            classify("How do I reset my password?"),
            FrustrationLevel::Normal
        );
    }

    #[test]
    fn angry_marker_wins_over_frustrated_marker() {
        // "refund" is angry, "still" is frustrated; angry is checked first.
        assert_eq!(classify("I still want a refund"), FrustrationLevel::Angry);
    }

    #[test]
    fn frustrated_markers_detected() {
        assert_eq!(
            classify("I tried everything and it's still not working"),
            FrustrationLevel::Frustrated
        );
        assert_eq!(
            classify("this is annoying, I've been at it for hours"),
            FrustrationLevel::Frustrated
        );
    }

    #[test]
    fn marker_matches_inside_larger_word() {
        // Substring semantics: "cancellation" contains "cancel".
        assert_eq!(
            classify("question about my cancellation"),
            FrustrationLevel::Angry
        );
    }

    #[test]
    fn shouting_and_lexicon_agree_on_angry() {
        assert_eq!(
            classify("THIS IS TERRIBLE AND I AM FURIOUS!!!"),
            FrustrationLevel::Angry
        );
    }

    #[test]
    fn shouting_alone_is_angry() {
        assert_eq!(classify("PLEASE FIX THIS NOW"), FrustrationLevel::Angry);
    }

    #[test]
    fn shouting_overrides_frustrated_lexicon() {
        // "keeps happening" alone would read as frustrated.
        assert_eq!(classify("IT KEEPS HAPPENING"), FrustrationLevel::Angry);
    }

    #[test]
    fn short_shouting_is_not_flagged() {
        // Ten characters or fewer never triggers the caps heuristic.
        assert_eq!(classify("HELP"), FrustrationLevel::Normal);
    }

    #[test]
    fn mixed_case_below_threshold_is_normal() {
        assert_eq!(
            classify("The response has an Error Code field"),
            FrustrationLevel::Normal
        );
    }
}
