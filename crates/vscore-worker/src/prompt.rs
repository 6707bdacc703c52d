//! Instructions sent with every analysis request.

/// Fixed system instruction describing the required JSON shape.
pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are an expert video marketing analyst. Analyze the provided video frames and provide a JSON response with the following structure:
{
  "overallScore": number (0-100),
  "summary": string,
  "details": {
    "hook": { "score": number (0-100), "feedback": string },
    "pacing": { "score": number (0-100), "feedback": string },
    "visuals": { "score": number (0-100), "feedback": string },
    "cta": { "score": number (0-100), "feedback": string }
  }
}
Respond ONLY with the JSON object, do not include any other text or markdown.
If any detail is not applicable, use score: 0 and an empty feedback string.
Ensure scores are integers between 0 and 100."#;

/// User instruction for one video.
pub fn user_prompt(original_name: &str) -> String {
    format!(
        "Analyze the video for {original_name}. Provide detailed feedback for hook, pacing, visuals, and CTA."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts() {
        assert!(ANALYSIS_SYSTEM_PROMPT.contains("\"overallScore\""));
        assert!(ANALYSIS_SYSTEM_PROMPT.contains("\"cta\""));
        assert_eq!(
            user_prompt("promo.mp4"),
            "Analyze the video for promo.mp4. Provide detailed feedback for hook, pacing, visuals, and CTA."
        );
    }
}
