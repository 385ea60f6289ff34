//! Prompt text sent to the completion endpoint.

use super::{ExtractionKind, SummaryKind};

const SUMMARY_SYSTEM_PROMPT: &str = r#"You are an expert summarizer for spoken transcripts. Always respond with strict JSON using the schema:
{
  "text": string,
  "key_points": string[],
  "sections": [{"title": string, "content": string}]
}
Do not include any additional commentary, code fences, or explanations outside the JSON object."#;

const SUMMARY_TONE: &str = "Ensure responses are factual, concise, and written in a professional tone.";

const CODE_EXTRACTION_PROMPT: &str = r#"You are a code extraction specialist. Extract all code snippets, commands, or technical examples from the transcript.
Return ONLY a valid JSON object with this exact structure (no additional text, no code fences):
{
  "items": [
    {
      "language": "python",
      "code": "print('hello')",
      "context": "Example hello world program",
      "timestamp_hint": "mentioned at 2:30"
    }
  ]
}

Rules:
- Extract only actual code, commands, or technical syntax
- Identify the programming language (python, javascript, bash, sql, etc.)
- Provide context explaining what the code does
- Include timestamp hints if the speaker mentions a time
- If no code is found, return {"items": []}"#;

const QUOTES_EXTRACTION_PROMPT: &str = r#"You are a quote extraction specialist. Extract notable quotes, key statements, and memorable phrases from the transcript.
Return ONLY a valid JSON object with this exact structure (no additional text, no code fences):
{
  "items": [
    {
      "quote": "Code is read far more often than it is written",
      "speaker": "Guido van Rossum",
      "context": "Discussing the importance of readable code",
      "importance": "high"
    }
  ]
}

Rules:
- Extract direct quotes that are impactful, memorable, or insightful
- Identify the speaker if mentioned in the transcript
- Provide context for why the quote is significant
- Rate importance as "high", "medium", or "low"
- If no notable quotes are found, return {"items": []}"#;

const ACTION_ITEMS_EXTRACTION_PROMPT: &str = r#"You are an action item extraction specialist. Extract actionable steps, recommendations, tasks, and to-dos from the transcript.
Return ONLY a valid JSON object with this exact structure (no additional text, no code fences):
{
  "items": [
    {
      "action": "Set up automated testing pipeline",
      "category": "task",
      "priority": "high",
      "context": "Required for CI/CD implementation"
    }
  ]
}

Rules:
- Extract clear, actionable items that listeners should do
- Categorize as "task", "recommendation", or "step"
- Assign priority as "high", "medium", or "low"
- Provide context explaining why this action matters
- If no action items are found, return {"items": []}"#;

pub const ANSWER_SYSTEM_PROMPT: &str = r#"You answer questions about video transcripts. Answer accurately based ONLY on the provided transcript content. If the answer is not in the transcript, clearly state that.

Return your response as JSON with this exact structure:
{
  "answer": "The detailed answer text",
  "confidence": "high" | "medium" | "low",
  "sources": ["relevant quote 1", "relevant quote 2"],
  "not_found": false
}

If the answer is NOT in the transcript, return:
{
  "answer": "This information is not mentioned in the transcript.",
  "confidence": "high",
  "sources": [],
  "not_found": true
}

Guidelines:
- Be concise but complete
- Quote relevant parts of the transcript in "sources"
- Use "high" confidence when the answer is explicit
- Use "medium" when inferring from context
- Use "low" when the answer is uncertain
- NEVER make up information not in the transcript
- Do not include code fences or additional text outside the JSON object"#;

fn summary_instructions(kind: SummaryKind) -> &'static str {
    match kind {
        SummaryKind::Brief => {
            r#"Provide a concise 2-3 sentence summary capturing the main topic and key message. Populate only the "text" field and leave "key_points" and "sections" empty arrays."#
        }
        SummaryKind::Detailed => {
            r#"Create a comprehensive summary with an introduction, 3-5 detailed sections, and a conclusion. Fill the "sections" array with informative titles and paragraph content. Include a short overall overview in "text" and leave "key_points" empty."#
        }
        SummaryKind::KeyPoints => {
            r#"Extract 5-10 key takeaways. Populate the "key_points" array with individual bullet strings and provide the combined markdown bullets in "text". Leave "sections" empty."#
        }
    }
}

pub fn summary_system_prompt(kind: SummaryKind) -> String {
    format!("{} {}\n{}", SUMMARY_SYSTEM_PROMPT, summary_instructions(kind), SUMMARY_TONE)
}

pub fn summary_user_prompt(kind: SummaryKind, transcript: &str) -> String {
    format!("Summary type: {}\nTranscript:\n{}", kind, transcript.trim())
}

pub fn extraction_system_prompt(kind: ExtractionKind) -> &'static str {
    match kind {
        ExtractionKind::Code => CODE_EXTRACTION_PROMPT,
        ExtractionKind::Quotes => QUOTES_EXTRACTION_PROMPT,
        ExtractionKind::ActionItems => ACTION_ITEMS_EXTRACTION_PROMPT,
    }
}

pub fn extraction_user_prompt(kind: ExtractionKind, transcript: &str) -> String {
    format!("Extract {} from the following transcript:\n\n{}", kind, transcript.trim())
}

pub fn answer_user_prompt(question: &str, transcript: &str) -> String {
    format!("Question: {}\n\nTranscript:\n{}", question.trim(), transcript.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prompt_carries_kind_instructions() {
        let prompt = summary_system_prompt(SummaryKind::Detailed);
        assert!(prompt.starts_with("You are an expert summarizer"));
        assert!(prompt.contains("3-5 detailed sections"));
        assert!(prompt.ends_with(SUMMARY_TONE));
    }

    #[test]
    fn test_user_prompts() {
        assert_eq!(
            summary_user_prompt(SummaryKind::KeyPoints, "  hello world \n"),
            "Summary type: key_points\nTranscript:\nhello world"
        );
        assert_eq!(
            extraction_user_prompt(ExtractionKind::ActionItems, "do it"),
            "Extract action_items from the following transcript:\n\ndo it"
        );
        assert_eq!(
            answer_user_prompt(" why? ", "because"),
            "Question: why?\n\nTranscript:\nbecause"
        );
    }
}
