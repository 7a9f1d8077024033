//! Prompt construction for one unit

use crate::llm::core::{config::GenerationConfig, types::GenerateRequest};
use crate::partition::{ContentKind, GenerationRequest, UnitInput};

const SYSTEM_PROMPT: &str =
    "You are an experienced educator who writes accurate, concise study material. \
     Always answer with valid JSON and nothing else.";

fn item_shape(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Flashcards => {
            r#"{"flashcards": [{"front": "question", "back": "answer", "tags": ["tag"]}]}"#
        }
        ContentKind::Quiz => {
            r#"{"questions": [{"question": "text", "options": ["a", "b", "c", "d"], "correct_answer": 0, "explanation": "why"}]}"#
        }
    }
}

/// Build the provider request for one unit
pub fn build_request(
    request: &GenerationRequest,
    input: &UnitInput,
    config: &GenerationConfig,
) -> GenerateRequest {
    let noun = match request.kind {
        ContentKind::Flashcards => "flashcards",
        ContentKind::Quiz => "multiple-choice questions",
    };

    let mut prompt = format!(
        "Create exactly {} {} about \"{}\" at {} difficulty.\nSection: {}\n",
        input.item_count,
        noun,
        request.topic.trim(),
        request.difficulty,
        input.subtopic,
    );
    if let Some(subject) = &request.subject {
        prompt.push_str(&format!("Subject: {}\n", subject));
    }
    if let Some(fragment) = &input.fragment {
        prompt.push_str("Base every item only on this source material:\n\"\"\"\n");
        prompt.push_str(fragment);
        prompt.push_str("\n\"\"\"\n");
    }
    prompt.push_str("Respond with JSON shaped like:\n");
    prompt.push_str(item_shape(request.kind));

    GenerateRequest::from_prompt(prompt, config.clone()).with_system(SYSTEM_PROMPT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_section_and_count() {
        let request = GenerationRequest::topic(ContentKind::Quiz, "Rust ownership", 8)
            .with_subject("Programming");
        let input = UnitInput {
            subtopic: "Rust ownership - Part 2".to_string(),
            item_count: 4,
            fragment: None,
        };
        let generated = build_request(&request, &input, &GenerationConfig::default());
        let text = generated.last_user_text().unwrap();

        assert!(text.contains("exactly 4 multiple-choice questions"));
        assert!(text.contains("Section: Rust ownership - Part 2"));
        assert!(text.contains("Subject: Programming"));
        assert!(text.contains("\"questions\""));
        assert!(generated.system.is_some());
    }

    #[test]
    fn test_prompt_embeds_fragment() {
        let request = GenerationRequest::topic(ContentKind::Flashcards, "Cells", 2)
            .with_source_text("Mitochondria produce ATP.");
        let input = UnitInput {
            subtopic: "Cells".to_string(),
            item_count: 2,
            fragment: Some("Mitochondria produce ATP.".to_string()),
        };
        let generated = build_request(&request, &input, &GenerationConfig::default());
        assert!(generated
            .last_user_text()
            .unwrap()
            .contains("Mitochondria produce ATP."));
    }
}
