//! Prompt assembly for question generation.

use quiz_bank::Category;

/// System prompt sent with every generation request.
const SYSTEM_PROMPT: &str = "You write exam preparation questions. Reply with a single JSON object and nothing else.";

/// Builds generation prompts for a category.
pub struct PromptBuilder;

impl PromptBuilder {
    /// System prompt for the generator.
    pub fn system_prompt() -> &'static str {
        SYSTEM_PROMPT
    }

    /// Prompt asking for one multiple-choice question in the stored item shape.
    pub fn item_prompt(category: Category) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "Generate a {} level multiple-choice question based on the following topic: {}\n",
            category,
            category.focus()
        ));
        prompt.push_str("The question should have four options, exactly one of them correct. ");
        prompt.push_str("For each option, provide the following details:\n");
        prompt.push_str("1. Explanation for the option\n");
        prompt.push_str("2. Reason for the option being correct or incorrect\n");
        prompt.push_str("3. Study topic related to the option\n\n");

        prompt.push_str("Format the output as follows:\n");
        prompt.push_str(&format!(
            r#"{{
  "question": "Your question text",
  "question_type": "MCQ",
  "explanation": "Explanation of the correct answer",
  "topic": "{}",
  "options": [
    {{
      "option": "Option text",
      "is_correct": false,
      "explanation": "Explanation for the option",
      "reason": "Reason for the option",
      "study_topic": "Related study topic"
    }}
  ]
}}
"#,
            category
        ));

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_prompt_mentions_category_and_shape() {
        let prompt = PromptBuilder::item_prompt(Category::Upsc);

        assert!(prompt.starts_with("Generate a UPSC level multiple-choice question"));
        assert!(prompt.contains(Category::Upsc.focus()));
        assert!(prompt.contains("\"topic\": \"UPSC\""));
        assert!(prompt.contains("\"study_topic\""));
    }
}
