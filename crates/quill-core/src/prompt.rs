//! The tool-aware system prompt.

use quill_tools::Tool;

/// Build the system prompt that teaches the model which tools exist and how
/// to emit a tool call.
pub fn build_system_prompt(tools: &[Tool]) -> String {
    let tools_description = tools
        .iter()
        .map(Tool::format_for_prompt)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a helpful assistant with access to these tools:\n\n\
         {tools_description}\n\
         Choose the appropriate tool based on the user's question. \
         If no tool is needed, reply directly.\n\n\
         IMPORTANT: When you need to use a tool:\n\
         1. You can first provide a natural language response to the user\n\
         2. Then include a tool call in JSON format like this:\n\
         {{\n    \"tool\": \"tool-name\",\n    \"arguments\": {{\n        \"argument-name\": \"value\"\n    }}\n}}\n\n\
         When you receive a tool result, you can provide another natural language response \
         and then decide if you need more information. \
         If yes, include another tool call in the same format. \
         If no, simply give your final answer.\n\n\
         Guidelines for responses:\n\
         1. Transform raw data into natural, conversational responses\n\
         2. Keep responses concise but informative\n\
         3. Focus on the most relevant information\n\
         4. Maintain a conversational flow\n\
         Please use only the tools that are explicitly defined above."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_interpolates_tool_descriptions() {
        let tools = vec![Tool::new(
            "get_weather",
            "Fetch the current weather",
            serde_json::json!({
                "type": "object",
                "properties": {"city": {"type": "string", "description": "City name"}},
                "required": ["city"]
            }),
            "utilities",
        )];
        let prompt = build_system_prompt(&tools);
        assert!(prompt.starts_with("You are a helpful assistant with access to these tools:"));
        assert!(prompt.contains("Tool: get_weather"));
        assert!(prompt.contains("- city: City name (required)"));
        assert!(prompt.contains("\"tool\": \"tool-name\""));
        assert!(prompt.ends_with("Please use only the tools that are explicitly defined above."));
    }

    #[test]
    fn prompt_without_tools_still_carries_the_instructions() {
        let prompt = build_system_prompt(&[]);
        assert!(prompt.contains("If no tool is needed, reply directly."));
    }
}
