// Shared prompt fragments. Each service that calls the LLM keeps its own
// prompts.rs next to it and appends these where needed.

/// Closing instruction for every prompt that expects a JSON reply.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    IMPORTANT: Respond ONLY with valid JSON formatted exactly as specified above. \
    Your entire response must be parseable JSON with no additional text before or after. \
    Do NOT use markdown code fences.";

/// Placeholder used when a detail cannot be determined from the input.
pub const NOT_SPECIFIED: &str = "Not Specified";
