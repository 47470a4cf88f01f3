pub mod gemini2openai_chat_completions;
