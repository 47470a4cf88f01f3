pub const DEFAULT_QWEN_MODEL: &str = "qwen-plus";

pub const QWEN_MODELS: &[&str] = &[
    "qwen-plus",
    "qwen-max-latest",
    "qvq-max-latest",
    "deepseek-r1",
    "deepseek-v3",
];

/// What the upstream model can do, derived from its id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelCapabilities {
    /// Accepts `image_url` / `video_url` content blocks.
    pub vision: bool,
    /// Streams `reasoning_content` next to the answer.
    pub reasoning: bool,
}

impl ModelCapabilities {
    pub fn for_model(model: &str) -> Self {
        let model = model.to_ascii_lowercase();
        Self {
            vision: ["qvq", "qwen-max", "deepseek", "-vl"]
                .iter()
                .any(|needle| model.contains(needle)),
            reasoning: ["qvq", "deepseek-r1", "deepseek-reasoner"]
                .iter()
                .any(|needle| model.contains(needle)),
        }
    }
}
