//! Prompt text and response schemas.

use serde_json::{json, Value};
use vrev_models::{format_time, StoryboardShot};

/// Instruction sent alongside every frame.
pub const FRAME_ANALYSIS_PROMPT: &str = "分析这个视频帧。扮演一位专业的电影制作人和 AI 提示词工程师。解构这个场景。\n\
请注意：\n\
1. 'visualDescription' 和 'technicalBreakdown' 必须使用简体中文回复。\n\
2. 'aiPrompt' 请保持使用英文，因为这是针对 Midjourney/Stable Diffusion 优化的提示词。\n\
3. 如果画面中有人物，请在 'characterPrompt' 中用英文描述人物外貌、服装和姿态；没有人物时省略该字段。\n\
4. 'colorPalette' 给出 3-5 个 #RRGGBB 格式的主色。";

/// JSON schema the model must answer frame analysis with.
pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "visualDescription": {
                "type": "STRING",
                "description": "场景的详细视觉描述，包括主体、动作和环境 (Simplified Chinese)."
            },
            "aiPrompt": {
                "type": "STRING",
                "description": "A high-quality text-to-image prompt (English) for Midjourney/Stable Diffusion."
            },
            "characterPrompt": {
                "type": "STRING",
                "description": "English prompt describing the main human subject. Omit when no person is visible."
            },
            "technicalBreakdown": {
                "type": "STRING",
                "description": "从专业电影制作角度解释这个镜头是如何拍摄的，包括灯光、镜头选择、CGI或实拍特效等 (Simplified Chinese)."
            },
            "colorPalette": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of 3-5 hex color codes."
            }
        },
        "required": ["visualDescription", "aiPrompt", "technicalBreakdown", "colorPalette"]
    })
}

/// Build the storyboard prompt from shots in timestamp order.
pub fn build_storyboard_prompt(shots: &[StoryboardShot]) -> String {
    let mut prompt = String::from(
        "你是一位专业的分镜师。以下是同一段视频中按时间顺序排列的关键帧分析。\n\
请根据这些镜头撰写一份分镜脚本：\n\
1. 先用一段话概括整段视频的故事梗概。\n\
2. 然后按时间顺序列出每个镜头，包含时间码、画面内容和拍摄手法。\n\
请使用简体中文，输出纯文本。\n\n镜头列表：\n",
    );

    for (index, shot) in shots.iter().enumerate() {
        prompt.push_str(&format!(
            "\n镜头 {} [{}]\n画面：{}\n技术：{}\n",
            index + 1,
            format_time(shot.timestamp),
            shot.visual_description,
            shot.technical_breakdown
        ));
    }

    prompt
}

/// Strip a surrounding markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(timestamp: f64, visual: &str) -> StoryboardShot {
        StoryboardShot {
            timestamp,
            visual_description: visual.to_string(),
            technical_breakdown: "手持".to_string(),
        }
    }

    #[test]
    fn test_schema_requires_core_fields() {
        let schema = analysis_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(
            required,
            vec!["visualDescription", "aiPrompt", "technicalBreakdown", "colorPalette"]
        );
        assert!(schema["properties"]["characterPrompt"].is_object());
    }

    #[test]
    fn test_storyboard_prompt_lists_shots_in_order() {
        let prompt = build_storyboard_prompt(&[shot(5.0, "开场"), shot(125.0, "结尾")]);
        let first = prompt.find("[0:05]").unwrap();
        let second = prompt.find("[2:05]").unwrap();
        assert!(first < second);
        assert!(prompt.contains("画面：开场"));
        assert!(prompt.contains("镜头 2"));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"b\":2} "), "{\"b\":2}");
    }
}
