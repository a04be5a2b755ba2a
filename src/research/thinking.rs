//! 推理痕迹清理：去掉 `<think>...</think>` 块

pub const THINK_START: &str = "<think>";
pub const THINK_END: &str = "</think>";

/// 反复删除第一个 `<think>` 到其后第一个 `</think>` 之间的内容（含标记本身）
pub fn strip_thinking_tokens(text: &str) -> String {
    let mut text = text.to_string();
    loop {
        let Some(start) = text.find(THINK_START) else {
            break;
        };
        let Some(rel_end) = text[start..].find(THINK_END) else {
            break;
        };
        let end = start + rel_end + THINK_END.len();
        text.replace_range(start..end, "");
    }
    text
}
