//! 研究循环的提示词模板

use chrono::Local;

/// 当前日期，形如 "October 17, 2026"
pub fn current_date() -> String {
    Local::now().format("%B %d, %Y").to_string()
}

pub fn query_writer_instructions(current_date: &str, research_topic: &str) -> String {
    format!(
        r#"Your goal is to generate a targeted web search query.

<CONTEXT>
Current date: {current_date}
Please ensure your queries account for the most current information available as of this date.
</CONTEXT>

<TOPIC>
{research_topic}
</TOPIC>
"#
    )
}

pub const JSON_MODE_QUERY_INSTRUCTIONS: &str = r#"<FORMAT>
Format your response as a JSON object with ALL three of these exact keys:
   - "query": The actual search query string
   - "rationale": Brief explanation of why this query is relevant
</FORMAT>

<EXAMPLE>
Example output:
{
    "query": "machine learning transformer architecture explained",
    "rationale": "Understanding the fundamental structure of transformer models"
}
</EXAMPLE>

Provide your response in JSON format:"#;

pub const TOOL_CALLING_QUERY_INSTRUCTIONS: &str = r#"<INSTRUCTIONS>
Call the Query tool to format your response with the following keys:
   - "query": The actual search query string
   - "rationale": Brief explanation of why this query is relevant
</INSTRUCTIONS>

Call the Query Tool to generate a query for this request:"#;

pub const SUMMARIZER_INSTRUCTIONS: &str = r#"<GOAL>
Generate a high-quality summary of the provided context.
</GOAL>

<REQUIREMENTS>
When creating a NEW summary:
1. Highlight the most relevant information related to the user topic from the search results
2. Ensure a coherent flow of information

When EXTENDING an existing summary:
1. Read the existing summary and new search results carefully.
2. Compare the new information with the existing summary.
3. For each piece of new information:
    a. If it's related to existing points, integrate it into the relevant paragraph.
    b. If it's entirely new but relevant, add a new paragraph with a smooth transition.
    c. If it's not relevant to the user topic, skip it.
4. Ensure all additions are relevant to the user's topic.
5. Verify that your final output differs from the input summary.
</REQUIREMENTS>

<FORMATTING>
- Start directly with the updated summary, without preamble or titles. Do not use XML tags in the output.
</FORMATTING>

<Task>
Think carefully about the provided Context first. Then generate a summary of the context to address the User Input.
</Task>"#;

pub fn reflection_instructions(research_topic: &str) -> String {
    format!(
        r#"You are an expert research assistant analyzing a summary about {research_topic}.

<GOAL>
1. Identify knowledge gaps or areas that need deeper exploration
2. Generate a follow-up question that would help expand your understanding
3. Focus on technical details, implementation specifics, or emerging trends that weren't fully covered
</GOAL>

<REQUIREMENTS>
Ensure the follow-up question is self-contained and includes necessary context for web search.
</REQUIREMENTS>
"#
    )
}

pub const JSON_MODE_REFLECTION_INSTRUCTIONS: &str = r#"<FORMAT>
Format your response as a JSON object with these exact keys:
- knowledge_gap: Describe what information is missing or needs clarification
- follow_up_query: Write a specific question to address this gap
</FORMAT>

<Task>
Reflect carefully on the Summary to identify knowledge gaps and produce a follow-up query. Then, produce your output following this JSON format:
{
    "knowledge_gap": "The summary lacks information about performance metrics and benchmarks",
    "follow_up_query": "What are typical performance benchmarks and metrics used to evaluate [specific technology]?"
}
</Task>

Provide your analysis in JSON format:"#;

pub const TOOL_CALLING_REFLECTION_INSTRUCTIONS: &str = r#"<INSTRUCTIONS>
Call the FollowUpQuery tool to format your response with the following keys:
- follow_up_query: Write a specific question to address this gap
- knowledge_gap: Describe what information is missing or needs clarification
</INSTRUCTIONS>

<Task>
Reflect carefully on the Summary to identify knowledge gaps and produce a follow-up query.
</Task>

Call the FollowUpQuery Tool to generate a reflection for this request:"#;

/// 总结步骤的用户消息：已有摘要时要求增量更新，否则从头生成
pub fn summarize_request(topic: &str, latest_result: &str, existing: Option<&str>) -> String {
    match existing.filter(|s| !s.is_empty()) {
        Some(existing) => format!(
            "<Existing Summary> \n {existing} \n <Existing Summary>\n\n\
             <New Context> \n {latest_result} \n <New Context>\
             Update the Existing Summary with the New Context on this topic: \n <User Input> \n {topic} \n <User Input>\n\n"
        ),
        None => format!(
            "<Context> \n {latest_result} \n <Context>\
             Create a Summary using the Context on this topic: \n <User Input> \n {topic} \n <User Input>\n\n"
        ),
    }
}

/// 反思步骤的用户消息
pub fn reflection_request(summary: Option<&str>) -> String {
    format!(
        "Reflect on our existing knowledge: \n === \n {}, \n === \n And now identify a knowledge gap and generate a follow-up web search query:",
        summary.unwrap_or_default()
    )
}

pub const QUERY_REQUEST: &str = "Generate a query for web search:";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_writer_embeds_date_and_topic() {
        let p = query_writer_instructions("October 17, 2026", "quantum computing");
        assert!(p.contains("Current date: October 17, 2026"));
        assert!(p.contains("<TOPIC>\nquantum computing\n</TOPIC>"));
    }

    #[test]
    fn test_summarize_request_switches_on_existing_summary() {
        let fresh = summarize_request("rust", "ctx", None);
        assert!(fresh.starts_with("<Context>"));
        assert!(fresh.contains("Create a Summary"));

        let update = summarize_request("rust", "ctx", Some("old summary"));
        assert!(update.contains("<Existing Summary> \n old summary"));
        assert!(update.contains("Update the Existing Summary"));

        // 空摘要视同没有
        assert!(summarize_request("rust", "ctx", Some("")).contains("Create a Summary"));
    }

    #[test]
    fn test_current_date_is_human_readable() {
        let d = current_date();
        assert!(d.contains(", "));
        assert!(d.chars().any(|c| c.is_ascii_digit()));
    }
}
