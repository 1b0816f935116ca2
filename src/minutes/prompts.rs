// Prompt construction for minute and timeline-brief generation
// System instructions constrain the model to a single JSON object; user
// prompts embed the recording metadata and transcript content.

use chrono::{Local, TimeZone};

use crate::database::{CallRecord, MinuteWithContact, Transcript};

/// System instruction for meeting-minute generation. The schema matches
/// `parser::MinutePayload`; priorities are constrained to HIGH/MEDIUM/LOW.
pub const MINUTE_SYSTEM_PROMPT: &str = r#"你是一名专业的商务/个人事务会谈纪要助手。你的任务是根据通话录音的转写文本，生成高质量的结构化会谈纪要。

## 输出要求
- **语言**：全部使用中文输出
- **格式**：仅返回合法的 JSON 对象，不要添加任何 Markdown 代码块标记、注释或额外文字
- **严格遵循**下方 JSON Schema

## JSON 格式
{
  "title": "(string) 会谈标题，10-30字，精炼概括核心议题",
  "summary": "(string) 会谈摘要，100-200字，涵盖背景、讨论要点和结论",
  "keyPoints": ["(string) 关键要点，3-7条，每条15-50字，按重要性排序"],
  "participants": [{"name": "(string) 参与者姓名", "role": "(string|null) 角色/职务", "speakerId": "(string) 说话人标识"}],
  "actionItems": [{"description": "(string) 待办事项描述", "assignee": "(string|null) 负责人", "deadline": "(string|null) 截止日期", "priority": "(enum: HIGH|MEDIUM|LOW) 优先级"}],
  "fullContent": "(string) 整理后的完整会谈内容，保留关键细节，按逻辑分段"
}

## 注意事项
- 如果转写文本质量较低或内容较短，仍需尽力提取有价值信息
- 待办事项的 priority 只能是 HIGH、MEDIUM、LOW 三者之一
- participants 中至少包含通话双方
- 如果无法识别具体待办事项，actionItems 返回空数组 []"#;

/// System instruction for timeline-brief generation over multiple minutes.
pub const TIMELINE_SYSTEM_PROMPT: &str = r#"你是一名专业的事件分析师。你的任务是根据多条不同时间的会谈纪要，梳理事件发展脉络，生成一份结构化的事件发展脉络简报。

## 输出要求
- **语言**：全部使用中文输出
- **格式**：仅返回合法的 JSON 对象，不要添加任何 Markdown 代码块标记、注释或额外文字
- **严格遵循**下方 JSON Schema

## JSON 格式
{
  "title": "(string) 事件总标题，10-30字，精炼概括贯穿多次会谈的核心事件",
  "timelineNodes": [
    {
      "date": "(string) 该次会谈的日期时间",
      "summary": "(string) 该时间节点的关键进展摘要，50-100字"
    }
  ],
  "trendAnalysis": "(string) 事件发展趋势分析，100-200字，分析事件从开始到现在的演变趋势",
  "currentStatus": "(string) 当前最新状态总结，50-150字",
  "followUpSuggestions": ["(string) 后续跟进建议，3-5条，每条20-50字"]
}

## 注意事项
- timelineNodes 必须按时间从早到晚排序
- 每条纪要对应一个 timelineNode
- 重点提取每次会谈中事件的关键状态变化
- 分析事件发展趋势时要体现时间维度的变化
- followUpSuggestions 要基于事件当前状态给出具体可操作的建议"#;

/// User prompt for minute generation: recording metadata + speaker-grouped
/// transcript + full text.
pub fn build_minute_prompt(transcript: &Transcript, record: &CallRecord) -> String {
    let contact = record
        .contact_name
        .as_deref()
        .or(record.phone_number.as_deref())
        .unwrap_or("未知联系人");
    let record_time = format_millis(record.record_time);
    let duration = format_duration(record.duration_seconds);
    let speaker_texts = transcript.speaker_grouped_text();

    format!(
        "## 录音元数据\n\
         - 联系人：{}\n\
         - 通话时间：{}\n\
         - 通话时长：{}\n\
         \n\
         ## 转写内容\n\
         {}\n\
         \n\
         ## 完整文本\n\
         {}\n\
         \n\
         请根据以上信息生成结构化的会谈纪要（JSON格式）。",
        contact, record_time, duration, speaker_texts, transcript.full_text
    )
}

/// User prompt for timeline-brief generation. `minutes` must already be in
/// chronological order; the prompt asks the model to track progression, so
/// section order is a correctness requirement, not presentation.
pub fn build_timeline_prompt(minutes: &[MinuteWithContact]) -> String {
    let entries = minutes
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            let date = format_millis(m.sort_time());
            let contact = m.contact_name.as_deref().unwrap_or("未知联系人");
            let key_points = m
                .key_points
                .iter()
                .map(|p| format!("  - {}", p))
                .collect::<Vec<_>>()
                .join("\n");
            let action_items = m
                .action_items
                .iter()
                .map(|item| {
                    let assignee = item
                        .assignee
                        .as_deref()
                        .map(|a| format!("（{}）", a))
                        .unwrap_or_default();
                    format!("  - [{}] {}{}", item.priority.as_str(), item.description, assignee)
                })
                .collect::<Vec<_>>()
                .join("\n");

            format!(
                "### 第{}条纪要\n\
                 - 日期：{}\n\
                 - 联系人：{}\n\
                 - 标题：{}\n\
                 - 摘要：{}\n\
                 - 关键要点：\n{}\n\
                 - 待办事项：\n{}\n\
                 - 完整内容：\n{}",
                idx + 1,
                date,
                contact,
                m.title,
                m.summary,
                key_points,
                action_items,
                m.full_content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "以下是按时间排序的多条会谈纪要，它们记录了同一事件或相关事件在不同时间的讨论。\
         请根据这些纪要生成一份事件发展脉络简报。\n\
         \n\
         {}\n\
         \n\
         请生成脉络简报（JSON格式）。",
        entries
    )
}

/// Sort minutes ascending by capture time, falling back to creation time.
pub fn sort_for_timeline(mut minutes: Vec<MinuteWithContact>) -> Vec<MinuteWithContact> {
    minutes.sort_by_key(|m| m.sort_time());
    minutes
}

/// `yyyy-MM-dd HH:mm` in local time.
pub fn format_millis(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => millis.to_string(),
    }
}

/// `X分Y秒` for durations of a minute or more, else `Y秒`.
pub fn format_duration(total_seconds: i64) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    if minutes > 0 {
        format!("{}分{}秒", minutes, seconds)
    } else {
        format!("{}秒", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{SpeakerSegment, TranscriptStatus};

    fn record(contact: Option<&str>) -> CallRecord {
        CallRecord {
            id: 1,
            file_name: "a.mp3".to_string(),
            file_path: "/tmp/a.mp3".to_string(),
            phone_number: Some("13800001234".to_string()),
            contact_name: contact.map(|c| c.to_string()),
            duration_seconds: 125,
            file_size: 1,
            record_time: 0,
            create_time: 0,
            is_transcribed: true,
            transcript_id: Some(1),
        }
    }

    fn transcript() -> Transcript {
        Transcript {
            id: 1,
            record_id: 1,
            full_text: "完整文本内容".to_string(),
            speakers: vec![SpeakerSegment {
                speaker: "Speaker 1".to_string(),
                text: "完整文本内容".to_string(),
                start_time: 0.0,
                end_time: 0.0,
            }],
            status: TranscriptStatus::Completed,
            create_time: 0,
            update_time: 0,
        }
    }

    fn minute_at(title: &str, record_time: Option<i64>, create_time: i64) -> MinuteWithContact {
        MinuteWithContact {
            id: 0,
            transcript_id: 0,
            title: title.to_string(),
            summary: "摘要".to_string(),
            key_points: vec!["要点".to_string()],
            participants: vec![],
            action_items: vec![],
            full_content: "内容".to_string(),
            create_time,
            update_time: create_time,
            contact_name: Some("张三".to_string()),
            record_time,
            record_id: None,
            record_file_name: None,
        }
    }

    #[test]
    fn test_minute_prompt_embeds_metadata() {
        let prompt = build_minute_prompt(&transcript(), &record(Some("张三")));
        assert!(prompt.contains("- 联系人：张三"));
        assert!(prompt.contains("- 通话时长：2分5秒"));
        assert!(prompt.contains("Speaker 1:"));
        assert!(prompt.contains("## 完整文本"));
    }

    #[test]
    fn test_minute_prompt_falls_back_to_phone() {
        let prompt = build_minute_prompt(&transcript(), &record(None));
        assert!(prompt.contains("- 联系人：13800001234"));
    }

    #[test]
    fn test_timeline_sections_follow_sorted_order() {
        // Input order T1, T3, T2; expected chronological order T2, T1, T3.
        let minutes = sort_for_timeline(vec![
            minute_at("第二次", Some(200), 0),
            minute_at("第三次", Some(300), 0),
            minute_at("第一次", Some(100), 0),
        ]);
        let prompt = build_timeline_prompt(&minutes);

        let first = prompt.find("第一次").unwrap();
        let second = prompt.find("第二次").unwrap();
        let third = prompt.find("第三次").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_sort_falls_back_to_create_time() {
        let sorted = sort_for_timeline(vec![
            minute_at("b", None, 500),
            minute_at("a", Some(100), 900),
        ]);
        assert_eq!(sorted[0].title, "a");
        assert_eq!(sorted[1].title, "b");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45秒");
        assert_eq!(format_duration(60), "1分0秒");
        assert_eq!(format_duration(125), "2分5秒");
    }
}
