// Minute document export
// Renders a minute as Markdown or plain text into the export directory

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

use crate::database::MeetingMinute;

use super::prompts::format_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Text => "txt",
        }
    }
}

/// Write a minute document into `export_dir`, returning the file path.
/// File name: `{title}_{yyyyMMdd_HHmmss}.{ext}` with path separators
/// sanitized out of the title.
pub fn export_minute(
    export_dir: &Path,
    minute: &MeetingMinute,
    format: ExportFormat,
) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let file_name = format!(
        "{}_{}.{}",
        sanitize_title(&minute.title),
        timestamp,
        format.extension()
    );
    let path = export_dir.join(file_name);

    let content = match format {
        ExportFormat::Markdown => build_markdown(minute),
        ExportFormat::Text => build_text(minute),
    };

    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write minute export {}", path.display()))?;
    log::info!("Exported minute to {}", path.display());

    Ok(path)
}

pub fn build_markdown(minute: &MeetingMinute) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", minute.title));
    out.push_str(&format!("**创建时间**: {}\n\n", format_millis(minute.create_time)));
    out.push_str(&format!("## 摘要\n\n{}\n\n", minute.summary));

    if !minute.key_points.is_empty() {
        out.push_str("## 关键要点\n\n");
        for (idx, point) in minute.key_points.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", idx + 1, point));
        }
        out.push('\n');
    }

    if !minute.participants.is_empty() {
        out.push_str("## 参与者\n\n");
        for p in &minute.participants {
            match &p.role {
                Some(role) => out.push_str(&format!("- {} - {}\n", p.name, role)),
                None => out.push_str(&format!("- {}\n", p.name)),
            }
        }
        out.push('\n');
    }

    if !minute.action_items.is_empty() {
        out.push_str("## 待办事项\n\n");
        for item in &minute.action_items {
            out.push_str(&format!("### {}\n", item.description));
            if let Some(assignee) = &item.assignee {
                out.push_str(&format!("- 负责人: {}\n", assignee));
            }
            if let Some(deadline) = &item.deadline {
                out.push_str(&format!("- 截止日期: {}\n", deadline));
            }
            out.push_str(&format!("- 优先级: {}\n\n", item.priority.as_str()));
        }
    }

    out.push_str(&format!("## 完整内容\n\n{}\n", minute.full_content));
    out
}

pub fn build_text(minute: &MeetingMinute) -> String {
    let rule = "=".repeat(50);
    let thin = "-".repeat(50);
    let mut out = String::new();

    out.push_str(&format!("{}\n{}\n{}\n\n", rule, minute.title, rule));
    out.push_str(&format!("创建时间: {}\n\n", format_millis(minute.create_time)));
    out.push_str(&format!("{}\n摘要\n{}\n{}\n\n", thin, thin, minute.summary));

    if !minute.key_points.is_empty() {
        out.push_str(&format!("{}\n关键要点\n{}\n", thin, thin));
        for (idx, point) in minute.key_points.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", idx + 1, point));
        }
        out.push('\n');
    }

    if !minute.participants.is_empty() {
        out.push_str(&format!("{}\n参与者\n{}\n", thin, thin));
        for p in &minute.participants {
            match &p.role {
                Some(role) => out.push_str(&format!("{} - {}\n", p.name, role)),
                None => out.push_str(&format!("{}\n", p.name)),
            }
        }
        out.push('\n');
    }

    if !minute.action_items.is_empty() {
        out.push_str(&format!("{}\n待办事项\n{}\n", thin, thin));
        for item in &minute.action_items {
            out.push_str(&format!("【{}】\n", item.description));
            if let Some(assignee) = &item.assignee {
                out.push_str(&format!("  负责人: {}\n", assignee));
            }
            if let Some(deadline) = &item.deadline {
                out.push_str(&format!("  截止日期: {}\n", deadline));
            }
            out.push_str(&format!("  优先级: {}\n\n", item.priority.as_str()));
        }
    }

    out.push_str(&format!("{}\n完整内容\n{}\n{}\n", thin, thin, minute.full_content));
    out
}

fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    if cleaned.trim().is_empty() {
        "minute".to_string()
    } else {
        cleaned
    }
}
