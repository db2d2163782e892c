// src/notify/render.rs
//! Markdown rendering of the digest and the push service's size limits.

use chrono::NaiveDateTime;

use super::Message;
use crate::ingest::types::Paper;
use crate::summarize::take_chars;

/// Push service limits: title in characters, body in bytes.
pub const TITLE_LIMIT_CHARS: usize = 100;
pub const BODY_LIMIT_BYTES: usize = 64 * 1024;
/// Oversized bodies are cut below this before the notice is appended.
pub const BODY_TRIM_TARGET_BYTES: usize = 60 * 1024;
const TRIM_STEP_CHARS: usize = 1000;
pub const TRUNCATION_NOTICE: &str = "\n\n...(content too long, truncated)";

pub fn fit_title(title: &str) -> String {
    if title.chars().count() > TITLE_LIMIT_CHARS {
        format!("{}...", take_chars(title, TITLE_LIMIT_CHARS - 3))
    } else {
        title.to_string()
    }
}

/// Bodies over the byte limit lose 1000 chars at a time until they fit the trim
/// target, then get the truncation notice.
pub fn fit_body(mut body: String) -> String {
    if body.len() <= BODY_LIMIT_BYTES {
        return body;
    }
    let original = body.len();
    while body.len() > BODY_TRIM_TARGET_BYTES {
        let cut = body
            .char_indices()
            .rev()
            .nth(TRIM_STEP_CHARS - 1)
            .map(|(i, _)| i)
            .unwrap_or(0);
        body.truncate(cut);
    }
    body.push_str(TRUNCATION_NOTICE);
    tracing::warn!(target: "notify", from = original, to = body.len(), "digest body truncated");
    body
}

fn author_line(authors: &[String]) -> String {
    let mut out = authors
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if authors.len() > 3 {
        out.push_str(" et al.");
    }
    out
}

/// One Markdown card, `index` is 1-based.
pub fn render_card(paper: &Paper, index: usize) -> String {
    let marker = if paper.is_priority { "⭐ " } else { "" };
    let body = match &paper.analysis {
        Some(a) => a.text.clone(),
        None => format!("{}...", take_chars(&paper.summary, 300)),
    };
    format!(
        "### {marker}{index}. {title}\n\n\
**Authors**: {authors}  \n\
**Published**: {date}  \n\
**arXiv**: [{id}]({link})\n\n\
{body}\n\n\
---\n\n",
        title = paper.title,
        authors = author_line(&paper.authors),
        date = paper.published_day().format("%Y-%m-%d"),
        id = paper.arxiv_id,
        link = paper.link,
    )
}

pub fn render_digest(papers: &[Paper], topic: &str, now: NaiveDateTime) -> Message {
    let today = now.format("%Y-%m-%d");
    let total = papers.len();
    let priority = papers.iter().filter(|p| p.is_priority).count();
    let analyzed = papers.iter().filter(|p| p.analysis_succeeded()).count();

    let title = format!("📚 arXiv {topic} digest ({today})");

    let mut body = format!(
        "# 📚 Today's arXiv picks: {topic}\n\n\
**Date**: {today}  \n\
**Papers**: {total}  \n\
**Priority institutions**: {priority} ⭐  \n\
**AI analysis succeeded**: {analyzed}/{total}\n\n\
---\n\n"
    );
    for (i, p) in papers.iter().enumerate() {
        body.push_str(&render_card(p, i + 1));
    }
    body.push_str(&format!(
        "\n\n---\n\n🤖 *Generated automatically by paper-digest*  \n📅 *Generated at: {}*\n",
        now.format("%Y-%m-%d %H:%M:%S")
    ));

    Message { title, body }
}

/// Fixed message for days without matching papers.
pub fn render_empty(topic: &str, now: NaiveDateTime) -> Message {
    Message {
        title: "📭 No new papers today".to_string(),
        body: format!(
            "No {topic} papers matched today's query.\n\nGenerated at: {}",
            now.format("%Y-%m-%d %H:%M:%S")
        ),
    }
}

/// Empty input renders the "no new papers" message, never an empty list.
pub fn compose(papers: &[Paper], topic: &str, now: NaiveDateTime) -> Message {
    if papers.is_empty() {
        render_empty(topic, now)
    } else {
        render_digest(papers, topic, now)
    }
}
