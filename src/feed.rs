//! Pure shaping of already-fetched question data for the dashboard:
//! pagination, grouping by day, permalinks and display names.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use url::{Origin, Url};

use crate::models::{
    DayGroup, QuestionFeed, QuestionSummary, QuestionThread, Reply, ReplyView, ThreadView,
};

/// Questions per dashboard page.
pub const PAGE_SIZE: i64 = 20;

const MILLIS_PER_DAY: f64 = 1000.0 * 3600.0 * 24.0;

/// Whole days between `created_at` and `now`, rounded half up.
pub fn days_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let diff = (now - created_at).num_milliseconds() as f64;
    (diff / MILLIS_PER_DAY + 0.5).floor() as i64
}

/// `(previous, next)` page offsets, if those pages exist.
pub fn page_links(start: i64, count: i64) -> (Option<i64>, Option<i64>) {
    let previous = (start > 0).then(|| start.saturating_sub(PAGE_SIZE).max(0));
    // `start` comes straight from the query string.
    let next = start.checked_add(PAGE_SIZE).filter(|next| *next < count);
    (previous, next)
}

/// Scheme, host and port of the company domain, or `""` when the domain is
/// unset or not an absolute URL.
pub fn site_origin(company_domain: Option<&str>) -> String {
    let Some(parsed) = company_domain.and_then(|domain| Url::parse(domain.trim()).ok()) else {
        return String::new();
    };
    match parsed.origin() {
        origin @ Origin::Tuple(..) => origin.ascii_serialization(),
        Origin::Opaque(_) => String::new(),
    }
}

/// Public URLs a question appears on.
pub fn question_links(origin: &str, slugs: Option<&[String]>) -> Vec<String> {
    slugs
        .unwrap_or_default()
        .iter()
        .map(|slug| format!("{origin}{}", slug.trim()))
        .collect()
}

pub fn reply_label(count: usize) -> String {
    match count {
        1 => "1 reply".to_string(),
        n => format!("{n} replies"),
    }
}

fn full_name(reply: &Reply) -> String {
    let name = [&reply.profile.first_name, &reply.profile.last_name]
        .into_iter()
        .flatten()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() { "Anonymous".to_string() } else { name }
}

/// summarize
///
/// The first reply is the question body; everything after it counts as a reply.
/// Slack imports carry no profile worth showing.
pub fn summarize(thread: QuestionThread, origin: &str) -> QuestionSummary {
    let QuestionThread { question, replies } = thread;
    let reply_count = replies.len().saturating_sub(1);
    let via_slack = question.slack_timestamp.is_some();
    let first_reply = replies.into_iter().next();

    let author_name = match (&first_reply, via_slack) {
        (_, true) => "Slack User".to_string(),
        (Some(reply), false) => full_name(reply),
        (None, false) => "Anonymous".to_string(),
    };

    QuestionSummary {
        links: question_links(origin, question.slug.as_deref()),
        author_avatar: first_reply.as_ref().and_then(|r| r.profile.avatar.clone()),
        first_reply,
        reply_count,
        reply_label: reply_label(reply_count),
        via_slack,
        author_name,
        question,
    }
}

/// build_feed
///
/// Groups one page of threads by day distance, nearest day first. Within a
/// day the incoming (newest first) order is kept.
pub fn build_feed(
    threads: Vec<QuestionThread>,
    count: i64,
    start: i64,
    company_domain: Option<&str>,
    now: DateTime<Utc>,
) -> QuestionFeed {
    let origin = site_origin(company_domain);

    let mut by_day: BTreeMap<i64, Vec<QuestionSummary>> = BTreeMap::new();
    for thread in threads {
        let days = days_ago(thread.question.created_at, now);
        by_day.entry(days).or_default().push(summarize(thread, &origin));
    }

    let (previous, next) = page_links(start, count);
    QuestionFeed {
        count,
        start,
        previous,
        next,
        groups: by_day
            .into_iter()
            .map(|(days_ago, questions)| DayGroup { days_ago, questions })
            .collect(),
    }
}

/// thread_view
///
/// Full thread for the question page. Only the opening reply is protected
/// from deletion.
pub fn thread_view(thread: QuestionThread, company_domain: Option<&str>) -> ThreadView {
    let origin = site_origin(company_domain);
    let links = question_links(&origin, thread.question.slug.as_deref());

    let replies = thread
        .replies
        .into_iter()
        .enumerate()
        .map(|(position, reply)| ReplyView {
            author_name: reply
                .profile
                .first_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "Anonymous".to_string()),
            deletable: position > 0,
            reply,
        })
        .collect();

    ThreadView { question: thread.question, links, replies }
}
