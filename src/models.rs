use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::gate::Role;

/// Deserializes a field that distinguishes "absent" from "null": absent stays
/// `None` via `#[serde(default)]`, `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// --- Identity ---

/// User
///
/// Identity record in `squeak_users`, keyed by the JWT `sub`. Roles are
/// per-organization and live in `squeak_roles`, not here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

// --- Organization Config ---

/// SqueakConfig
///
/// The per-organization settings row (`squeak_config`). Exactly one per
/// organization. Admins see all of it; everyone else sees `PublicConfig`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct SqueakConfig {
    pub id: i64,
    pub organization_id: String,

    pub company_name: Option<String>,
    pub company_domain: Option<String>,

    // Slack import.
    pub slack_api_key: Option<String>,
    pub slack_question_channel: Option<String>,
    pub show_slack_user_profiles: bool,

    // Mailgun reply notifications.
    pub mailgun_api_key: Option<String>,
    pub mailgun_domain: Option<String>,
    pub mailgun_from_email: Option<String>,
    pub mailgun_from_name: Option<String>,

    // Widget embedding.
    pub allowed_origins: Option<Vec<String>>,
    pub question_auto_publish: bool,
    pub reply_auto_publish: bool,

    pub permalink_base: Option<String>,
    pub permalinks_enabled: bool,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// PublicConfig
///
/// The only config fields a non-admin caller may ever read.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct PublicConfig {
    pub permalink_base: Option<String>,
    pub permalinks_enabled: bool,
    pub allowed_origins: Option<Vec<String>>,
}

impl From<SqueakConfig> for PublicConfig {
    fn from(config: SqueakConfig) -> Self {
        Self {
            permalink_base: config.permalink_base,
            permalinks_enabled: config.permalinks_enabled,
            allowed_origins: config.allowed_origins,
        }
    }
}

/// UpdateConfigRequest
///
/// Partial update payload for `PATCH /api/config`. This struct is the field
/// allow-list: anything not named here is rejected at deserialization.
/// Nullable columns are double options: an explicit `null` clears the value,
/// an absent key leaves it alone.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct UpdateConfigRequest {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub company_domain: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub company_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub slack_api_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub slack_question_channel: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub mailgun_api_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub mailgun_domain: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub mailgun_from_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub mailgun_from_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<String>>)]
    #[ts(type = "Array<string> | null")]
    pub allowed_origins: Option<Option<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_auto_publish: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_auto_publish: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_slack_user_profiles: Option<bool>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub permalink_base: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permalinks_enabled: Option<bool>,
}

/// SettingsResponse
///
/// What the settings page renders. Unset values come back as empty strings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct SettingsResponse {
    pub mailgun_api_key: String,
    pub mailgun_domain: String,
    pub company_name: String,
    pub company_domain: String,
    pub slack_api_key: String,
    pub slack_question_channel: String,
}

impl From<&SqueakConfig> for SettingsResponse {
    fn from(config: &SqueakConfig) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            mailgun_api_key: text(&config.mailgun_api_key),
            mailgun_domain: text(&config.mailgun_domain),
            company_name: text(&config.company_name),
            company_domain: text(&config.company_domain),
            slack_api_key: text(&config.slack_api_key),
            slack_question_channel: text(&config.slack_question_channel),
        }
    }
}

// --- Questions & Replies ---

/// Message
///
/// A question thread header (`squeak_messages`). Created by the widget or a
/// Slack import; admins only edit or delete it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Message {
    pub id: i64,
    pub organization_id: String,
    pub subject: Option<String>,
    // Page paths the question appears on.
    pub slug: Option<Vec<String>>,
    pub published: bool,
    pub resolved: bool,
    // Set only for threads imported from Slack.
    pub slack_timestamp: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ReplyAuthor
///
/// The profile columns joined onto a reply. All optional: profiles may be
/// partially filled or missing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct ReplyAuthor {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Reply {
    pub id: i64,
    pub message_id: i64,
    pub body: Option<String>,
    pub published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub profile: ReplyAuthor,
}

/// QuestionThread
///
/// A message with its replies in `created_at` order. The first reply is the
/// question body itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct QuestionThread {
    pub question: Message,
    pub replies: Vec<Reply>,
}

/// UpdateQuestionRequest
///
/// Thread options editable from the question page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateQuestionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
}

// --- Question Feed (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct QuestionSummary {
    pub question: Message,
    pub first_reply: Option<Reply>,
    pub reply_count: usize,
    // "1 reply" / "N replies"
    pub reply_label: String,
    pub via_slack: bool,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub links: Vec<String>,
}

/// DayGroup
///
/// Questions posted the same number of days ago.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct DayGroup {
    pub days_ago: i64,
    pub questions: Vec<QuestionSummary>,
}

/// QuestionFeed
///
/// Output schema for `GET /api/questions`: one page of questions grouped by day.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct QuestionFeed {
    pub count: i64,
    pub start: i64,
    pub previous: Option<i64>,
    pub next: Option<i64>,
    pub groups: Vec<DayGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct ReplyView {
    pub reply: Reply,
    pub author_name: String,
    // False for the first reply: it is the question body.
    pub deletable: bool,
}

/// ThreadView
///
/// Output schema for `GET /api/questions/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct ThreadView {
    pub question: Message,
    pub links: Vec<String>,
    pub replies: Vec<ReplyView>,
}

// --- Roadmap & Teams ---

/// Roadmap
///
/// A roadmap goal (`squeak_roadmaps`), joined with its team's name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Roadmap {
    pub id: i64,
    pub organization_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub complete: bool,
    #[ts(type = "string | null")]
    pub date_completed: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub projected_completion_date: Option<DateTime<Utc>>,
    pub github_urls: Option<Vec<String>>,
    pub milestone: bool,
    pub team_id: Option<i64>,
    #[sqlx(default)]
    pub team_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateRoadmapRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub complete: bool,
    #[ts(type = "string | null")]
    pub date_completed: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub projected_completion_date: Option<DateTime<Utc>>,
    pub github_urls: Option<Vec<String>>,
    #[serde(default)]
    pub milestone: bool,
    #[serde(alias = "teamId")]
    pub team_id: Option<i64>,
}

/// UpdateRoadmapRequest
///
/// Partial update; also used to assign a team (`teamId`). `null` clears a
/// nullable column, e.g. `{"teamId": null}` unassigns the team.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateRoadmapRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub category: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    #[ts(type = "string | null")]
    pub date_completed: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    #[ts(type = "string | null")]
    pub projected_completion_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<String>>)]
    #[ts(type = "Array<string> | null")]
    pub github_urls: Option<Option<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<bool>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none",
        alias = "teamId"
    )]
    #[schema(value_type = Option<i64>)]
    #[ts(type = "number | null")]
    pub team_id: Option<Option<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Team {
    pub id: i64,
    pub organization_id: String,
    pub name: String,
}

// --- Webhooks ---

/// WebhookConfig
///
/// An outgoing alert target (`squeak_webhook_config`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct WebhookConfig {
    pub id: i64,
    pub organization_id: String,
    // 'type' is reserved in Rust; kept as "type" on the wire and in SQL.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub webhook_type: String,
    pub url: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateWebhookRequest {
    pub url: String,
}

/// WebhookEvent
///
/// JSON body posted to a webhook target.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub organization_id: String,
    pub message: String,
}

// --- Session ---

/// MeResponse
///
/// Output schema for `GET /api/me`: who the caller is and what they are in the
/// active organization.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub organization_id: Option<String>,
    pub role: Role,
}
