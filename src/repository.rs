use crate::models::{
    CreateRoadmapRequest, Message, QuestionThread, Reply, Roadmap, SqueakConfig, Team,
    UpdateConfigRequest, UpdateQuestionRequest, UpdateRoadmapRequest, User, WebhookConfig,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, sqlx::Error>;

/// Repository Trait
///
/// The persistence contract. Handlers only see this trait, so tests swap in an
/// in-memory double. Every method that touches tenant data takes the
/// organization id and scopes its query by it: a row belonging to another
/// organization behaves exactly like a missing row.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    /// The stored role string ("admin" / "member") for this user in this
    /// organization, or `None` when the user has no role row there.
    async fn get_user_role(&self, organization_id: &str, user_id: Uuid) -> RepoResult<Option<String>>;

    // --- Config ---
    async fn get_config(&self, organization_id: &str) -> RepoResult<Option<SqueakConfig>>;
    /// Applies only the supplied fields; `Some(None)` clears a nullable column.
    /// `None` when the organization has no config row.
    async fn update_config(
        &self,
        organization_id: &str,
        req: UpdateConfigRequest,
    ) -> RepoResult<Option<SqueakConfig>>;

    // --- Questions ---
    /// One page of threads, newest first, plus the organization's total question count.
    async fn get_questions(
        &self,
        organization_id: &str,
        start: i64,
        limit: i64,
    ) -> RepoResult<(Vec<QuestionThread>, i64)>;
    async fn get_question(&self, organization_id: &str, id: i64) -> RepoResult<Option<QuestionThread>>;
    async fn update_question(
        &self,
        organization_id: &str,
        id: i64,
        req: UpdateQuestionRequest,
    ) -> RepoResult<Option<Message>>;
    async fn delete_question(&self, organization_id: &str, id: i64) -> RepoResult<bool>;

    // --- Replies ---
    /// `Some(true)` when the reply opens its thread, `None` when it does not exist.
    async fn reply_is_thread_root(&self, organization_id: &str, id: i64) -> RepoResult<Option<bool>>;
    async fn delete_reply(&self, organization_id: &str, id: i64) -> RepoResult<bool>;

    // --- Roadmap & Teams ---
    async fn get_roadmap(&self, organization_id: &str) -> RepoResult<Vec<Roadmap>>;
    async fn create_roadmap(&self, organization_id: &str, req: CreateRoadmapRequest) -> RepoResult<Roadmap>;
    async fn update_roadmap(
        &self,
        organization_id: &str,
        id: i64,
        req: UpdateRoadmapRequest,
    ) -> RepoResult<Option<Roadmap>>;
    async fn delete_roadmap(&self, organization_id: &str, id: i64) -> RepoResult<bool>;
    async fn get_teams(&self, organization_id: &str) -> RepoResult<Vec<Team>>;
    async fn get_team(&self, organization_id: &str, id: i64) -> RepoResult<Option<Team>>;

    // --- Webhooks ---
    async fn get_webhooks(&self, organization_id: &str) -> RepoResult<Vec<WebhookConfig>>;
    async fn get_webhook(&self, organization_id: &str, id: i64) -> RepoResult<Option<WebhookConfig>>;
    async fn create_webhook(&self, organization_id: &str, url: String) -> RepoResult<WebhookConfig>;
    async fn delete_webhook(&self, organization_id: &str, id: i64) -> RepoResult<bool>;
}

/// RepositoryState
///
/// Shared handle to the persistence layer inside `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by Postgres through a `PgPool`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn replies_for(&self, message_ids: &[i64]) -> RepoResult<Vec<Reply>> {
        sqlx::query_as::<_, Reply>(
            r#"
            SELECT r.id, r.message_id, r.body, r.published, r.created_at,
                   p.first_name, p.last_name, p.avatar
            FROM squeak_replies r
            LEFT JOIN squeak_profiles p ON r.profile_id = p.id
            WHERE r.message_id = ANY($1)
            ORDER BY r.created_at ASC, r.id ASC
            "#,
        )
        .bind(message_ids)
        .fetch_all(&self.pool)
        .await
    }
}

const CONFIG_COLUMNS: &str = r#"
    id, organization_id, company_name, company_domain,
    slack_api_key, slack_question_channel, show_slack_user_profiles,
    mailgun_api_key, mailgun_domain, mailgun_from_email, mailgun_from_name,
    allowed_origins, question_auto_publish, reply_auto_publish,
    permalink_base, permalinks_enabled, created_at
"#;

const MESSAGE_COLUMNS: &str =
    "id, organization_id, subject, slug, published, resolved, slack_timestamp, created_at";

const ROADMAP_COLUMNS: &str = r#"
    r.id, r.organization_id, r.title, r.description, r.category, r.complete,
    r.date_completed, r.projected_completion_date, r.github_urls, r.milestone,
    r.team_id, t.name AS team_name
"#;

/// Splits a double-option patch field into `(supplied, value)` bind parameters.
fn supplied<T>(field: Option<Option<T>>) -> (bool, Option<T>) {
    match field {
        Some(value) => (true, value),
        None => (false, None),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT id, email FROM squeak_users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_user_role(&self, organization_id: &str, user_id: Uuid) -> RepoResult<Option<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT role FROM squeak_roles WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_config(&self, organization_id: &str) -> RepoResult<Option<SqueakConfig>> {
        let query = format!("SELECT {CONFIG_COLUMNS} FROM squeak_config WHERE organization_id = $1");
        sqlx::query_as::<_, SqueakConfig>(&query)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// update_config
    ///
    /// Booleans use COALESCE: `None` keeps the column. Nullable columns take a
    /// `supplied` flag next to their value, so an explicit `null` clears them.
    async fn update_config(
        &self,
        organization_id: &str,
        req: UpdateConfigRequest,
    ) -> RepoResult<Option<SqueakConfig>> {
        let query = format!(
            r#"
            UPDATE squeak_config
            SET company_domain = CASE WHEN $2 THEN $3 ELSE company_domain END,
                company_name = CASE WHEN $4 THEN $5 ELSE company_name END,
                slack_api_key = CASE WHEN $6 THEN $7 ELSE slack_api_key END,
                slack_question_channel = CASE WHEN $8 THEN $9 ELSE slack_question_channel END,
                mailgun_api_key = CASE WHEN $10 THEN $11 ELSE mailgun_api_key END,
                mailgun_domain = CASE WHEN $12 THEN $13 ELSE mailgun_domain END,
                mailgun_from_email = CASE WHEN $14 THEN $15 ELSE mailgun_from_email END,
                mailgun_from_name = CASE WHEN $16 THEN $17 ELSE mailgun_from_name END,
                allowed_origins = CASE WHEN $18 THEN $19 ELSE allowed_origins END,
                question_auto_publish = COALESCE($20, question_auto_publish),
                reply_auto_publish = COALESCE($21, reply_auto_publish),
                show_slack_user_profiles = COALESCE($22, show_slack_user_profiles),
                permalink_base = CASE WHEN $23 THEN $24 ELSE permalink_base END,
                permalinks_enabled = COALESCE($25, permalinks_enabled)
            WHERE organization_id = $1
            RETURNING {CONFIG_COLUMNS}
            "#
        );
        let (company_domain_set, company_domain) = supplied(req.company_domain);
        let (company_name_set, company_name) = supplied(req.company_name);
        let (slack_api_key_set, slack_api_key) = supplied(req.slack_api_key);
        let (slack_channel_set, slack_channel) = supplied(req.slack_question_channel);
        let (mailgun_api_key_set, mailgun_api_key) = supplied(req.mailgun_api_key);
        let (mailgun_domain_set, mailgun_domain) = supplied(req.mailgun_domain);
        let (from_email_set, from_email) = supplied(req.mailgun_from_email);
        let (from_name_set, from_name) = supplied(req.mailgun_from_name);
        let (origins_set, origins) = supplied(req.allowed_origins);
        let (permalink_base_set, permalink_base) = supplied(req.permalink_base);

        sqlx::query_as::<_, SqueakConfig>(&query)
            .bind(organization_id)
            .bind(company_domain_set)
            .bind(company_domain)
            .bind(company_name_set)
            .bind(company_name)
            .bind(slack_api_key_set)
            .bind(slack_api_key)
            .bind(slack_channel_set)
            .bind(slack_channel)
            .bind(mailgun_api_key_set)
            .bind(mailgun_api_key)
            .bind(mailgun_domain_set)
            .bind(mailgun_domain)
            .bind(from_email_set)
            .bind(from_email)
            .bind(from_name_set)
            .bind(from_name)
            .bind(origins_set)
            .bind(origins)
            .bind(req.question_auto_publish)
            .bind(req.reply_auto_publish)
            .bind(req.show_slack_user_profiles)
            .bind(permalink_base_set)
            .bind(permalink_base)
            .bind(req.permalinks_enabled)
            .fetch_optional(&self.pool)
            .await
    }

    /// get_questions
    ///
    /// Two round trips: the page of messages, then all their replies in one
    /// `ANY($1)` query, stitched together here.
    async fn get_questions(
        &self,
        organization_id: &str,
        start: i64,
        limit: i64,
    ) -> RepoResult<(Vec<QuestionThread>, i64)> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM squeak_messages WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM squeak_messages WHERE organization_id = $1 \
             ORDER BY created_at DESC OFFSET $2 LIMIT $3"
        );
        let messages = sqlx::query_as::<_, Message>(&query)
            .bind(organization_id)
            .bind(start)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
        let mut by_message: HashMap<i64, Vec<Reply>> = HashMap::new();
        for reply in self.replies_for(&ids).await? {
            by_message.entry(reply.message_id).or_default().push(reply);
        }

        let threads = messages
            .into_iter()
            .map(|question| QuestionThread {
                replies: by_message.remove(&question.id).unwrap_or_default(),
                question,
            })
            .collect();

        Ok((threads, count))
    }

    async fn get_question(&self, organization_id: &str, id: i64) -> RepoResult<Option<QuestionThread>> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM squeak_messages WHERE id = $1 AND organization_id = $2"
        );
        let Some(question) = sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let replies = self.replies_for(&[question.id]).await?;
        Ok(Some(QuestionThread { question, replies }))
    }

    async fn update_question(
        &self,
        organization_id: &str,
        id: i64,
        req: UpdateQuestionRequest,
    ) -> RepoResult<Option<Message>> {
        let query = format!(
            r#"
            UPDATE squeak_messages
            SET subject = COALESCE($3, subject),
                slug = COALESCE($4, slug),
                published = COALESCE($5, published),
                resolved = COALESCE($6, resolved)
            WHERE id = $1 AND organization_id = $2
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(organization_id)
            .bind(req.subject)
            .bind(req.slug)
            .bind(req.published)
            .bind(req.resolved)
            .fetch_optional(&self.pool)
            .await
    }

    /// delete_question
    ///
    /// Replies go with the message (`ON DELETE CASCADE`).
    async fn delete_question(&self, organization_id: &str, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM squeak_messages WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn reply_is_thread_root(&self, organization_id: &str, id: i64) -> RepoResult<Option<bool>> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT r.id = (
                SELECT first.id FROM squeak_replies first
                WHERE first.message_id = r.message_id
                ORDER BY first.created_at ASC, first.id ASC
                LIMIT 1
            )
            FROM squeak_replies r
            JOIN squeak_messages m ON r.message_id = m.id
            WHERE r.id = $1 AND m.organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_reply(&self, organization_id: &str, id: i64) -> RepoResult<bool> {
        let res = sqlx::query(
            r#"
            DELETE FROM squeak_replies r
            USING squeak_messages m
            WHERE r.message_id = m.id AND r.id = $1 AND m.organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_roadmap(&self, organization_id: &str) -> RepoResult<Vec<Roadmap>> {
        let query = format!(
            "SELECT {ROADMAP_COLUMNS} FROM squeak_roadmaps r \
             LEFT JOIN squeak_teams t ON r.team_id = t.id \
             WHERE r.organization_id = $1 ORDER BY r.category, r.id"
        );
        sqlx::query_as::<_, Roadmap>(&query)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
    }

    /// create_roadmap
    ///
    /// Inserts and joins the team name back in a single statement (CTE).
    async fn create_roadmap(&self, organization_id: &str, req: CreateRoadmapRequest) -> RepoResult<Roadmap> {
        let query = format!(
            r#"
            WITH r AS (
                INSERT INTO squeak_roadmaps (
                    organization_id, title, description, category, complete,
                    date_completed, projected_completion_date, github_urls, milestone, team_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
            )
            SELECT {ROADMAP_COLUMNS} FROM r LEFT JOIN squeak_teams t ON r.team_id = t.id
            "#
        );
        sqlx::query_as::<_, Roadmap>(&query)
            .bind(organization_id)
            .bind(req.title)
            .bind(req.description)
            .bind(req.category)
            .bind(req.complete)
            .bind(req.date_completed)
            .bind(req.projected_completion_date)
            .bind(req.github_urls)
            .bind(req.milestone)
            .bind(req.team_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_roadmap(
        &self,
        organization_id: &str,
        id: i64,
        req: UpdateRoadmapRequest,
    ) -> RepoResult<Option<Roadmap>> {
        let query = format!(
            r#"
            WITH r AS (
                UPDATE squeak_roadmaps
                SET title = COALESCE($3, title),
                    description = CASE WHEN $4 THEN $5 ELSE description END,
                    category = CASE WHEN $6 THEN $7 ELSE category END,
                    complete = COALESCE($8, complete),
                    date_completed = CASE WHEN $9 THEN $10 ELSE date_completed END,
                    projected_completion_date =
                        CASE WHEN $11 THEN $12 ELSE projected_completion_date END,
                    github_urls = CASE WHEN $13 THEN $14 ELSE github_urls END,
                    milestone = COALESCE($15, milestone),
                    team_id = CASE WHEN $16 THEN $17 ELSE team_id END
                WHERE id = $1 AND organization_id = $2
                RETURNING *
            )
            SELECT {ROADMAP_COLUMNS} FROM r LEFT JOIN squeak_teams t ON r.team_id = t.id
            "#
        );
        let (description_set, description) = supplied(req.description);
        let (category_set, category) = supplied(req.category);
        let (completed_set, date_completed) = supplied(req.date_completed);
        let (projected_set, projected) = supplied(req.projected_completion_date);
        let (github_urls_set, github_urls) = supplied(req.github_urls);
        let (team_set, team_id) = supplied(req.team_id);

        sqlx::query_as::<_, Roadmap>(&query)
            .bind(id)
            .bind(organization_id)
            .bind(req.title)
            .bind(description_set)
            .bind(description)
            .bind(category_set)
            .bind(category)
            .bind(req.complete)
            .bind(completed_set)
            .bind(date_completed)
            .bind(projected_set)
            .bind(projected)
            .bind(github_urls_set)
            .bind(github_urls)
            .bind(req.milestone)
            .bind(team_set)
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_roadmap(&self, organization_id: &str, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM squeak_roadmaps WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_teams(&self, organization_id: &str) -> RepoResult<Vec<Team>> {
        sqlx::query_as::<_, Team>(
            "SELECT id, organization_id, name FROM squeak_teams WHERE organization_id = $1 ORDER BY name",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_team(&self, organization_id: &str, id: i64) -> RepoResult<Option<Team>> {
        sqlx::query_as::<_, Team>(
            "SELECT id, organization_id, name FROM squeak_teams WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_webhooks(&self, organization_id: &str) -> RepoResult<Vec<WebhookConfig>> {
        sqlx::query_as::<_, WebhookConfig>(
            r#"SELECT id, organization_id, type, url, created_at FROM squeak_webhook_config
               WHERE organization_id = $1 ORDER BY created_at"#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_webhook(&self, organization_id: &str, id: i64) -> RepoResult<Option<WebhookConfig>> {
        sqlx::query_as::<_, WebhookConfig>(
            r#"SELECT id, organization_id, type, url, created_at FROM squeak_webhook_config
               WHERE id = $1 AND organization_id = $2"#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_webhook(&self, organization_id: &str, url: String) -> RepoResult<WebhookConfig> {
        sqlx::query_as::<_, WebhookConfig>(
            r#"INSERT INTO squeak_webhook_config (organization_id, type, url)
               VALUES ($1, 'webhook', $2)
               RETURNING id, organization_id, type, url, created_at"#,
        )
        .bind(organization_id)
        .bind(url)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_webhook(&self, organization_id: &str, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM squeak_webhook_config WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
