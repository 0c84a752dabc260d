#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::{DateTime, Duration, Utc};
use squeak_admin::{
    AppConfig, AppState, create_router,
    models::{
        CreateRoadmapRequest, Message, QuestionThread, Reply, ReplyAuthor, Roadmap, SqueakConfig,
        Team, UpdateConfigRequest, UpdateQuestionRequest, UpdateRoadmapRequest, User, WebhookConfig,
    },
    notifier::MockWebhookNotifier,
    repository::{RepoResult, Repository},
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use tower::ServiceExt;
use uuid::Uuid;

pub const ORG: &str = "org_1";
pub const OTHER_ORG: &str = "org_2";
pub const ADMIN_ID: Uuid = Uuid::from_u128(1);
pub const MEMBER_ID: Uuid = Uuid::from_u128(2);
pub const OUTSIDER_ID: Uuid = Uuid::from_u128(3);

// --- In-memory Repository ---

#[derive(Default)]
pub struct Store {
    pub users: Vec<User>,
    pub roles: HashMap<(String, Uuid), String>,
    pub configs: Vec<SqueakConfig>,
    pub threads: Vec<QuestionThread>,
    pub roadmap: Vec<Roadmap>,
    pub teams: Vec<Team>,
    pub webhooks: Vec<WebhookConfig>,
    pub next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }
}

/// MemoryRepo
///
/// `Repository` double holding rows in a `Mutex`. Follows the Postgres
/// implementation's semantics: organization scoping, partial updates that keep
/// absent fields and clear explicit nulls, newest-first question pages.
/// `set_outage(true)` makes identity and config lookups fail like a lost pool.
#[derive(Default)]
pub struct MemoryRepo {
    pub store: Mutex<Store>,
    outage: AtomicBool,
}

impl MemoryRepo {
    pub fn with<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        let mut store = self.store.lock().unwrap();
        f(&mut *store)
    }

    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }

    fn available(&self) -> RepoResult<()> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }

    pub fn config(&self, organization_id: &str) -> Option<SqueakConfig> {
        self.with(|s| s.configs.iter().find(|c| c.organization_id == organization_id).cloned())
    }
}

fn patch<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn patch_opt<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

#[async_trait]
impl Repository for MemoryRepo {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        self.available()?;
        Ok(self.with(|s| s.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn get_user_role(&self, organization_id: &str, user_id: Uuid) -> RepoResult<Option<String>> {
        self.available()?;
        Ok(self.with(|s| s.roles.get(&(organization_id.to_string(), user_id)).cloned()))
    }

    async fn get_config(&self, organization_id: &str) -> RepoResult<Option<SqueakConfig>> {
        self.available()?;
        Ok(self.config(organization_id))
    }

    async fn update_config(
        &self,
        organization_id: &str,
        req: UpdateConfigRequest,
    ) -> RepoResult<Option<SqueakConfig>> {
        Ok(self.with(|s| {
            let config = s.configs.iter_mut().find(|c| c.organization_id == organization_id)?;
            patch(&mut config.company_domain, req.company_domain);
            patch(&mut config.company_name, req.company_name);
            patch(&mut config.slack_api_key, req.slack_api_key);
            patch(&mut config.slack_question_channel, req.slack_question_channel);
            patch(&mut config.mailgun_api_key, req.mailgun_api_key);
            patch(&mut config.mailgun_domain, req.mailgun_domain);
            patch(&mut config.mailgun_from_email, req.mailgun_from_email);
            patch(&mut config.mailgun_from_name, req.mailgun_from_name);
            patch(&mut config.allowed_origins, req.allowed_origins);
            patch(&mut config.question_auto_publish, req.question_auto_publish);
            patch(&mut config.reply_auto_publish, req.reply_auto_publish);
            patch(&mut config.show_slack_user_profiles, req.show_slack_user_profiles);
            patch(&mut config.permalink_base, req.permalink_base);
            patch(&mut config.permalinks_enabled, req.permalinks_enabled);
            Some(config.clone())
        }))
    }

    async fn get_questions(
        &self,
        organization_id: &str,
        start: i64,
        limit: i64,
    ) -> RepoResult<(Vec<QuestionThread>, i64)> {
        Ok(self.with(|s| {
            let mut threads: Vec<QuestionThread> = s
                .threads
                .iter()
                .filter(|t| t.question.organization_id == organization_id)
                .cloned()
                .collect();
            threads.sort_by(|a, b| b.question.created_at.cmp(&a.question.created_at));
            let count = threads.len() as i64;
            let page = threads
                .into_iter()
                .skip(start as usize)
                .take(limit as usize)
                .collect();
            (page, count)
        }))
    }

    async fn get_question(&self, organization_id: &str, id: i64) -> RepoResult<Option<QuestionThread>> {
        Ok(self.with(|s| {
            s.threads
                .iter()
                .find(|t| t.question.id == id && t.question.organization_id == organization_id)
                .cloned()
        }))
    }

    async fn update_question(
        &self,
        organization_id: &str,
        id: i64,
        req: UpdateQuestionRequest,
    ) -> RepoResult<Option<Message>> {
        Ok(self.with(|s| {
            let thread = s
                .threads
                .iter_mut()
                .find(|t| t.question.id == id && t.question.organization_id == organization_id)?;
            patch_opt(&mut thread.question.subject, req.subject);
            patch_opt(&mut thread.question.slug, req.slug);
            patch(&mut thread.question.published, req.published);
            patch(&mut thread.question.resolved, req.resolved);
            Some(thread.question.clone())
        }))
    }

    async fn delete_question(&self, organization_id: &str, id: i64) -> RepoResult<bool> {
        Ok(self.with(|s| {
            let before = s.threads.len();
            s.threads
                .retain(|t| !(t.question.id == id && t.question.organization_id == organization_id));
            s.threads.len() < before
        }))
    }

    async fn reply_is_thread_root(&self, organization_id: &str, id: i64) -> RepoResult<Option<bool>> {
        Ok(self.with(|s| {
            s.threads
                .iter()
                .filter(|t| t.question.organization_id == organization_id)
                .find_map(|t| t.replies.iter().position(|r| r.id == id))
                .map(|position| position == 0)
        }))
    }

    async fn delete_reply(&self, organization_id: &str, id: i64) -> RepoResult<bool> {
        Ok(self.with(|s| {
            for thread in s
                .threads
                .iter_mut()
                .filter(|t| t.question.organization_id == organization_id)
            {
                let before = thread.replies.len();
                thread.replies.retain(|r| r.id != id);
                if thread.replies.len() < before {
                    return true;
                }
            }
            false
        }))
    }

    async fn get_roadmap(&self, organization_id: &str) -> RepoResult<Vec<Roadmap>> {
        Ok(self.with(|s| {
            s.roadmap
                .iter()
                .filter(|r| r.organization_id == organization_id)
                .cloned()
                .collect()
        }))
    }

    async fn create_roadmap(&self, organization_id: &str, req: CreateRoadmapRequest) -> RepoResult<Roadmap> {
        Ok(self.with(|s| {
            let team_name = req
                .team_id
                .and_then(|id| s.teams.iter().find(|t| t.id == id).map(|t| t.name.clone()));
            let goal = Roadmap {
                id: s.next_id(),
                organization_id: organization_id.to_string(),
                title: req.title,
                description: req.description,
                category: req.category,
                complete: req.complete,
                date_completed: req.date_completed,
                projected_completion_date: req.projected_completion_date,
                github_urls: req.github_urls,
                milestone: req.milestone,
                team_id: req.team_id,
                team_name,
            };
            s.roadmap.push(goal.clone());
            goal
        }))
    }

    async fn update_roadmap(
        &self,
        organization_id: &str,
        id: i64,
        req: UpdateRoadmapRequest,
    ) -> RepoResult<Option<Roadmap>> {
        Ok(self.with(|s| {
            // Outer `None`: team untouched. `Some(None)`: unassigned.
            let team = req.team_id.map(|team_id| {
                let name = team_id.and_then(|team_id| {
                    s.teams.iter().find(|t| t.id == team_id).map(|t| t.name.clone())
                });
                (team_id, name)
            });
            let goal = s
                .roadmap
                .iter_mut()
                .find(|r| r.id == id && r.organization_id == organization_id)?;
            patch(&mut goal.title, req.title);
            patch(&mut goal.description, req.description);
            patch(&mut goal.category, req.category);
            patch(&mut goal.complete, req.complete);
            patch(&mut goal.date_completed, req.date_completed);
            patch(&mut goal.projected_completion_date, req.projected_completion_date);
            patch(&mut goal.github_urls, req.github_urls);
            patch(&mut goal.milestone, req.milestone);
            if let Some((team_id, team_name)) = team {
                goal.team_id = team_id;
                goal.team_name = team_name;
            }
            Some(goal.clone())
        }))
    }

    async fn delete_roadmap(&self, organization_id: &str, id: i64) -> RepoResult<bool> {
        Ok(self.with(|s| {
            let before = s.roadmap.len();
            s.roadmap.retain(|r| !(r.id == id && r.organization_id == organization_id));
            s.roadmap.len() < before
        }))
    }

    async fn get_teams(&self, organization_id: &str) -> RepoResult<Vec<Team>> {
        Ok(self.with(|s| {
            s.teams
                .iter()
                .filter(|t| t.organization_id == organization_id)
                .cloned()
                .collect()
        }))
    }

    async fn get_team(&self, organization_id: &str, id: i64) -> RepoResult<Option<Team>> {
        Ok(self.with(|s| {
            s.teams
                .iter()
                .find(|t| t.id == id && t.organization_id == organization_id)
                .cloned()
        }))
    }

    async fn get_webhooks(&self, organization_id: &str) -> RepoResult<Vec<WebhookConfig>> {
        Ok(self.with(|s| {
            s.webhooks
                .iter()
                .filter(|w| w.organization_id == organization_id)
                .cloned()
                .collect()
        }))
    }

    async fn get_webhook(&self, organization_id: &str, id: i64) -> RepoResult<Option<WebhookConfig>> {
        Ok(self.with(|s| {
            s.webhooks
                .iter()
                .find(|w| w.id == id && w.organization_id == organization_id)
                .cloned()
        }))
    }

    async fn create_webhook(&self, organization_id: &str, url: String) -> RepoResult<WebhookConfig> {
        Ok(self.with(|s| {
            let webhook = WebhookConfig {
                id: s.next_id(),
                organization_id: organization_id.to_string(),
                webhook_type: "webhook".to_string(),
                url,
                created_at: Utc::now(),
            };
            s.webhooks.push(webhook.clone());
            webhook
        }))
    }

    async fn delete_webhook(&self, organization_id: &str, id: i64) -> RepoResult<bool> {
        Ok(self.with(|s| {
            let before = s.webhooks.len();
            s.webhooks.retain(|w| !(w.id == id && w.organization_id == organization_id));
            s.webhooks.len() < before
        }))
    }
}

// --- Fixtures ---

/// The `org_1` config used across tests.
pub fn org_config() -> SqueakConfig {
    SqueakConfig {
        id: 1,
        organization_id: ORG.to_string(),
        company_name: Some("Acme".to_string()),
        company_domain: Some("https://x.com/home".to_string()),
        slack_api_key: Some("secret".to_string()),
        slack_question_channel: Some("C123".to_string()),
        mailgun_api_key: Some("mg-key".to_string()),
        mailgun_domain: Some("mg.x.com".to_string()),
        allowed_origins: Some(vec!["https://x.com".to_string()]),
        question_auto_publish: true,
        reply_auto_publish: true,
        permalink_base: Some("/qa".to_string()),
        permalinks_enabled: true,
        ..SqueakConfig::default()
    }
}

pub fn reply(id: i64, message_id: i64, first_name: Option<&str>, created_at: DateTime<Utc>) -> Reply {
    Reply {
        id,
        message_id,
        body: Some(format!("reply {id}")),
        published: true,
        created_at,
        profile: ReplyAuthor {
            first_name: first_name.map(str::to_string),
            last_name: None,
            avatar: None,
        },
    }
}

/// A thread asked `age` ago with `reply_count` answers after the question body.
pub fn thread(id: i64, organization_id: &str, age: Duration, reply_count: i64) -> QuestionThread {
    let created_at = Utc::now() - age;
    let replies = (0..=reply_count)
        .map(|n| reply(id * 100 + n, id, Some("Ada"), created_at + Duration::minutes(n)))
        .collect();
    QuestionThread {
        question: Message {
            id,
            organization_id: organization_id.to_string(),
            subject: Some(format!("Question {id}")),
            slug: Some(vec!["/docs ".to_string()]),
            created_at,
            ..Message::default()
        },
        replies,
    }
}

/// Users: admin and member of `org_1`, plus an outsider with no role anywhere.
/// `org_2` gets its own config so cross-tenant checks have something to miss.
pub fn seeded_repo() -> MemoryRepo {
    let repo = MemoryRepo::default();
    repo.with(|s| {
        for (id, email) in [
            (ADMIN_ID, "admin@x.com"),
            (MEMBER_ID, "member@x.com"),
            (OUTSIDER_ID, "outsider@y.com"),
        ] {
            s.users.push(User { id, email: email.to_string() });
        }
        s.roles.insert((ORG.to_string(), ADMIN_ID), "admin".to_string());
        s.roles.insert((ORG.to_string(), MEMBER_ID), "member".to_string());
        s.configs.push(org_config());
        s.configs.push(SqueakConfig {
            id: 2,
            organization_id: OTHER_ORG.to_string(),
            slack_api_key: Some("other-secret".to_string()),
            ..SqueakConfig::default()
        });
    });
    repo
}

// --- App Harness ---

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepo>,
    pub notifier: MockWebhookNotifier,
}

pub fn spawn_app_with(repo: MemoryRepo, notifier: MockWebhookNotifier) -> TestApp {
    let repo = Arc::new(repo);
    let state = AppState {
        repo: repo.clone(),
        notifier: Arc::new(notifier.clone()),
        // Env::Local: the `x-user-id` header authenticates.
        config: AppConfig::default(),
    };
    TestApp { router: create_router(state), repo, notifier }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(seeded_repo(), MockWebhookNotifier::new())
}

/// Request builder with optional caller and organization headers.
pub fn request(
    method: Method,
    uri: &str,
    user: Option<Uuid>,
    organization: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    if let Some(organization) = organization {
        builder = builder.header("x-organization-id", organization);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

impl TestApp {
    /// Sends one request; returns status and the JSON body (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}
