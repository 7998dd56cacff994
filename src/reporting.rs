//! Reporting a post to the moderation team.
//!
//! A report fans out into one message per moderator of the post's forum,
//! excluding the reporter, inserted in a single batch. A report with nobody
//! left to notify is acknowledged but sends nothing.

use crate::browsing::lookup_thread;
use crate::cache::{keys, ForumCache};
use crate::database::models::MessageRecord;
use crate::database::repositories::{MessageRepository, ModeratorRepository, PostRepository};
use crate::database::Database;
use crate::error::{ForumError, Result};
use crate::format;
use crate::policy::Actor;
use crate::utils::now_unix;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportOutcome {
    Sent { recipients: usize },
    /// The reporter is the only moderator around; there is nobody to tell.
    NoRecipients,
}

#[derive(Clone)]
pub struct ReportService {
    database: Database,
    cache: Arc<ForumCache>,
}

impl ReportService {
    pub fn new(database: Database, cache: Arc<ForumCache>) -> Self {
        Self { database, cache }
    }

    pub fn report_post(
        &self,
        actor: &Actor,
        category_id: i64,
        forum_id: i64,
        thread_id: i64,
        slug: &str,
        post_id: i64,
        message: &str,
    ) -> Result<ReportOutcome> {
        let reporter = actor.require_id()?;

        let path = self
            .database
            .with_repositories(|repos| {
                lookup_thread(&repos, actor, category_id, forum_id, thread_id, Some(slug))
            })?
            .ok_or(ForumError::NotFound("post"))?;
        let post = self
            .database
            .with_repositories(|repos| repos.posts().get_in_thread(post_id, thread_id))?
            .ok_or(ForumError::NotFound("post"))?;

        if post.author_id == reporter {
            return Err(ForumError::SelfReportForbidden);
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(ForumError::validation("message", "cannot be blank"));
        }

        let moderators: Vec<i64> = self
            .database
            .with_repositories(|repos| repos.moderators().list_for_forum(path.forum.id))?
            .into_iter()
            .filter(|&moderator| moderator != reporter)
            .collect();
        if moderators.is_empty() {
            tracing::warn!(
                post_id = post.id,
                forum_id = path.forum.id,
                reporter,
                "report has no eligible recipients"
            );
            return Ok(ReportOutcome::NoRecipients);
        }

        let now = now_unix();
        let topic = format::report_topic(post.id);
        let content = format::compose_report(message, post.id, &post.content);
        let package: Vec<MessageRecord> = moderators
            .iter()
            .map(|&moderator| MessageRecord {
                id: 0,
                sender_id: reporter,
                receiver_id: moderator,
                topic: topic.clone(),
                content: content.clone(),
                sender_status: MessageRecord::STATUS_REMOVED,
                receiver_status: MessageRecord::STATUS_NEW,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let recipients = self
            .database
            .with_repositories(|repos| repos.messages().batch_insert(&package))?;
        self.cache.delete(keys::USER_NEW_MESSAGES);
        tracing::info!(post_id = post.id, recipients, "post reported to moderators");
        Ok(ReportOutcome::Sent { recipients })
    }

    /// Unread-message indicator for one user, cached per user as an element
    /// of `user.newmessages` until the next report invalidates it.
    pub fn unread_count(&self, user_id: i64) -> Result<i64> {
        let field = user_id.to_string();
        if let Some(count) = self
            .cache
            .get_element(keys::USER_NEW_MESSAGES, &field)
            .and_then(|value| value.as_i64())
        {
            return Ok(count);
        }
        let count = self
            .database
            .with_repositories(|repos| repos.messages().count_unread(user_id))?;
        self.cache
            .set_element(keys::USER_NEW_MESSAGES, &field, serde_json::json!(count));
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{CategoryRecord, ForumRecord, PostRecord, ThreadRecord};
    use crate::database::repositories::{
        CategoryRepository, ForumRepository, ThreadRepository,
    };
    use rusqlite::Connection;
    use serde_json::json;

    struct Env {
        db: Database,
        cache: Arc<ForumCache>,
        service: ReportService,
        category_id: i64,
        forum_id: i64,
        thread_id: i64,
        post_id: i64,
    }

    const AUTHOR: i64 = 11;
    const REPORTER: i64 = 12;

    fn setup() -> Env {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        let cache = Arc::new(ForumCache::new());
        let service = ReportService::new(db.clone(), cache.clone());

        let (category_id, forum_id, thread_id, post_id) = db
            .with_repositories(|repos| {
                let category_id = repos.categories().create(&CategoryRecord {
                    id: 0,
                    name: "General".into(),
                    slug: "general".into(),
                    visible: true,
                    sort: 0,
                    created_at: 0,
                    updated_at: 0,
                })?;
                let forum_id = repos.forums().create(&ForumRecord {
                    id: 0,
                    category_id,
                    name: "Board".into(),
                    sub: None,
                    slug: "board".into(),
                    visible: true,
                    sort: 0,
                    threads: 0,
                    posts: 0,
                    created_at: 0,
                    updated_at: 0,
                })?;
                let thread_id = repos.threads().create(&ThreadRecord {
                    id: 0,
                    category_id,
                    forum_id,
                    author_id: AUTHOR,
                    name: "Topic".into(),
                    slug: "topic".into(),
                    posts: 0,
                    views: 0,
                    pinned: false,
                    locked: false,
                    new_post_at: None,
                    edited_post_at: None,
                    created_at: 0,
                    updated_at: 0,
                })?;
                let post_id = repos.posts().create(&PostRecord {
                    id: 0,
                    thread_id,
                    forum_id,
                    author_id: AUTHOR,
                    content: "a post somebody finds objectionable".into(),
                    likes: 0,
                    dislikes: 0,
                    edited: false,
                    edited_at: None,
                    created_at: 0,
                    updated_at: 0,
                })?;
                Ok((category_id, forum_id, thread_id, post_id))
            })
            .unwrap();

        Env {
            db,
            cache,
            service,
            category_id,
            forum_id,
            thread_id,
            post_id,
        }
    }

    fn report(env: &Env, actor: &Actor, message: &str) -> Result<ReportOutcome> {
        env.service.report_post(
            actor,
            env.category_id,
            env.forum_id,
            env.thread_id,
            "topic",
            env.post_id,
            message,
        )
    }

    fn assign_moderator(env: &Env, user_id: i64) {
        env.db
            .with_repositories(|repos| repos.moderators().assign(env.forum_id, user_id))
            .unwrap();
    }

    #[test]
    fn a_report_reaches_every_moderator_but_the_reporter() {
        let env = setup();
        assign_moderator(&env, 8);
        assign_moderator(&env, 9);
        assign_moderator(&env, REPORTER);
        env.cache
            .set_element(keys::USER_NEW_MESSAGES, "8", json!(0));

        let outcome = report(&env, &Actor::member(REPORTER), "this is spam").unwrap();
        assert_eq!(outcome, ReportOutcome::Sent { recipients: 2 });

        let (to_eight, to_nine, to_reporter) = env
            .db
            .with_repositories(|repos| {
                Ok((
                    repos.messages().list_for_receiver(8)?,
                    repos.messages().list_for_receiver(9)?,
                    repos.messages().list_for_receiver(REPORTER)?,
                ))
            })
            .unwrap();
        assert_eq!(to_eight.len(), 1);
        assert_eq!(to_nine.len(), 1);
        assert!(to_reporter.is_empty());

        let message = &to_eight[0];
        assert_eq!(message.topic, format!("Complaint about the post #{}", env.post_id));
        assert!(message.content.starts_with("this is spam<hr>"));
        assert!(message
            .content
            .contains("a post somebody finds objectionable"));
        assert_eq!(message.sender_status, MessageRecord::STATUS_REMOVED);
        assert_eq!(message.receiver_status, MessageRecord::STATUS_NEW);

        // the unread indicator cache was invalidated wholesale
        assert!(env.cache.get(keys::USER_NEW_MESSAGES).is_none());
    }

    #[test]
    fn the_unread_indicator_rebuilds_after_a_report() {
        let env = setup();
        assign_moderator(&env, 8);

        assert_eq!(env.service.unread_count(8).unwrap(), 0);
        report(&env, &Actor::member(REPORTER), "this is spam").unwrap();

        // the stale zero was invalidated; the next read recounts
        assert_eq!(env.service.unread_count(8).unwrap(), 1);
        assert_eq!(
            env.cache
                .get_element(keys::USER_NEW_MESSAGES, "8")
                .and_then(|value| value.as_i64()),
            Some(1)
        );
    }

    #[test]
    fn a_lone_moderator_reporting_gets_no_recipients() {
        let env = setup();
        assign_moderator(&env, REPORTER);

        let outcome = report(&env, &Actor::member(REPORTER), "reporting into the void").unwrap();
        assert_eq!(outcome, ReportOutcome::NoRecipients);

        let total: i64 = env
            .db
            .with_repositories(|repos| {
                Ok(repos
                    .conn()
                    .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn self_reports_are_refused() {
        let env = setup();
        assign_moderator(&env, 8);
        let outcome = report(&env, &Actor::member(AUTHOR), "I regret posting this");
        assert!(matches!(outcome, Err(ForumError::SelfReportForbidden)));
    }

    #[test]
    fn guests_cannot_report() {
        let env = setup();
        let outcome = report(&env, &Actor::guest(), "drive-by report");
        assert!(matches!(outcome, Err(ForumError::AuthenticationRequired)));
    }

    #[test]
    fn empty_reports_are_rejected() {
        let env = setup();
        assign_moderator(&env, 8);
        let outcome = report(&env, &Actor::member(REPORTER), "   ");
        assert!(matches!(outcome, Err(ForumError::Validation { .. })));
    }

    #[test]
    fn reports_need_the_right_thread_slug() {
        let env = setup();
        assign_moderator(&env, 8);
        let outcome = env.service.report_post(
            &Actor::member(REPORTER),
            env.category_id,
            env.forum_id,
            env.thread_id,
            "wrong-slug",
            env.post_id,
            "this is spam",
        );
        assert!(matches!(outcome, Err(ForumError::NotFound(_))));
    }
}
