//! Thread and post lifecycle: creating a thread with its opening post,
//! replying (with same-author merge), editing, pinning and locking.
//!
//! Every multi-row mutation runs inside one transaction; the denormalized
//! counters on forums and threads change in the same commit as the rows
//! they describe. Cache invalidation happens after the commit and is best
//! effort.

use crate::browsing::{lookup_forum, lookup_thread};
use crate::cache::{keys, ForumCache};
use crate::database::models::{PostRecord, ThreadRecord};
use crate::database::repositories::{ForumRepository, PostRepository, ThreadRepository};
use crate::database::Database;
use crate::error::{ForumError, Result};
use crate::format;
use crate::policy::{self, AccessPolicy, Actor};
use crate::utils::{now_unix, slugify};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct ThreadService {
    database: Database,
    cache: Arc<ForumCache>,
    policy: Arc<dyn AccessPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewThread {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReply {
    pub content: String,
    /// Quote this post at the top of the reply, if it still exists.
    #[serde(default)]
    pub quoted_post_id: Option<i64>,
    /// Quote only this part of the quoted post.
    #[serde(default)]
    pub quote_excerpt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditPost {
    pub content: String,
    /// New thread topic; honored only when the edited post opens the thread.
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadView {
    pub thread: ThreadRecord,
    pub opening_post: PostRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyView {
    pub post: PostRecord,
    /// True when the reply was folded into the author's previous post
    /// instead of creating a new row.
    pub merged: bool,
}

impl ThreadService {
    pub fn new(database: Database, cache: Arc<ForumCache>, policy: Arc<dyn AccessPolicy>) -> Self {
        Self {
            database,
            cache,
            policy,
        }
    }

    /// Creates a thread together with its opening post.
    pub fn create_thread(
        &self,
        actor: &Actor,
        category_id: i64,
        forum_id: i64,
        input: NewThread,
    ) -> Result<ThreadView> {
        if !self.policy.can_create_thread(actor) {
            return Err(policy::denied(actor));
        }
        let author_id = actor.require_id()?;
        format::validate_topic("name", &input.name)?;
        let content = format::preview(&input.content)?;
        let name = input.name.trim().to_string();

        let forum = self
            .database
            .with_repositories(|repos| lookup_forum(&repos, actor, category_id, forum_id))?
            .ok_or(ForumError::NotFound("forum"))?
            .1;

        let now = now_unix();
        let view = self.database.with_transaction(|repos| {
            let thread_id = repos.threads().create(&ThreadRecord {
                id: 0,
                category_id,
                forum_id: forum.id,
                author_id,
                slug: slugify(&name),
                name: name.clone(),
                posts: 0,
                views: 0,
                pinned: false,
                locked: false,
                new_post_at: None,
                edited_post_at: None,
                created_at: now,
                updated_at: now,
            })?;
            repos.forums().bump_counters(forum.id, 1, 0)?;

            let post_id = repos.posts().create(&PostRecord {
                id: 0,
                thread_id,
                forum_id: forum.id,
                author_id,
                content: content.clone(),
                likes: 0,
                dislikes: 0,
                edited: false,
                edited_at: None,
                created_at: now,
                updated_at: now,
            })?;
            repos.forums().bump_counters(forum.id, 0, 1)?;
            repos.threads().bump_posts(thread_id, 1)?;
            repos.threads().touch_new_post(thread_id, now)?;
            repos.threads().touch_edited_post(thread_id, now)?;

            let thread = repos
                .threads()
                .get(thread_id)?
                .context("thread creation lost newly inserted record")?;
            let opening_post = repos
                .posts()
                .get(post_id)?
                .context("thread creation lost its opening post")?;
            Ok(ThreadView {
                thread,
                opening_post,
            })
        })?;

        self.cache.delete(keys::FORUM_THREADS_COUNT);
        self.cache.delete(keys::FORUM_POSTS_COUNT);
        self.cache
            .delete_element(keys::USER_POSTS_COUNT, &author_id.to_string());
        tracing::info!(thread_id = view.thread.id, forum_id = forum.id, "thread created");
        Ok(view)
    }

    /// Adds a reply. A follow-up to the actor's own most recent post in the
    /// thread is appended to that post instead of opening a new row.
    pub fn reply_to_thread(
        &self,
        actor: &Actor,
        category_id: i64,
        forum_id: i64,
        thread_id: i64,
        input: NewReply,
    ) -> Result<ReplyView> {
        if !self.policy.can_create_post(actor) {
            return Err(policy::denied(actor));
        }
        let author_id = actor.require_id()?;
        let content = format::preview(&input.content)?;

        let path = self
            .database
            .with_repositories(|repos| {
                lookup_thread(&repos, actor, category_id, forum_id, thread_id, None)
            })?
            .ok_or(ForumError::NotFound("thread"))?;
        if path.thread.locked && !self.policy.can_update_thread(actor, &path.thread)? {
            return Err(ForumError::ThreadLocked);
        }

        let quoted = match input.quoted_post_id {
            Some(quoted_id) => self
                .database
                .with_repositories(|repos| repos.posts().get(quoted_id))?,
            None => None,
        };
        let content = match quoted {
            Some(quoted_post) => format!(
                "{}{}",
                format::prepare_quote(&quoted_post.content, input.quote_excerpt.as_deref()),
                content
            ),
            None => content,
        };

        let now = now_unix();
        let view = self.database.with_transaction(|repos| {
            let latest = repos.posts().latest_in_thread(thread_id)?;
            if let Some(previous) = latest.filter(|post| post.author_id == author_id) {
                let merged = format!("{}{}{}", previous.content, format::MERGE_DIVIDER, content);
                repos.posts().update_content(previous.id, &merged, now)?;
                repos.threads().touch_edited_post(thread_id, now)?;
                let post = repos
                    .posts()
                    .get(previous.id)?
                    .context("merged reply lost its post")?;
                return Ok(ReplyView { post, merged: true });
            }

            let post_id = repos.posts().create(&PostRecord {
                id: 0,
                thread_id,
                forum_id,
                author_id,
                content: content.clone(),
                likes: 0,
                dislikes: 0,
                edited: false,
                edited_at: None,
                created_at: now,
                updated_at: now,
            })?;
            repos.forums().bump_counters(forum_id, 0, 1)?;
            repos.threads().bump_posts(thread_id, 1)?;
            repos.threads().touch_new_post(thread_id, now)?;
            repos.threads().touch_edited_post(thread_id, now)?;
            let post = repos
                .posts()
                .get(post_id)?
                .context("reply lost its newly inserted post")?;
            Ok(ReplyView {
                post,
                merged: false,
            })
        })?;

        self.cache.delete(keys::FORUM_POSTS_COUNT);
        self.cache
            .delete_element(keys::USER_POSTS_COUNT, &author_id.to_string());
        Ok(view)
    }

    /// Edits a post's content; editing the opening post may also rename the
    /// thread. A topic supplied for any other post is ignored.
    pub fn edit_post(
        &self,
        actor: &Actor,
        category_id: i64,
        forum_id: i64,
        thread_id: i64,
        post_id: i64,
        input: EditPost,
    ) -> Result<PostRecord> {
        let path = self
            .database
            .with_repositories(|repos| {
                lookup_thread(&repos, actor, category_id, forum_id, thread_id, None)
            })?
            .ok_or(ForumError::NotFound("post"))?;
        if path.thread.locked && !self.policy.can_update_thread(actor, &path.thread)? {
            return Err(ForumError::ThreadLocked);
        }

        let post = self
            .database
            .with_repositories(|repos| repos.posts().get_in_thread(post_id, thread_id))?
            .ok_or(ForumError::NotFound("post"))?;
        let actor_id = actor.require_id()?;
        if post.author_id != actor_id && !self.policy.can_update_post(actor, &post)? {
            return Err(ForumError::PermissionDenied);
        }

        let content = format::preview(&input.content)?;
        if let Some(topic) = &input.topic {
            format::validate_topic("topic", topic)?;
        }

        let now = now_unix();
        let updated = self.database.with_transaction(|repos| {
            let opening = repos
                .posts()
                .first_in_thread(thread_id)?
                .context("thread without an opening post")?;
            repos.posts().update_content(post.id, &content, now)?;
            if opening.id == post.id {
                if let Some(topic) = &input.topic {
                    let topic = topic.trim();
                    repos
                        .threads()
                        .rename(thread_id, topic, &slugify(topic), now)?;
                }
            }
            repos.threads().touch_edited_post(thread_id, now)?;
            repos
                .posts()
                .get(post.id)?
                .context("edited post vanished mid-update")
        })?;
        Ok(updated)
    }

    /// Pins or unpins the thread; returns the new state.
    pub fn toggle_pin(
        &self,
        actor: &Actor,
        category_id: i64,
        forum_id: i64,
        thread_id: i64,
        slug: &str,
    ) -> Result<bool> {
        let thread = self.updatable_thread(actor, category_id, forum_id, thread_id, slug)?;
        let pinned = !thread.pinned;
        self.database
            .with_repositories(|repos| repos.threads().set_pinned(thread_id, pinned))?;
        Ok(pinned)
    }

    /// Locks or unlocks the thread; returns the new state.
    pub fn toggle_lock(
        &self,
        actor: &Actor,
        category_id: i64,
        forum_id: i64,
        thread_id: i64,
        slug: &str,
    ) -> Result<bool> {
        let thread = self.updatable_thread(actor, category_id, forum_id, thread_id, slug)?;
        let locked = !thread.locked;
        self.database
            .with_repositories(|repos| repos.threads().set_locked(thread_id, locked))?;
        Ok(locked)
    }

    /// Renders a submission without saving it.
    pub fn preview(&self, raw: &str) -> Result<String> {
        format::preview(raw)
    }

    fn updatable_thread(
        &self,
        actor: &Actor,
        category_id: i64,
        forum_id: i64,
        thread_id: i64,
        slug: &str,
    ) -> Result<ThreadRecord> {
        let path = self
            .database
            .with_repositories(|repos| {
                lookup_thread(&repos, actor, category_id, forum_id, thread_id, Some(slug))
            })?
            .ok_or(ForumError::NotFound("thread"))?;
        if !self.policy.can_update_thread(actor, &path.thread)? {
            return Err(policy::denied(actor));
        }
        Ok(path.thread)
    }
}
