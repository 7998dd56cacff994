//! Per-post thumbs: one vote per user per post with flip-on-revote, and an
//! advisory per-user budget of votes in the trailing hour kept in the cache.
//!
//! The vote row and the post's like/dislike counters move in the same
//! transaction so they cannot drift apart under a partial failure.

use crate::cache::{keys, ForumCache};
use crate::config::ForumConfig;
use crate::database::models::PostThumbRecord;
use crate::database::repositories::{PostRepository, ThreadRepository, ThumbRepository};
use crate::database::Database;
use crate::error::{ForumError, Result};
use crate::policy::Actor;
use crate::utils::now_unix;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    fn thumb(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

/// Updated totals returned for display after a vote.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoteTally {
    pub post_id: i64,
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Clone)]
pub struct VoteService {
    database: Database,
    cache: Arc<ForumCache>,
    vote_limit: u32,
    vote_window_secs: i64,
}

impl VoteService {
    pub fn new(database: Database, cache: Arc<ForumCache>, config: &ForumConfig) -> Self {
        Self {
            database,
            cache,
            vote_limit: config.vote_limit,
            vote_window_secs: config.vote_window_secs,
        }
    }

    pub fn cast_vote(
        &self,
        actor: &Actor,
        post_id: i64,
        direction: VoteDirection,
    ) -> Result<VoteTally> {
        let voter = actor.require_id()?;

        let (post, thread) = self
            .database
            .with_repositories(|repos| {
                let Some(post) = repos.posts().get(post_id)? else {
                    return Ok(None);
                };
                let thread = repos
                    .threads()
                    .get(post.thread_id)?
                    .context("post without its thread")?;
                Ok(Some((post, thread)))
            })?
            .ok_or(ForumError::NotFound("post"))?;

        if thread.locked {
            return Err(ForumError::ThreadLocked);
        }
        if post.author_id == voter {
            return Err(ForumError::SelfVoteForbidden);
        }

        let now = now_unix();
        let spent = self.votes_spent(voter, now)?;

        let thumb = direction.thumb();
        let (tally, changed) = self.database.with_transaction(|repos| {
            let existing = repos.thumbs().get(post_id, voter)?;
            let changed = match existing {
                None => {
                    repos.thumbs().set(&PostThumbRecord {
                        post_id,
                        user_id: voter,
                        thumb,
                        created_at: now,
                    })?;
                    let (likes, dislikes) = if thumb > 0 { (1, 0) } else { (0, 1) };
                    repos.posts().bump_vote_counters(post_id, likes, dislikes)?;
                    true
                },
                Some(previous) if previous.thumb == thumb => false,
                Some(_) => {
                    repos.thumbs().set(&PostThumbRecord {
                        post_id,
                        user_id: voter,
                        thumb,
                        created_at: now,
                    })?;
                    // one update moves both counters: -1 off the old side,
                    // +1 onto the new one
                    let (likes, dislikes) = if thumb > 0 { (1, -1) } else { (-1, 1) };
                    repos.posts().bump_vote_counters(post_id, likes, dislikes)?;
                    true
                },
            };
            let post = repos
                .posts()
                .get(post_id)?
                .context("voted post vanished mid-update")?;
            Ok((
                VoteTally {
                    post_id,
                    likes: post.likes,
                    dislikes: post.dislikes,
                },
                changed,
            ))
        })?;

        if changed {
            self.spend_vote(voter, spent, now);
        }
        Ok(tally)
    }

    /// Votes already spent inside the current window, or `RateLimited` when
    /// the budget is gone. A lapsed window reads as zero.
    fn votes_spent(&self, voter: i64, now: i64) -> Result<u32> {
        let key = keys::user_votes(voter);
        let Some(entry) = self.cache.get(&key) else {
            return Ok(0);
        };
        let expire = entry.get("expire").and_then(|value| value.as_i64());
        if expire.is_some_and(|deadline| deadline < now) {
            return Ok(0);
        }
        let count = entry
            .get("count")
            .and_then(|value| value.as_u64())
            .unwrap_or(0) as u32;
        if count >= self.vote_limit {
            return Err(ForumError::RateLimited);
        }
        Ok(count)
    }

    /// Charges one vote against the window, opening a fresh window when
    /// none is running.
    fn spend_vote(&self, voter: i64, spent: u32, now: i64) {
        let key = keys::user_votes(voter);
        if spent == 0 {
            self.cache.set(
                &key,
                json!({ "count": 1, "expire": now + self.vote_window_secs }),
                Some(self.vote_window_secs),
            );
        } else {
            self.cache.set_element(&key, "count", json!(spent + 1));
        }
    }
}
