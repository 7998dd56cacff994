//! Read paths: visibility-gated lookups, paginated listings and the cached
//! aggregate counts. Every lookup walks category → forum → thread/post and
//! reports a miss at any step as "not found", so hidden rows are
//! indistinguishable from absent ones.

use crate::cache::{keys, ForumCache};
use crate::config::ForumConfig;
use crate::database::models::{CategoryRecord, ForumRecord, PostRecord, ThreadRecord};
use crate::database::repositories::{
    CategoryRepository, ForumRepository, PostRepository, SqliteRepositories, ThreadRepository,
};
use crate::database::Database;
use crate::error::{ForumError, Result};
use crate::policy::{self, Actor};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// A category, the forum under it, and the thread under that, resolved as
/// one unit the way every thread-scoped operation starts.
pub struct ThreadPath {
    pub category: CategoryRecord,
    pub forum: ForumRecord,
    pub thread: ThreadRecord,
}

pub(crate) fn lookup_category(
    repos: &SqliteRepositories<'_>,
    actor: &Actor,
    category_id: i64,
) -> anyhow::Result<Option<CategoryRecord>> {
    let Some(category) = repos.categories().get(category_id)? else {
        return Ok(None);
    };
    if !policy::can_see_category(actor, &category) {
        return Ok(None);
    }
    Ok(Some(category))
}

pub(crate) fn lookup_forum(
    repos: &SqliteRepositories<'_>,
    actor: &Actor,
    category_id: i64,
    forum_id: i64,
) -> anyhow::Result<Option<(CategoryRecord, ForumRecord)>> {
    let Some(category) = lookup_category(repos, actor, category_id)? else {
        return Ok(None);
    };
    let Some(forum) = repos.forums().get_in_category(forum_id, category_id)? else {
        return Ok(None);
    };
    if !policy::can_see_forum(actor, &forum) {
        return Ok(None);
    }
    Ok(Some((category, forum)))
}

pub(crate) fn lookup_thread(
    repos: &SqliteRepositories<'_>,
    actor: &Actor,
    category_id: i64,
    forum_id: i64,
    thread_id: i64,
    slug: Option<&str>,
) -> anyhow::Result<Option<ThreadPath>> {
    let Some((category, forum)) = lookup_forum(repos, actor, category_id, forum_id)? else {
        return Ok(None);
    };
    let Some(thread) = repos
        .threads()
        .get_in_forum(thread_id, category_id, forum_id, slug)?
    else {
        return Ok(None);
    };
    Ok(Some(ThreadPath {
        category,
        forum,
        thread,
    }))
}

/// One page of a listing, 1-based.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub total_pages: u64,
    pub total_items: i64,
}

/// Where a bare post id lives: the coordinates needed to render it in
/// context, including which listing page it falls on.
#[derive(Debug, Clone, Serialize)]
pub struct PostLocation {
    pub category_id: i64,
    pub forum_id: i64,
    pub thread_id: i64,
    pub thread_slug: String,
    pub post_id: i64,
    pub page: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ForumStats {
    pub threads: i64,
    pub posts: i64,
}

#[derive(Clone)]
pub struct BrowseService {
    database: Database,
    cache: Arc<ForumCache>,
    posts_per_page: usize,
}

impl BrowseService {
    pub fn new(database: Database, cache: Arc<ForumCache>, config: &ForumConfig) -> Self {
        Self {
            database,
            cache,
            posts_per_page: config.posts_per_page.max(1),
        }
    }

    pub fn list_categories(&self, actor: &Actor) -> Result<Vec<CategoryRecord>> {
        let mut categories = self
            .database
            .with_repositories(|repos| repos.categories().list())?;
        categories.retain(|category| policy::can_see_category(actor, category));
        Ok(categories)
    }

    pub fn list_forums(&self, actor: &Actor, category_id: i64) -> Result<Vec<ForumRecord>> {
        let forums = self.database.with_repositories(|repos| {
            let Some(_) = lookup_category(&repos, actor, category_id)? else {
                return Ok(None);
            };
            Ok(Some(repos.forums().list_for_category(category_id)?))
        })?;
        let mut forums = forums.ok_or(ForumError::NotFound("category"))?;
        forums.retain(|forum| policy::can_see_forum(actor, forum));
        Ok(forums)
    }

    pub fn find_category(&self, actor: &Actor, id: i64, slug: &str) -> Result<CategoryRecord> {
        let category = self.database.with_repositories(|repos| {
            Ok(repos
                .categories()
                .get_by_slug(id, slug)?
                .filter(|category| policy::can_see_category(actor, category)))
        })?;
        category.ok_or(ForumError::NotFound("category"))
    }

    pub fn find_forum(
        &self,
        actor: &Actor,
        category_id: i64,
        forum_id: i64,
    ) -> Result<(CategoryRecord, ForumRecord)> {
        let found = self
            .database
            .with_repositories(|repos| lookup_forum(&repos, actor, category_id, forum_id))?;
        found.ok_or(ForumError::NotFound("forum"))
    }

    /// Resolves a thread for display and counts the visit.
    pub fn find_thread(
        &self,
        actor: &Actor,
        category_id: i64,
        forum_id: i64,
        thread_id: i64,
        slug: &str,
    ) -> Result<ThreadPath> {
        let found = self.database.with_repositories(|repos| {
            let Some(path) =
                lookup_thread(&repos, actor, category_id, forum_id, thread_id, Some(slug))?
            else {
                return Ok(None);
            };
            repos.threads().bump_views(path.thread.id)?;
            Ok(Some(path))
        })?;
        found.ok_or(ForumError::NotFound("thread"))
    }

    pub fn list_threads(
        &self,
        actor: &Actor,
        category_id: i64,
        forum_id: i64,
        page: u64,
    ) -> Result<Page<ThreadRecord>> {
        let per_page = self.posts_per_page as i64;
        let page = page.max(1);
        let offset = (page as i64 - 1) * per_page;
        let found = self.database.with_repositories(|repos| {
            let Some(_) = lookup_forum(&repos, actor, category_id, forum_id)? else {
                return Ok(None);
            };
            let total_items = repos.threads().count_for_forum(forum_id)?;
            let items = repos.threads().list_for_forum(forum_id, per_page, offset)?;
            Ok(Some((items, total_items)))
        })?;
        let (items, total_items) = found.ok_or(ForumError::NotFound("forum"))?;
        Ok(self.paginate(items, page, total_items))
    }

    pub fn list_posts(
        &self,
        actor: &Actor,
        category_id: i64,
        forum_id: i64,
        thread_id: i64,
        slug: &str,
        page: u64,
    ) -> Result<Page<PostRecord>> {
        let per_page = self.posts_per_page as i64;
        let page = page.max(1);
        let offset = (page as i64 - 1) * per_page;
        let found = self.database.with_repositories(|repos| {
            let Some(_) =
                lookup_thread(&repos, actor, category_id, forum_id, thread_id, Some(slug))?
            else {
                return Ok(None);
            };
            let total_items = repos.posts().count_for_thread(thread_id)?;
            let items = repos.posts().list_for_thread(thread_id, per_page, offset)?;
            Ok(Some((items, total_items)))
        })?;
        let (items, total_items) = found.ok_or(ForumError::NotFound("thread"))?;
        Ok(self.paginate(items, page, total_items))
    }

    /// Resolves one post within its thread, applying the same visibility
    /// chain as the thread lookup.
    pub fn find_post(
        &self,
        actor: &Actor,
        category_id: i64,
        forum_id: i64,
        thread_id: i64,
        post_id: i64,
    ) -> Result<PostRecord> {
        let found = self.database.with_repositories(|repos| {
            let Some(_) = lookup_thread(&repos, actor, category_id, forum_id, thread_id, None)?
            else {
                return Ok(None);
            };
            repos.posts().get_in_thread(post_id, thread_id)
        })?;
        found.ok_or(ForumError::NotFound("post"))
    }

    /// Resolves a bare post id to its thread coordinates and listing page.
    pub fn locate_post(&self, actor: &Actor, post_id: i64) -> Result<PostLocation> {
        let per_page = self.posts_per_page as i64;
        let found = self.database.with_repositories(|repos| {
            let Some(post) = repos.posts().get(post_id)? else {
                return Ok(None);
            };
            let Some(thread) = repos.threads().get(post.thread_id)? else {
                return Ok(None);
            };
            let Some(_) = lookup_forum(&repos, actor, thread.category_id, thread.forum_id)? else {
                return Ok(None);
            };
            let earlier = repos.posts().count_before(thread.id, post.id)?;
            Ok(Some(PostLocation {
                category_id: thread.category_id,
                forum_id: thread.forum_id,
                thread_id: thread.id,
                thread_slug: thread.slug,
                post_id: post.id,
                page: (earlier / per_page) as u64 + 1,
            }))
        })?;
        found.ok_or(ForumError::NotFound("post"))
    }

    /// Board-wide thread and post totals, cached until the next mutation
    /// invalidates them.
    pub fn stats(&self) -> Result<ForumStats> {
        let cached_threads = self
            .cache
            .get(keys::FORUM_THREADS_COUNT)
            .and_then(|value| value.as_i64());
        let cached_posts = self
            .cache
            .get(keys::FORUM_POSTS_COUNT)
            .and_then(|value| value.as_i64());
        if let (Some(threads), Some(posts)) = (cached_threads, cached_posts) {
            return Ok(ForumStats { threads, posts });
        }
        let (threads, posts) = self.database.with_repositories(|repos| {
            Ok((repos.threads().count_all()?, repos.posts().count_all()?))
        })?;
        self.cache.set(keys::FORUM_THREADS_COUNT, json!(threads), None);
        self.cache.set(keys::FORUM_POSTS_COUNT, json!(posts), None);
        Ok(ForumStats { threads, posts })
    }

    /// How many posts one user has written, cached per user as one element
    /// of the shared `user.postscount` entry.
    pub fn user_post_count(&self, user_id: i64) -> Result<i64> {
        let field = user_id.to_string();
        if let Some(count) = self
            .cache
            .get_element(keys::USER_POSTS_COUNT, &field)
            .and_then(|value| value.as_i64())
        {
            return Ok(count);
        }
        let count = self
            .database
            .with_repositories(|repos| repos.posts().count_for_author(user_id))?;
        self.cache.set_element(keys::USER_POSTS_COUNT, &field, json!(count));
        Ok(count)
    }

    fn paginate<T>(&self, items: Vec<T>, page: u64, total_items: i64) -> Page<T> {
        let per_page = self.posts_per_page as i64;
        let total_pages = ((total_items + per_page - 1) / per_page).max(1) as u64;
        Page {
            items,
            page,
            total_pages,
            total_items,
        }
    }
}
