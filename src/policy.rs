//! Who may do what.
//!
//! Every operation receives the acting user explicitly; nothing reads a
//! global session. Visibility checks are pure predicates, capability checks
//! go through the `AccessPolicy` trait so embedders can swap in their own
//! role system.

use crate::database::models::{CategoryRecord, ForumRecord, PostRecord, ThreadRecord};
use crate::database::repositories::ModeratorRepository;
use crate::database::Database;
use crate::error::ForumError;
use anyhow::Result;

/// The acting user of one operation. Guests carry no id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Option<i64>,
    pub admin: bool,
}

impl Actor {
    pub fn guest() -> Self {
        Self {
            id: None,
            admin: false,
        }
    }

    pub fn member(id: i64) -> Self {
        Self {
            id: Some(id),
            admin: false,
        }
    }

    pub fn admin(id: i64) -> Self {
        Self {
            id: Some(id),
            admin: true,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.id.is_none()
    }

    pub(crate) fn require_id(&self) -> std::result::Result<i64, ForumError> {
        self.id.ok_or(ForumError::AuthenticationRequired)
    }
}

/// Guests only see rows flagged visible; signed-in users see everything.
pub fn can_see_category(actor: &Actor, category: &CategoryRecord) -> bool {
    category.visible || !actor.is_guest()
}

pub fn can_see_forum(actor: &Actor, forum: &ForumRecord) -> bool {
    forum.visible || !actor.is_guest()
}

/// The error for a failed capability check: guests are asked to sign in,
/// members are refused.
pub(crate) fn denied(actor: &Actor) -> ForumError {
    if actor.is_guest() {
        ForumError::AuthenticationRequired
    } else {
        ForumError::PermissionDenied
    }
}

/// Capability checks, parameterized by actor and target resource.
pub trait AccessPolicy: Send + Sync {
    fn can_create_thread(&self, actor: &Actor) -> bool;
    fn can_create_post(&self, actor: &Actor) -> bool;
    /// Pin, lock and topic rename; also grants the lock bypass for replies
    /// and edits in a locked thread.
    fn can_update_thread(&self, actor: &Actor, thread: &ThreadRecord) -> Result<bool>;
    /// Editing somebody else's post.
    fn can_update_post(&self, actor: &Actor, post: &PostRecord) -> Result<bool>;
}

/// Default policy: any signed-in member may create; the moderators of the
/// target forum, and admins, may update.
pub struct StandardPolicy {
    database: Database,
}

impl StandardPolicy {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn moderates(&self, actor: &Actor, forum_id: i64) -> Result<bool> {
        if actor.admin {
            return Ok(true);
        }
        let Some(user_id) = actor.id else {
            return Ok(false);
        };
        self.database
            .with_repositories(|repos| repos.moderators().is_moderator(forum_id, user_id))
    }
}

impl AccessPolicy for StandardPolicy {
    fn can_create_thread(&self, actor: &Actor) -> bool {
        !actor.is_guest()
    }

    fn can_create_post(&self, actor: &Actor) -> bool {
        !actor.is_guest()
    }

    fn can_update_thread(&self, actor: &Actor, thread: &ThreadRecord) -> Result<bool> {
        self.moderates(actor, thread.forum_id)
    }

    fn can_update_post(&self, actor: &Actor, post: &PostRecord) -> Result<bool> {
        self.moderates(actor, post.forum_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{CategoryRecord, ThreadRecord};
    use crate::database::repositories::{CategoryRepository, ForumRepository, ModeratorRepository};
    use rusqlite::Connection;

    fn setup_db() -> Database {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        db
    }

    fn category(visible: bool) -> CategoryRecord {
        CategoryRecord {
            id: 1,
            name: "General".into(),
            slug: "general".into(),
            visible,
            sort: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn thread(forum_id: i64) -> ThreadRecord {
        ThreadRecord {
            id: 1,
            category_id: 1,
            forum_id,
            author_id: 11,
            name: "Thread".into(),
            slug: "thread".into(),
            posts: 0,
            views: 0,
            pinned: false,
            locked: false,
            new_post_at: None,
            edited_post_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn hidden_rows_are_invisible_to_guests_only() {
        let hidden = category(false);
        assert!(!can_see_category(&Actor::guest(), &hidden));
        assert!(can_see_category(&Actor::member(11), &hidden));
        assert!(can_see_category(&Actor::guest(), &category(true)));
    }

    #[test]
    fn members_create_and_guests_do_not() {
        let policy = StandardPolicy::new(setup_db());
        assert!(policy.can_create_thread(&Actor::member(11)));
        assert!(policy.can_create_post(&Actor::member(11)));
        assert!(!policy.can_create_thread(&Actor::guest()));
        assert!(!policy.can_create_post(&Actor::guest()));
    }

    #[test]
    fn thread_updates_need_a_moderator_or_admin() {
        let db = setup_db();
        let fid = db
            .with_repositories(|repos| {
                let cid = repos.categories().create(&category(true))?;
                let fid = repos.forums().create(&crate::database::models::ForumRecord {
                    id: 0,
                    category_id: cid,
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
                repos.moderators().assign(fid, 8)?;
                Ok(fid)
            })
            .unwrap();

        let policy = StandardPolicy::new(db);
        let thread = thread(fid);
        assert!(policy.can_update_thread(&Actor::member(8), &thread).unwrap());
        assert!(!policy.can_update_thread(&Actor::member(9), &thread).unwrap());
        assert!(policy.can_update_thread(&Actor::admin(1), &thread).unwrap());
        assert!(!policy.can_update_thread(&Actor::guest(), &thread).unwrap());
    }
}
