mod categories;
mod forums;
mod messages;
mod moderators;
mod posts;
mod thumbs;
mod threads;

use super::models::{
    CategoryRecord, ForumRecord, MessageRecord, PostRecord, PostThumbRecord, ThreadRecord,
};
use anyhow::Result;
use rusqlite::Connection;

pub trait CategoryRepository {
    fn create(&self, record: &CategoryRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<CategoryRecord>>;
    fn get_by_slug(&self, id: i64, slug: &str) -> Result<Option<CategoryRecord>>;
    fn list(&self) -> Result<Vec<CategoryRecord>>;
}

pub trait ForumRepository {
    fn create(&self, record: &ForumRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<ForumRecord>>;
    fn get_in_category(&self, id: i64, category_id: i64) -> Result<Option<ForumRecord>>;
    fn list_for_category(&self, category_id: i64) -> Result<Vec<ForumRecord>>;
    /// Adjusts the denormalized thread/post counts by the given deltas.
    fn bump_counters(&self, forum_id: i64, threads_delta: i64, posts_delta: i64) -> Result<()>;
}

pub trait ThreadRepository {
    fn create(&self, record: &ThreadRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<ThreadRecord>>;
    fn get_in_forum(
        &self,
        id: i64,
        category_id: i64,
        forum_id: i64,
        slug: Option<&str>,
    ) -> Result<Option<ThreadRecord>>;
    fn list_for_forum(&self, forum_id: i64, limit: i64, offset: i64) -> Result<Vec<ThreadRecord>>;
    fn count_for_forum(&self, forum_id: i64) -> Result<i64>;
    fn count_all(&self) -> Result<i64>;
    fn bump_posts(&self, thread_id: i64, delta: i64) -> Result<()>;
    fn bump_views(&self, thread_id: i64) -> Result<()>;
    fn touch_new_post(&self, thread_id: i64, at: i64) -> Result<()>;
    fn touch_edited_post(&self, thread_id: i64, at: i64) -> Result<()>;
    fn rename(&self, thread_id: i64, name: &str, slug: &str, at: i64) -> Result<()>;
    fn set_pinned(&self, thread_id: i64, pinned: bool) -> Result<()>;
    fn set_locked(&self, thread_id: i64, locked: bool) -> Result<()>;
}

pub trait PostRepository {
    fn create(&self, record: &PostRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<PostRecord>>;
    fn get_in_thread(&self, id: i64, thread_id: i64) -> Result<Option<PostRecord>>;
    /// The thread's opening post: the row with the smallest id.
    fn first_in_thread(&self, thread_id: i64) -> Result<Option<PostRecord>>;
    fn latest_in_thread(&self, thread_id: i64) -> Result<Option<PostRecord>>;
    fn list_for_thread(&self, thread_id: i64, limit: i64, offset: i64) -> Result<Vec<PostRecord>>;
    fn count_for_thread(&self, thread_id: i64) -> Result<i64>;
    /// Posts of the thread with an id lower than the given one; drives the
    /// "which page is this post on" arithmetic.
    fn count_before(&self, thread_id: i64, post_id: i64) -> Result<i64>;
    fn count_all(&self) -> Result<i64>;
    fn count_for_author(&self, author_id: i64) -> Result<i64>;
    fn update_content(&self, post_id: i64, content: &str, edited_at: i64) -> Result<()>;
    fn bump_vote_counters(&self, post_id: i64, likes_delta: i64, dislikes_delta: i64)
        -> Result<()>;
}

pub trait ThumbRepository {
    fn get(&self, post_id: i64, user_id: i64) -> Result<Option<PostThumbRecord>>;
    /// Inserts the vote or replaces the existing one for the same pair;
    /// never leaves two rows per (post, user).
    fn set(&self, record: &PostThumbRecord) -> Result<()>;
}

pub trait MessageRepository {
    /// Inserts every record in one statement. Returns the number of rows.
    fn batch_insert(&self, records: &[MessageRecord]) -> Result<usize>;
    fn list_for_receiver(&self, receiver_id: i64) -> Result<Vec<MessageRecord>>;
    fn count_unread(&self, receiver_id: i64) -> Result<i64>;
}

pub trait ModeratorRepository {
    fn assign(&self, forum_id: i64, user_id: i64) -> Result<()>;
    fn withdraw(&self, forum_id: i64, user_id: i64) -> Result<()>;
    fn list_for_forum(&self, forum_id: i64) -> Result<Vec<i64>>;
    fn is_moderator(&self, forum_id: i64, user_id: i64) -> Result<bool>;
}

/// Borrowed facade handing out rusqlite-backed repositories over one
/// connection (or one open transaction).
pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn categories(&self) -> impl CategoryRepository + '_ {
        categories::SqliteCategoryRepository { conn: self.conn }
    }

    pub fn forums(&self) -> impl ForumRepository + '_ {
        forums::SqliteForumRepository { conn: self.conn }
    }

    pub fn threads(&self) -> impl ThreadRepository + '_ {
        threads::SqliteThreadRepository { conn: self.conn }
    }

    pub fn posts(&self) -> impl PostRepository + '_ {
        posts::SqlitePostRepository { conn: self.conn }
    }

    pub fn thumbs(&self) -> impl ThumbRepository + '_ {
        thumbs::SqliteThumbRepository { conn: self.conn }
    }

    pub fn messages(&self) -> impl MessageRepository + '_ {
        messages::SqliteMessageRepository { conn: self.conn }
    }

    pub fn moderators(&self) -> impl ModeratorRepository + '_ {
        moderators::SqliteModeratorRepository { conn: self.conn }
    }

    pub fn conn(&self) -> &'conn Connection {
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MIGRATIONS;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch(MIGRATIONS).expect("migrations");
        conn
    }

    fn category() -> CategoryRecord {
        CategoryRecord {
            id: 0,
            name: "General".into(),
            slug: "general".into(),
            visible: true,
            sort: 0,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        }
    }

    fn forum(category_id: i64) -> ForumRecord {
        ForumRecord {
            id: 0,
            category_id,
            name: "Announcements".into(),
            sub: None,
            slug: "announcements".into(),
            visible: true,
            sort: 0,
            threads: 0,
            posts: 0,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        }
    }

    fn thread(category_id: i64, forum_id: i64, author_id: i64) -> ThreadRecord {
        ThreadRecord {
            id: 0,
            category_id,
            forum_id,
            author_id,
            name: "First thread".into(),
            slug: "first-thread".into(),
            posts: 0,
            views: 0,
            pinned: false,
            locked: false,
            new_post_at: None,
            edited_post_at: None,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        }
    }

    fn post(thread_id: i64, forum_id: i64, author_id: i64, content: &str) -> PostRecord {
        PostRecord {
            id: 0,
            thread_id,
            forum_id,
            author_id,
            content: content.into(),
            likes: 0,
            dislikes: 0,
            edited: false,
            edited_at: None,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        }
    }

    #[test]
    fn category_forum_thread_post_chain_roundtrips() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let cid = repos.categories().create(&category()).unwrap();
        let fid = repos.forums().create(&forum(cid)).unwrap();
        let tid = repos.threads().create(&thread(cid, fid, 11)).unwrap();
        let pid = repos.posts().create(&post(tid, fid, 11, "opening post")).unwrap();

        let fetched = repos
            .threads()
            .get_in_forum(tid, cid, fid, Some("first-thread"))
            .unwrap()
            .unwrap();
        assert_eq!(fetched.name, "First thread");
        assert!(repos
            .threads()
            .get_in_forum(tid, cid, fid, Some("wrong-slug"))
            .unwrap()
            .is_none());

        let fetched = repos.posts().get_in_thread(pid, tid).unwrap().unwrap();
        assert_eq!(fetched.content, "opening post");
        assert_eq!(repos.categories().get_by_slug(cid, "general").unwrap().unwrap().id, cid);
    }

    #[test]
    fn counters_and_touches_update_in_place() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let cid = repos.categories().create(&category()).unwrap();
        let fid = repos.forums().create(&forum(cid)).unwrap();
        let tid = repos.threads().create(&thread(cid, fid, 11)).unwrap();

        repos.forums().bump_counters(fid, 1, 1).unwrap();
        repos.threads().bump_posts(tid, 1).unwrap();
        repos.threads().bump_views(tid).unwrap();
        repos.threads().touch_new_post(tid, 1_700_000_100).unwrap();
        repos.threads().touch_edited_post(tid, 1_700_000_100).unwrap();

        let forum = repos.forums().get(fid).unwrap().unwrap();
        assert_eq!((forum.threads, forum.posts), (1, 1));
        let thread = repos.threads().get(tid).unwrap().unwrap();
        assert_eq!(thread.posts, 1);
        assert_eq!(thread.views, 1);
        assert_eq!(thread.new_post_at, Some(1_700_000_100));
        assert_eq!(thread.edited_post_at, Some(1_700_000_100));
    }

    #[test]
    fn first_and_latest_posts_follow_id_order() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let cid = repos.categories().create(&category()).unwrap();
        let fid = repos.forums().create(&forum(cid)).unwrap();
        let tid = repos.threads().create(&thread(cid, fid, 11)).unwrap();
        let first = repos.posts().create(&post(tid, fid, 11, "one")).unwrap();
        repos.posts().create(&post(tid, fid, 12, "two")).unwrap();
        let last = repos.posts().create(&post(tid, fid, 13, "three")).unwrap();

        assert_eq!(repos.posts().first_in_thread(tid).unwrap().unwrap().id, first);
        assert_eq!(repos.posts().latest_in_thread(tid).unwrap().unwrap().id, last);
        assert_eq!(repos.posts().count_for_thread(tid).unwrap(), 3);
        assert_eq!(repos.posts().count_before(tid, last).unwrap(), 2);
        assert_eq!(repos.posts().count_for_author(11).unwrap(), 1);
    }

    #[test]
    fn thumb_rows_stay_unique_per_post_and_user() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let cid = repos.categories().create(&category()).unwrap();
        let fid = repos.forums().create(&forum(cid)).unwrap();
        let tid = repos.threads().create(&thread(cid, fid, 11)).unwrap();
        let pid = repos.posts().create(&post(tid, fid, 11, "content")).unwrap();

        let up = PostThumbRecord {
            post_id: pid,
            user_id: 12,
            thumb: 1,
            created_at: 1_700_000_000,
        };
        repos.thumbs().set(&up).unwrap();
        repos
            .thumbs()
            .set(&PostThumbRecord { thumb: -1, ..up })
            .unwrap();

        let stored = repos.thumbs().get(pid, 12).unwrap().unwrap();
        assert_eq!(stored.thumb, -1);
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM post_thumbs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn messages_batch_insert_and_unread_count() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let message = |receiver_id: i64| MessageRecord {
            id: 0,
            sender_id: 5,
            receiver_id,
            topic: "Complaint about the post #1".into(),
            content: "report body".into(),
            sender_status: MessageRecord::STATUS_REMOVED,
            receiver_status: MessageRecord::STATUS_NEW,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        };
        let inserted = repos
            .messages()
            .batch_insert(&[message(8), message(9)])
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(repos.messages().count_unread(8).unwrap(), 1);
        assert_eq!(repos.messages().list_for_receiver(9).unwrap().len(), 1);
        assert_eq!(repos.messages().count_unread(5).unwrap(), 0);
        assert_eq!(repos.messages().batch_insert(&[]).unwrap(), 0);
    }

    #[test]
    fn moderator_assignments_roundtrip() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let cid = repos.categories().create(&category()).unwrap();
        let fid = repos.forums().create(&forum(cid)).unwrap();

        repos.moderators().assign(fid, 8).unwrap();
        repos.moderators().assign(fid, 9).unwrap();
        repos.moderators().assign(fid, 8).unwrap();

        assert_eq!(repos.moderators().list_for_forum(fid).unwrap(), vec![8, 9]);
        assert!(repos.moderators().is_moderator(fid, 8).unwrap());
        repos.moderators().withdraw(fid, 8).unwrap();
        assert!(!repos.moderators().is_moderator(fid, 8).unwrap());
    }
}
