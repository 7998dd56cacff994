use serde::{Deserialize, Serialize};

/// Top-level grouping of forums. `visible = false` hides the category and
/// everything under it from guests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub visible: bool,
    pub sort: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumRecord {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    /// Optional subtitle shown under the forum name.
    pub sub: Option<String>,
    pub slug: String,
    pub visible: bool,
    pub sort: i64,
    /// Denormalized row counts, maintained transactionally by the services.
    pub threads: i64,
    pub posts: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub id: i64,
    pub category_id: i64,
    pub forum_id: i64,
    pub author_id: i64,
    pub name: String,
    pub slug: String,
    pub posts: i64,
    pub views: i64,
    pub pinned: bool,
    pub locked: bool,
    pub new_post_at: Option<i64>,
    pub edited_post_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub thread_id: i64,
    pub forum_id: i64,
    pub author_id: i64,
    pub content: String,
    pub likes: i64,
    pub dislikes: i64,
    pub edited: bool,
    pub edited_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One user's vote on one post. The pair is unique; `thumb` is +1 or -1 and
/// selects which of the post's counters was last incremented for this user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostThumbRecord {
    pub post_id: i64,
    pub user_id: i64,
    pub thumb: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub topic: String,
    pub content: String,
    pub sender_status: i64,
    pub receiver_status: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MessageRecord {
    pub const STATUS_NEW: i64 = 1;
    pub const STATUS_READ: i64 = 10;
    /// Not shown in the owner's folder; reports are delivered this way so
    /// they never clutter the reporter's sent box.
    pub const STATUS_REMOVED: i64 = 20;
}
