use warbler_types::models::{
    Message, MessageCard, NewUser, ProfileChanges, User, UserStats,
};

use crate::Result;

/// Persistence access for the whole application. Handlers only ever see
/// this trait; `Database` is the SQLite implementation.
///
/// Every method is one atomic unit: multi-statement writes run inside a
/// single transaction.
pub trait Repository: Send + Sync {
    // -- Users --

    /// Fails with `StoreError::UniqueViolation` when the username or email
    /// is already taken.
    fn create_user(&self, user: &NewUser) -> Result<User>;
    fn find_user(&self, id: i64) -> Result<Option<User>>;
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    /// All users ordered by username, optionally filtered by a
    /// case-insensitive username substring.
    fn list_users(&self, search: Option<&str>) -> Result<Vec<User>>;
    fn update_user(&self, id: i64, changes: &ProfileChanges) -> Result<User>;
    /// Removes the user and everything hanging off them: their messages,
    /// likes on those messages, likes they made, and follows in both
    /// directions. Returns false if the user did not exist.
    fn delete_user(&self, id: i64) -> Result<bool>;
    fn user_stats(&self, id: i64) -> Result<UserStats>;

    // -- Messages --

    fn create_message(&self, user_id: i64, text: &str) -> Result<Message>;
    fn find_message(&self, id: i64) -> Result<Option<MessageCard>>;
    /// Removes the message and its likes.
    fn delete_message(&self, id: i64) -> Result<bool>;
    /// Newest first.
    fn user_messages(&self, user_id: i64, limit: u32) -> Result<Vec<MessageCard>>;
    /// The user's own messages plus those of everyone they follow, newest first.
    fn home_feed(&self, user_id: i64, limit: u32) -> Result<Vec<MessageCard>>;

    // -- Follows --

    fn follow(&self, follower_id: i64, followed_id: i64) -> Result<()>;
    fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool>;
    fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool>;
    /// Users that `user_id` follows.
    fn following(&self, user_id: i64) -> Result<Vec<User>>;
    /// Users following `user_id`.
    fn followers(&self, user_id: i64) -> Result<Vec<User>>;

    // -- Likes --

    /// `StoreError::NotFound` if the message does not exist,
    /// `StoreError::UniqueViolation` if already liked.
    fn add_like(&self, user_id: i64, message_id: i64) -> Result<()>;
    fn remove_like(&self, user_id: i64, message_id: i64) -> Result<bool>;
    fn liked_messages(&self, user_id: i64) -> Result<Vec<MessageCard>>;
    fn liked_message_ids(&self, user_id: i64) -> Result<Vec<i64>>;
}
