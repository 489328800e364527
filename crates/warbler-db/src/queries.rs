use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};
use warbler_types::models::{
    DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL, Message, MessageCard, NewUser, ProfileChanges,
    User, UserStats,
};

use crate::models::{CARD_SELECT, USER_COLUMNS, card_from_row, user_from_row};
use crate::{Database, Repository, Result, StoreError};

impl Repository for Database {
    // -- Users --

    fn create_user(&self, user: &NewUser) -> Result<User> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password, image_url) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.username,
                    user.email,
                    user.password_hash,
                    user.image_url.as_deref().unwrap_or(DEFAULT_IMAGE_URL),
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!("Created user {} ({})", user.username, id);
            query_user_by_id(conn, id)?.ok_or(StoreError::NotFound)
        })
    }

    fn find_user(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    fn list_users(&self, search: Option<&str>) -> Result<Vec<User>> {
        self.with_conn(|conn| match search {
            Some(q) => query_users(
                conn,
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE instr(lower(username), lower(?1)) > 0
                     ORDER BY username"
                ),
                params![q],
            ),
            None => query_users(
                conn,
                &format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"),
                [],
            ),
        })
    }

    fn update_user(&self, id: i64, changes: &ProfileChanges) -> Result<User> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users
                 SET username = ?2, email = ?3, image_url = ?4, header_image_url = ?5,
                     bio = ?6, location = ?7
                 WHERE id = ?1",
                params![
                    id,
                    changes.username,
                    changes.email,
                    changes.image_url.as_deref().unwrap_or(DEFAULT_IMAGE_URL),
                    changes
                        .header_image_url
                        .as_deref()
                        .unwrap_or(DEFAULT_HEADER_IMAGE_URL),
                    changes.bio,
                    changes.location,
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            query_user_by_id(conn, id)?.ok_or(StoreError::NotFound)
        })
    }

    fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let likes_received = tx.execute(
                "DELETE FROM likes WHERE message_id IN (SELECT id FROM messages WHERE user_id = ?1)",
                [id],
            )?;
            let likes_given = tx.execute("DELETE FROM likes WHERE user_id = ?1", [id])?;
            let follows = tx.execute(
                "DELETE FROM follows WHERE user_being_followed_id = ?1 OR user_following_id = ?1",
                [id],
            )?;
            let messages = tx.execute("DELETE FROM messages WHERE user_id = ?1", [id])?;
            let removed = tx.execute("DELETE FROM users WHERE id = ?1", [id])? > 0;

            tx.commit()?;

            if removed {
                info!(
                    "Deleted user {} ({} messages, {} follows, {} likes)",
                    id,
                    messages,
                    follows,
                    likes_received + likes_given
                );
            }
            Ok(removed)
        })
    }

    fn user_stats(&self, id: i64) -> Result<UserStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM messages WHERE user_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE user_following_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE user_being_followed_id = ?1),
                    (SELECT COUNT(*) FROM likes WHERE user_id = ?1)",
                [id],
                |row| {
                    Ok(UserStats {
                        messages: row.get(0)?,
                        following: row.get(1)?,
                        followers: row.get(2)?,
                        likes: row.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }

    // -- Messages --

    fn create_message(&self, user_id: i64, text: &str) -> Result<Message> {
        let timestamp = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (text, timestamp, user_id) VALUES (?1, ?2, ?3)",
                params![text, timestamp, user_id],
            )?;
            Ok(Message {
                id: conn.last_insert_rowid(),
                text: text.to_string(),
                timestamp,
                user_id,
            })
        })
    }

    fn find_message(&self, id: i64) -> Result<Option<MessageCard>> {
        self.with_conn(|conn| {
            let card = conn
                .query_row(&format!("{CARD_SELECT} WHERE m.id = ?1"), [id], card_from_row)
                .optional()?;
            Ok(card)
        })
    }

    fn delete_message(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM likes WHERE message_id = ?1", [id])?;
            let removed = tx.execute("DELETE FROM messages WHERE id = ?1", [id])? > 0;
            tx.commit()?;
            Ok(removed)
        })
    }

    fn user_messages(&self, user_id: i64, limit: u32) -> Result<Vec<MessageCard>> {
        self.with_conn(|conn| {
            query_cards(
                conn,
                &format!(
                    "{CARD_SELECT}
                     WHERE m.user_id = ?1
                     ORDER BY m.timestamp DESC, m.id DESC
                     LIMIT ?2"
                ),
                params![user_id, limit],
            )
        })
    }

    fn home_feed(&self, user_id: i64, limit: u32) -> Result<Vec<MessageCard>> {
        self.with_conn(|conn| {
            query_cards(
                conn,
                &format!(
                    "{CARD_SELECT}
                     WHERE m.user_id = ?1
                        OR m.user_id IN (SELECT user_being_followed_id FROM follows
                                         WHERE user_following_id = ?1)
                     ORDER BY m.timestamp DESC, m.id DESC
                     LIMIT ?2"
                ),
                params![user_id, limit],
            )
        })
    }

    // -- Follows --

    fn follow(&self, follower_id: i64, followed_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            if query_user_by_id(conn, followed_id)?.is_none() {
                return Err(StoreError::NotFound);
            }
            conn.execute(
                "INSERT INTO follows (user_being_followed_id, user_following_id) VALUES (?1, ?2)",
                params![followed_id, follower_id],
            )?;
            Ok(())
        })
    }

    fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                params![followed_id, follower_id],
            )?;
            Ok(removed > 0)
        })
    }

    fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM follows
                               WHERE user_being_followed_id = ?1 AND user_following_id = ?2)",
                params![followed_id, follower_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    fn following(&self, user_id: i64) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE id IN (SELECT user_being_followed_id FROM follows
                                  WHERE user_following_id = ?1)
                     ORDER BY username"
                ),
                [user_id],
            )
        })
    }

    fn followers(&self, user_id: i64) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE id IN (SELECT user_following_id FROM follows
                                  WHERE user_being_followed_id = ?1)
                     ORDER BY username"
                ),
                [user_id],
            )
        })
    }

    // -- Likes --

    fn add_like(&self, user_id: i64, message_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM messages WHERE id = ?1)",
                [message_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StoreError::NotFound);
            }
            conn.execute(
                "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                params![user_id, message_id],
            )?;
            Ok(())
        })
    }

    fn remove_like(&self, user_id: i64, message_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                params![user_id, message_id],
            )?;
            Ok(removed > 0)
        })
    }

    fn liked_messages(&self, user_id: i64) -> Result<Vec<MessageCard>> {
        self.with_conn(|conn| {
            query_cards(
                conn,
                &format!(
                    "{CARD_SELECT}
                     JOIN likes lk ON lk.message_id = m.id
                     WHERE lk.user_id = ?1
                     ORDER BY m.timestamp DESC, m.id DESC"
                ),
                [user_id],
            )
        })
    }

    fn liked_message_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT message_id FROM likes WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            user_from_row,
        )
        .optional()?;
    Ok(row)
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            [username],
            user_from_row,
        )
        .optional()?;
    Ok(row)
}

fn query_users<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, user_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn query_cards<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<MessageCard>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, card_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_user(db: &Database, name: &str) -> User {
        db.create_user(&NewUser {
            username: name.to_string(),
            email: format!("{name}@test.com"),
            password_hash: "HASHED_PASSWORD".to_string(),
            image_url: None,
        })
        .unwrap()
    }

    fn message_count(db: &Database) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn test_new_user_has_defaults_and_no_relations() {
        let db = db();
        let u = add_user(&db, "testuser");

        assert_eq!(u.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(u.header_image_url, DEFAULT_HEADER_IMAGE_URL);
        assert_eq!(db.user_stats(u.id).unwrap(), UserStats::default());
        assert!(db.followers(u.id).unwrap().is_empty());
        assert_eq!(db.find_user_by_username("testuser").unwrap(), Some(u));
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let db = db();
        add_user(&db, "test1");

        let err = db
            .create_user(&NewUser {
                username: "test1".into(),
                email: "other@test.com".into(),
                password_hash: "x".into(),
                image_url: None,
            })
            .unwrap_err();

        match err {
            StoreError::UniqueViolation(target) => assert_eq!(target, "users.username"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.list_users(None).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = db();
        add_user(&db, "test1");

        let err = db
            .create_user(&NewUser {
                username: "test2".into(),
                email: "test1@test.com".into(),
                password_hash: "x".into(),
                image_url: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(ref t) if t == "users.email"));
    }

    #[test]
    fn test_message_model() {
        let db = db();
        let u = add_user(&db, "test1");

        let m = db.create_message(u.id, "Hi, I am post!").unwrap();
        let card = db.find_message(m.id).unwrap().unwrap();

        assert_eq!(card.message.id, m.id);
        assert_eq!(card.message.text, "Hi, I am post!");
        assert_eq!(card.message.user_id, u.id);
        assert_eq!(card.author.username, "test1");
        assert_eq!(card.like_count, 0);
        assert!(db.find_message(m.id + 1).unwrap().is_none());
    }

    #[test]
    fn test_message_longer_than_limit_rejected() {
        let db = db();
        let u = add_user(&db, "test1");

        assert!(db.create_message(u.id, &"x".repeat(141)).is_err());
        assert!(db.create_message(u.id, &"x".repeat(140)).is_ok());
        assert_eq!(message_count(&db), 1);
    }

    #[test]
    fn test_user_messages_newest_first() {
        let db = db();
        let u = add_user(&db, "test1");
        let first = db.create_message(u.id, "first").unwrap();
        let second = db.create_message(u.id, "second").unwrap();

        let ids: Vec<i64> = db
            .user_messages(u.id, 100)
            .unwrap()
            .iter()
            .map(|c| c.message.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(db.user_messages(u.id, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_follow_directions() {
        let db = db();
        let one = add_user(&db, "one");
        let two = add_user(&db, "two");
        let three = add_user(&db, "three");

        db.follow(one.id, two.id).unwrap();
        db.follow(three.id, one.id).unwrap();

        let following: Vec<String> = db.following(one.id).unwrap().into_iter().map(|u| u.username).collect();
        let followers: Vec<String> = db.followers(one.id).unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(following, vec!["two"]);
        assert_eq!(followers, vec!["three"]);

        assert!(db.is_following(one.id, two.id).unwrap());
        assert!(!db.is_following(two.id, one.id).unwrap());

        let stats = db.user_stats(one.id).unwrap();
        assert_eq!((stats.following, stats.followers), (1, 1));
    }

    #[test]
    fn test_duplicate_follow_rejected() {
        let db = db();
        let one = add_user(&db, "one");
        let two = add_user(&db, "two");

        db.follow(one.id, two.id).unwrap();
        assert!(matches!(db.follow(one.id, two.id), Err(StoreError::UniqueViolation(_))));
        assert_eq!(db.following(one.id).unwrap().len(), 1);

        assert!(db.unfollow(one.id, two.id).unwrap());
        assert!(!db.unfollow(one.id, two.id).unwrap());
        assert!(matches!(db.follow(one.id, 999), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_like_unique_per_user_and_message() {
        let db = db();
        let author = add_user(&db, "author");
        let fan = add_user(&db, "fan");
        let m = db.create_message(author.id, "likeable").unwrap();

        db.add_like(fan.id, m.id).unwrap();
        assert!(matches!(db.add_like(fan.id, m.id), Err(StoreError::UniqueViolation(_))));
        assert_eq!(db.find_message(m.id).unwrap().unwrap().like_count, 1);
        assert_eq!(db.liked_message_ids(fan.id).unwrap(), vec![m.id]);
        assert_eq!(db.liked_messages(fan.id).unwrap()[0].message.id, m.id);

        assert!(db.remove_like(fan.id, m.id).unwrap());
        assert!(!db.remove_like(fan.id, m.id).unwrap());
        assert_eq!(db.find_message(m.id).unwrap().unwrap().like_count, 0);
    }

    #[test]
    fn test_like_missing_message() {
        let db = db();
        let fan = add_user(&db, "fan");
        assert!(matches!(db.add_like(fan.id, 42), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_delete_message_removes_likes() {
        let db = db();
        let author = add_user(&db, "author");
        let fan = add_user(&db, "fan");
        let m = db.create_message(author.id, "short-lived").unwrap();
        db.add_like(fan.id, m.id).unwrap();

        assert!(db.delete_message(m.id).unwrap());
        assert!(db.find_message(m.id).unwrap().is_none());
        assert!(db.liked_message_ids(fan.id).unwrap().is_empty());
        assert!(!db.delete_message(m.id).unwrap());
    }

    #[test]
    fn test_delete_user_cascades() {
        let db = db();
        let gone = add_user(&db, "gone");
        let stays = add_user(&db, "stays");

        let gone_msg = db.create_message(gone.id, "bye").unwrap();
        let stays_msg = db.create_message(stays.id, "still here").unwrap();
        db.add_like(stays.id, gone_msg.id).unwrap();
        db.add_like(gone.id, stays_msg.id).unwrap();
        db.follow(gone.id, stays.id).unwrap();
        db.follow(stays.id, gone.id).unwrap();

        assert!(db.delete_user(gone.id).unwrap());

        assert!(db.find_user(gone.id).unwrap().is_none());
        assert!(db.find_message(gone_msg.id).unwrap().is_none());
        assert_eq!(message_count(&db), 1);

        let survivor = db.find_message(stays_msg.id).unwrap().unwrap();
        assert_eq!(survivor.like_count, 0);
        assert_eq!(db.user_stats(stays.id).unwrap(), UserStats { messages: 1, ..Default::default() });

        assert!(!db.delete_user(gone.id).unwrap());
    }

    #[test]
    fn test_home_feed_includes_followed_only() {
        let db = db();
        let me = add_user(&db, "me");
        let friend = add_user(&db, "friend");
        let stranger = add_user(&db, "stranger");
        db.follow(me.id, friend.id).unwrap();

        db.create_message(me.id, "mine").unwrap();
        db.create_message(friend.id, "friend's").unwrap();
        db.create_message(stranger.id, "stranger's").unwrap();

        let texts: Vec<String> = db
            .home_feed(me.id, 100)
            .unwrap()
            .into_iter()
            .map(|c| c.message.text)
            .collect();
        assert_eq!(texts, vec!["friend's", "mine"]);
    }

    #[test]
    fn test_list_users_search() {
        let db = db();
        add_user(&db, "Alice");
        add_user(&db, "bob");
        add_user(&db, "malice");

        let found: Vec<String> = db
            .list_users(Some("ALI"))
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(found, vec!["Alice", "malice"]);
        assert_eq!(db.list_users(None).unwrap().len(), 3);
    }

    #[test]
    fn test_update_user() {
        let db = db();
        let one = add_user(&db, "one");
        add_user(&db, "two");

        let changes = ProfileChanges {
            username: "one".into(),
            email: "new@mail.com".into(),
            bio: Some("I am test user.".into()),
            ..Default::default()
        };
        let updated = db.update_user(one.id, &changes).unwrap();
        assert_eq!(updated.email, "new@mail.com");
        assert_eq!(updated.bio.as_deref(), Some("I am test user."));
        assert_eq!(updated.password, one.password);

        let clash = ProfileChanges {
            username: "two".into(),
            email: "new@mail.com".into(),
            ..Default::default()
        };
        assert!(matches!(db.update_user(one.id, &clash), Err(StoreError::UniqueViolation(_))));
        assert_eq!(db.find_user(one.id).unwrap().unwrap().username, "one");

        assert!(matches!(db.update_user(999, &changes), Err(StoreError::NotFound)));
    }
}
