//! Row mapping from SQLite into the plain `warbler-types` entities.
//! Column order must match the SELECT lists defined here.

use rusqlite::Row;
use warbler_types::models::{Message, MessageCard, User, UserSummary};

pub(crate) const USER_COLUMNS: &str =
    "id, username, email, password, image_url, header_image_url, bio, location";

pub(crate) const CARD_SELECT: &str = "
    SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url,
           (SELECT COUNT(*) FROM likes l WHERE l.message_id = m.id) AS like_count
    FROM messages m
    JOIN users u ON u.id = m.user_id";

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        header_image_url: row.get(5)?,
        bio: row.get(6)?,
        location: row.get(7)?,
    })
}

pub(crate) fn card_from_row(row: &Row<'_>) -> rusqlite::Result<MessageCard> {
    let user_id: i64 = row.get(3)?;
    Ok(MessageCard {
        message: Message {
            id: row.get(0)?,
            text: row.get(1)?,
            timestamp: row.get(2)?,
            user_id,
        },
        author: UserSummary {
            id: user_id,
            username: row.get(4)?,
            image_url: row.get(5)?,
        },
        like_count: row.get(6)?,
    })
}
