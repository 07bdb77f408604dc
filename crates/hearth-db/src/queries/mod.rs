//! Typed query methods on [`Database`](crate::Database), one module per
//! resource family.

mod activities;
mod attachments;
mod bookmarks;
mod calls;
mod canvases;
mod channels;
mod direct_messages;
mod drafts;
mod emojis;
mod groups;
mod messages;
mod notifications;
mod permalinks;
mod pins;
mod scheduled;
mod search;
mod seed;
mod sessions;
mod users;
mod workflows;

pub use seed::Seeder;

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::Database;
    use crate::models::NewUser;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn user(db: &Database, username: &str) -> i64 {
        let email = format!("{}@example.com", username);
        db.create_user(&NewUser {
            username,
            email: &email,
            password_hash: "x",
            status: "online",
            ..Default::default()
        })
        .unwrap()
    }

    pub fn channel(db: &Database, name: &str, private: bool, owner: i64) -> i64 {
        db.create_channel(name, None, private, owner, &[]).unwrap()
    }
}
