//! Membership, read and ownership checks shared by the routers.

use hearth_db::Database;
use hearth_db::models::{ChannelRow, DirectMessageRow, MessageRow};

use crate::error::{ApiError, ApiResult};

pub fn channel(db: &Database, id: i64) -> ApiResult<ChannelRow> {
    db.get_channel(id)?
        .ok_or_else(|| ApiError::NotFound("Channel not found".into()))
}

pub fn message(db: &Database, id: i64) -> ApiResult<MessageRow> {
    db.get_message_row(id)?
        .ok_or_else(|| ApiError::NotFound("Message not found".into()))
}

pub fn direct_message(db: &Database, id: i64) -> ApiResult<DirectMessageRow> {
    db.get_direct_message_row(id)?
        .ok_or_else(|| ApiError::NotFound("Direct message not found".into()))
}

pub fn require_user(db: &Database, id: i64) -> ApiResult<()> {
    if db.user_exists(id)? {
        Ok(())
    } else {
        Err(ApiError::NotFound("User not found".into()))
    }
}

pub fn can_read(db: &Database, channel: &ChannelRow, user_id: i64) -> ApiResult<bool> {
    Ok(!channel.is_private || db.is_member(channel.id, user_id)?)
}

pub fn require_read(db: &Database, channel: &ChannelRow, user_id: i64) -> ApiResult<()> {
    if can_read(db, channel, user_id)? {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not a member of this private channel".into()))
    }
}

pub fn require_member(db: &Database, channel_id: i64, user_id: i64) -> ApiResult<()> {
    if db.is_member(channel_id, user_id)? {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not a member of this channel".into()))
    }
}

/// Message plus its channel, after a read-access check.
pub fn readable_message(db: &Database, message_id: i64, user_id: i64) -> ApiResult<(MessageRow, ChannelRow)> {
    let msg = message(db, message_id)?;
    let ch = channel(db, msg.channel_id)?;
    require_read(db, &ch, user_id)?;
    Ok((msg, ch))
}

/// Message whose channel the caller belongs to.
pub fn member_message(db: &Database, message_id: i64, user_id: i64) -> ApiResult<MessageRow> {
    let msg = message(db, message_id)?;
    require_member(db, msg.channel_id, user_id)?;
    Ok(msg)
}

/// Direct message the caller sent or received.
pub fn participant_dm(db: &Database, id: i64, user_id: i64) -> ApiResult<DirectMessageRow> {
    let dm = direct_message(db, id)?;
    if !dm.involves(user_id) {
        return Err(ApiError::Forbidden("Not a participant in this conversation".into()));
    }
    Ok(dm)
}

pub fn require_owner(owner_id: i64, user_id: i64, what: &str) -> ApiResult<()> {
    if owner_id == user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("You can only modify your own {}", what)))
    }
}

pub fn require_creator(channel: &ChannelRow, user_id: i64) -> ApiResult<()> {
    if channel.created_by == Some(user_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Only the channel creator can do this".into()))
    }
}

/// Exactly one of two optional targets.
pub fn exactly_one<T>(a: Option<T>, b: Option<T>, msg: &str) -> ApiResult<Target<T>> {
    match (a, b) {
        (Some(a), None) => Ok(Target::First(a)),
        (None, Some(b)) => Ok(Target::Second(b)),
        _ => Err(ApiError::Validation(msg.into())),
    }
}

pub enum Target<T> {
    First(T),
    Second(T),
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_db::models::NewUser;

    fn user(db: &Database, name: &str) -> i64 {
        let email = format!("{}@example.com", name);
        db.create_user(&NewUser {
            username: name,
            email: &email,
            password_hash: "x",
            status: "online",
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn public_channels_are_readable_private_ones_need_membership() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let public = db.create_channel("general", None, false, alice, &[]).unwrap();
        let private = db.create_channel("secret", None, true, alice, &[]).unwrap();

        let public = channel(&db, public).unwrap();
        let private = channel(&db, private).unwrap();
        assert!(can_read(&db, &public, bob).unwrap());
        assert!(!can_read(&db, &private, bob).unwrap());
        assert!(can_read(&db, &private, alice).unwrap());
        assert!(matches!(require_member(&db, public.id, bob), Err(ApiError::Forbidden(_))));
        assert!(require_creator(&public, alice).is_ok());
        assert!(require_creator(&public, bob).is_err());
    }

    #[test]
    fn exactly_one_rejects_both_and_neither() {
        assert!(matches!(exactly_one(Some(1), None, "x"), Ok(Target::First(1))));
        assert!(matches!(exactly_one(None, Some(2), "x"), Ok(Target::Second(2))));
        assert!(exactly_one(Some(1), Some(2), "x").is_err());
        assert!(exactly_one::<i64>(None, None, "x").is_err());
    }
}
