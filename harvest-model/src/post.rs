//! Community feed posts.

use crate::extract::{
    contains_user, first_count, first_flag, first_id, first_raw, first_text, first_timestamp,
    nested_id, nested_text, text, Record,
};
use crate::normalize::{UNKNOWN_AUTHOR_ID, UNKNOWN_USER};
use crate::{
    EntityField, FieldChange, FieldValue, ModelResult, MutationIntent, Normalize,
    NormalizeContext, Reconcilable,
};
use harvest_types::{EntityId, RawRecord, Timestamp};
use serde::{Deserialize, Serialize};

const ID_KEYS: &[&str] = &["id", "_id", "postId", "post_id", "uid"];
const AUTHOR_ID_KEYS: &[&str] = &["authorId", "author_id", "userId", "user_id"];
const NESTED_ID_KEYS: &[&str] = &["id", "_id", "uid", "userId"];
const AUTHOR_NAME_KEYS: &[&str] = &["authorName", "author_name"];
const NESTED_NAME_KEYS: &[&str] = &["name", "username", "displayName"];
const CONTENT_KEYS: &[&str] = &["content", "text", "body", "caption", "description"];
const CREATED_KEYS: &[&str] = &[
    "createdAt",
    "created_at",
    "updatedAt",
    "updated_at",
    "date",
    "timestamp",
];
const LIKE_COUNT_KEYS: &[&str] = &["likeCount", "likesCount", "like_count", "likes_count", "likes"];
const COMMENT_COUNT_KEYS: &[&str] = &[
    "commentCount",
    "commentsCount",
    "comment_count",
    "comments_count",
    "comments",
];
const LIKED_KEYS: &[&str] = &["isLikedByCurrentUser", "isLiked", "is_liked", "liked"];
const LIKED_BY_KEYS: &[&str] = &["likes", "likedBy", "liked_by"];

/// A post in the community feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub id: EntityId,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub created_at: Timestamp,
    pub like_count: u64,
    pub comment_count: u64,
    pub is_liked_by_current_user: bool,
}

/// Mutable fields of a [`FeedPost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostField {
    Liked,
    LikeCount,
    CommentCount,
    Content,
}

impl EntityField for PostField {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Liked => "isLiked",
            Self::LikeCount => "likeCount",
            Self::CommentCount => "commentCount",
            Self::Content => "content",
        }
    }
}

impl FeedPost {
    /// Creates a post with no likes or comments.
    pub fn new(
        id: EntityId,
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        content: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            author_id: author_id.into(),
            author_name: author_name.into(),
            content: content.into(),
            created_at,
            like_count: 0,
            comment_count: 0,
            is_liked_by_current_user: false,
        }
    }

    /// Intent that flips the like state and moves the count by one.
    ///
    /// Unliking a post whose count is already zero leaves the count at zero.
    pub fn toggle_like(&self) -> MutationIntent<Self> {
        let liked = !self.is_liked_by_current_user;
        let like_count = if liked {
            self.like_count.saturating_add(1)
        } else {
            self.like_count.saturating_sub(1)
        };
        MutationIntent::new(
            self.id.clone(),
            if liked { "like" } else { "unlike" },
            vec![
                FieldChange::new(PostField::Liked, FieldValue::Bool(liked)),
                FieldChange::new(PostField::LikeCount, FieldValue::Count(like_count)),
            ],
        )
        .with_payload(serde_json::json!({ "liked": liked }))
    }

    /// Intent that replaces the post body.
    pub fn edit_content(&self, content: impl Into<String>) -> MutationIntent<Self> {
        MutationIntent::new(
            self.id.clone(),
            "update_post",
            vec![FieldChange::new(
                PostField::Content,
                FieldValue::Text(content.into()),
            )],
        )
    }
}

impl Reconcilable for FeedPost {
    type Field = PostField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn field(&self, field: PostField) -> FieldValue {
        match field {
            PostField::Liked => FieldValue::Bool(self.is_liked_by_current_user),
            PostField::LikeCount => FieldValue::Count(self.like_count),
            PostField::CommentCount => FieldValue::Count(self.comment_count),
            PostField::Content => FieldValue::Text(self.content.clone()),
        }
    }

    fn set_field(&mut self, field: PostField, value: FieldValue) -> ModelResult<()> {
        let name = field.as_str();
        match field {
            PostField::Liked => self.is_liked_by_current_user = value.into_bool(name)?,
            PostField::LikeCount => self.like_count = value.into_count(name)?,
            PostField::CommentCount => self.comment_count = value.into_count(name)?,
            PostField::Content => self.content = value.into_text(name)?,
        }
        Ok(())
    }
}

impl Normalize for FeedPost {
    fn normalize_with(raw: &RawRecord, ctx: &NormalizeContext) -> Option<Self> {
        let record = raw.as_object()?;

        let author_name = author_name(record);
        let content = first_text(record, CONTENT_KEYS).unwrap_or_default();
        let id = first_id(record, ID_KEYS)
            .and_then(|id| EntityId::new(id).ok())
            .unwrap_or_else(|| {
                // No remote id: derive one from what identifies the post to a reader.
                let key = format!(
                    "post\u{1f}{author_name}\u{1f}{content}\u{1f}{}",
                    first_raw(record, CREATED_KEYS)
                );
                EntityId::derived(&key)
            });

        Some(Self {
            id,
            author_id: author_id(record),
            author_name,
            content,
            created_at: first_timestamp(record, CREATED_KEYS),
            like_count: first_count(record, LIKE_COUNT_KEYS),
            comment_count: first_count(record, COMMENT_COUNT_KEYS),
            is_liked_by_current_user: is_liked(record, ctx),
        })
    }
}

fn author_name(record: &Record) -> String {
    if let Some(name) = first_text(record, AUTHOR_NAME_KEYS) {
        return name;
    }
    if let Some(name) = record.get("author").and_then(text) {
        return name.to_string();
    }
    nested_text(record, "author", NESTED_NAME_KEYS)
        .or_else(|| nested_text(record, "user", NESTED_NAME_KEYS))
        .unwrap_or_else(|| UNKNOWN_USER.to_string())
}

fn author_id(record: &Record) -> String {
    first_id(record, AUTHOR_ID_KEYS)
        .or_else(|| nested_id(record, "author", NESTED_ID_KEYS))
        .or_else(|| nested_id(record, "user", NESTED_ID_KEYS))
        .unwrap_or_else(|| UNKNOWN_AUTHOR_ID.to_string())
}

fn is_liked(record: &Record, ctx: &NormalizeContext) -> bool {
    if let Some(liked) = first_flag(record, LIKED_KEYS) {
        return liked;
    }
    let Some(user_id) = ctx.current_user_id.as_deref() else {
        return false;
    };
    LIKED_BY_KEYS
        .iter()
        .filter_map(|key| record.get(*key))
        .any(|value| contains_user(value, user_id))
}
