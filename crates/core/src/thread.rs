//! Platform payloads: thread snapshots and feed posts.
//!
//! Every field is optional or defaulted, and explicit JSON `null` is treated
//! the same as a missing field, so a sparse payload decodes instead of failing.

use serde::{Deserialize, Deserializer, Serialize};

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One fetch's worth of a post plus its full comment forest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    #[serde(default, deserialize_with = "nullable")]
    pub success: bool,
    #[serde(default)]
    pub post: Option<ThreadPost>,
    #[serde(default, deserialize_with = "nullable")]
    pub comments: Vec<ThreadComment>,
    #[serde(default)]
    pub context: Option<ThreadContext>,
}

impl ThreadSnapshot {
    /// The post id, when the platform returned one.
    pub fn post_id(&self) -> Option<&str> {
        self.post
            .as_ref()
            .and_then(|p| p.id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }

    /// Top-level comments with a non-empty id, in platform order.
    pub fn candidates(&self) -> Vec<&ThreadComment> {
        self.comments
            .iter()
            .filter(|c| c.id().is_some() && c.is_top_level())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadPost {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub upvotes: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub downvotes: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub comment_count: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub submolt: Option<Community>,
    #[serde(default)]
    pub author: Option<Author>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadComment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub upvotes: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub downvotes: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default, deserialize_with = "nullable")]
    pub replies: Vec<ThreadComment>,
}

impl ThreadComment {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id
            .as_deref()
            .is_none_or(|p| p.trim().is_empty())
    }

    pub fn author_name(&self) -> Option<&str> {
        self.author.as_ref().and_then(|a| a.name.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub karma: Option<i64>,
    #[serde(default)]
    pub follower_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Community {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadContext {
    #[serde(default)]
    pub tip: Option<String>,
}

/// One post summary from a feed listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedPost {
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub content: String,
    #[serde(default)]
    pub author: Option<FeedAuthor>,
}

impl FeedPost {
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedAuthor {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_thread_decodes() {
        let raw = r#"{"success":true,"post":{"id":"p1","title":null},"comments":null}"#;
        let thread: ThreadSnapshot = serde_json::from_str(raw).unwrap();
        assert!(thread.success);
        assert_eq!(thread.post_id(), Some("p1"));
        assert_eq!(thread.post.unwrap().title, "");
        assert!(thread.comments.is_empty());
    }

    #[test]
    fn candidates_are_top_level_with_ids() {
        let raw = r#"{
            "success": true,
            "post": {"id": "p1"},
            "comments": [
                {"id": "c1", "content": "first", "parent_id": null},
                {"id": "c2", "content": "reply", "parent_id": "c1"},
                {"id": "", "content": "no id"},
                {"id": "c3", "content": "third", "parent_id": "  ", "author": {"name": "bob"}}
            ],
            "context": {"tip": "be nice"}
        }"#;
        let thread: ThreadSnapshot = serde_json::from_str(raw).unwrap();
        let ids: Vec<_> = thread.candidates().iter().filter_map(|c| c.id()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
        assert_eq!(thread.candidates()[1].author_name(), Some("bob"));
        assert_eq!(thread.context.unwrap().tip.as_deref(), Some("be nice"));
    }

    #[test]
    fn missing_post_id_is_none() {
        let thread: ThreadSnapshot = serde_json::from_str(r#"{"success":true,"post":{}}"#).unwrap();
        assert!(thread.post_id().is_none());
    }

    #[test]
    fn feed_post_defaults() {
        let post: FeedPost = serde_json::from_str(r#"{"title":"A"}"#).unwrap();
        assert_eq!(post.title, "A");
        assert_eq!(post.content, "");
        assert_eq!(post.author_name(), "");
    }
}
