//! Text shaping around the model: feed digests in, post drafts out.
//!
//! Nothing here fails. Unrecognized input degrades to a capped copy of the
//! raw text, and a draft with no usable title becomes `Post`.

use moltpilot_core::thread::FeedPost;
use moltpilot_tools::cap_text;

pub const EMPTY_FEED: &str = "(empty feed)";
pub const NO_POSTS_PARSED: &str = "(no posts parsed)";
pub const DEFAULT_TITLE: &str = "Post";

const ELLIPSIS: char = '…';
const TITLE_LABEL: &str = "TITLE:";
const QUOTES: &[char] = &['"', '\'', '“', '”', '‘', '’'];


/// Condense a raw feed payload into a bounded, model-friendly digest.
///
/// Accepts `{"posts": [...]}`, `{"feed": [...]}` or a bare array. Anything
/// else comes back as the raw text capped at `max_total_chars`.
pub fn build_feed_digest(
    raw: &str,
    max_posts: usize,
    max_chars_per_post: usize,
    max_total_chars: usize,
) -> String {
    if raw.trim().is_empty() {
        return EMPTY_FEED.to_string();
    }

    let Some(posts) = decode_feed(raw) else {
        return cap_text(raw, max_total_chars);
    };

    let mut digest = String::new();
    let mut length = 0usize;
    for post in posts.iter().take(max_posts) {
        let title = one_line(post.title.trim());
        let author = one_line(post.author_name());
        let body = truncate_with_ellipsis(&collapse_whitespace(&post.content), max_chars_per_post);

        let entry = format!("- {title} (by {author})\n  {body}\n\n");
        length += entry.chars().count();
        digest.push_str(&entry);

        if length >= max_total_chars {
            break;
        }
    }

    let digest = digest.trim();
    if digest.is_empty() {
        NO_POSTS_PARSED.to_string()
    } else {
        digest.to_string()
    }
}

fn decode_feed(raw: &str) -> Option<Vec<FeedPost>> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let items = match &value {
        serde_json::Value::Object(map) => map
            .get("posts")
            .filter(|v| v.is_array())
            .or_else(|| map.get("feed").filter(|v| v.is_array()))?,
        serde_json::Value::Array(_) => &value,
        _ => return None,
    };
    serde_json::from_value(items.clone()).ok()
}

/// `\r\n` to `\n`, runs of spaces/tabs to one space, 3+ newlines to 2, trimmed.
pub fn collapse_whitespace(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let text = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    let mut newline_run = 0usize;
    for c in text.chars() {
        if c == ' ' || c == '\t' {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
            newline_run = 0;
        }
        if c == '\n' {
            newline_run += 1;
            // At most one blank line survives.
            if newline_run > 2 {
                continue;
            }
        } else {
            newline_run = 0;
        }
        out.push(c);
    }
    out.trim().to_string()
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{ELLIPSIS}", &text[..idx]),
        None => text.to_string(),
    }
}

/// Flatten to a single trimmed line.
fn one_line(text: &str) -> String {
    text.replace('\r', "").replace('\n', " ").trim().to_string()
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &text[prefix.len()..])
}

/// Split into lines and find the first non-blank one.
fn split_title(raw: &str) -> Option<(String, String)> {
    let normalized = raw.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    let idx = lines.iter().position(|l| !l.trim().is_empty())?;
    let body = lines[idx + 1..].join("\n").trim().to_string();
    Some((lines[idx].to_string(), body))
}

/// Force a model draft into `{title}\n\n{body}\n` with a plain-text title.
pub fn normalize_draft(raw: &str) -> String {
    let Some((title_line, body)) = split_title(raw) else {
        return format!("{DEFAULT_TITLE}\n\n");
    };

    let title = clean_draft_title(&title_line);
    if body.is_empty() {
        format!("{title}\n\n")
    } else {
        format!("{title}\n\n{body}\n")
    }
}

fn clean_draft_title(line: &str) -> String {
    let title = line.trim_matches(|c: char| c.is_whitespace() || QUOTES.contains(&c));
    let title = strip_prefix_ignore_case(title, TITLE_LABEL)
        .unwrap_or(title)
        .trim();
    let title = title
        .trim_start_matches(['#', '-', '*', '>', ' '])
        .trim();
    let title = title
        .replace("**", "")
        .replace("__", "")
        .replace('*', "")
        .replace('_', "");
    let title = one_line(&title);

    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

/// Split a draft into the title and content sent to the create-post endpoint.
pub fn parse_title_and_content(draft: &str) -> (String, String) {
    let Some((title_line, content)) = split_title(draft) else {
        return (DEFAULT_TITLE.to_string(), String::new());
    };

    let title = title_line.trim().trim_matches('*').trim();
    let title = strip_prefix_ignore_case(title, TITLE_LABEL)
        .map(str::trim)
        .unwrap_or(title);
    let title = if title.is_empty() { DEFAULT_TITLE } else { title };
    (title.to_string(), content)
}

/// `" /m/General/ "` → `"General"`.
pub fn community_slug(input: &str) -> String {
    let slug = input.trim().trim_start_matches('/');
    let slug = strip_prefix_ignore_case(slug, "m/").unwrap_or(slug);
    slug.trim().trim_matches('/').to_string()
}
