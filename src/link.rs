//! Post-link parsing: `t.me/<channel>/<id>` and the private
//! `t.me/c/<internal-id>/<id>` form.

use crate::error::FetchError;

/// Channel half of a post reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// Public channel or group, addressed by username.
    Username(String),
    /// Private channel, addressed by its internal numeric id (the `/c/` form).
    Internal(i64),
}

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelRef::Username(name) => write!(f, "@{name}"),
            ChannelRef::Internal(id) => write!(f, "c/{id}"),
        }
    }
}

/// A parsed (channel, message id) pair identifying one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    pub channel: ChannelRef,
    pub msg_id: i32,
}

const HOSTS: [&str; 3] = ["t.me", "telegram.me", "telegram.dog"];

/// Parse a Telegram post URL. Query strings are stripped; the scheme is
/// optional. No network access.
pub fn parse_post_url(url: &str) -> Result<PostRef, FetchError> {
    let trimmed = url.trim();
    let without_query = trimmed.split('?').next().unwrap_or(trimmed);
    let without_query = without_query.trim_end_matches('/');

    let rest = without_query
        .strip_prefix("https://")
        .or_else(|| without_query.strip_prefix("http://"))
        .unwrap_or(without_query);

    let mut parts = rest.split('/');
    let host = parts.next().unwrap_or_default();
    if !HOSTS.contains(&host) {
        return Err(invalid(trimmed));
    }

    let segments: Vec<&str> = parts.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["c", internal, id] => {
            let internal: i64 = internal.parse().map_err(|_| invalid(trimmed))?;
            if internal <= 0 {
                return Err(invalid(trimmed));
            }
            Ok(PostRef {
                channel: ChannelRef::Internal(internal),
                msg_id: parse_msg_id(id).ok_or_else(|| invalid(trimmed))?,
            })
        }
        [channel, id] if *channel != "c" => {
            let name = channel.trim_start_matches('@');
            if name.is_empty() {
                return Err(invalid(trimmed));
            }
            Ok(PostRef {
                channel: ChannelRef::Username(name.to_string()),
                msg_id: parse_msg_id(id).ok_or_else(|| invalid(trimmed))?,
            })
        }
        _ => Err(invalid(trimmed)),
    }
}

fn parse_msg_id(s: &str) -> Option<i32> {
    s.parse().ok().filter(|id| *id > 0)
}

fn invalid(url: &str) -> FetchError {
    FetchError::InvalidLink(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_link() {
        let post = parse_post_url("https://t.me/somechannel/547").unwrap();
        assert_eq!(post.channel, ChannelRef::Username("somechannel".into()));
        assert_eq!(post.msg_id, 547);
    }

    #[test]
    fn test_private_link() {
        let post = parse_post_url("https://t.me/c/1234567890/42").unwrap();
        assert_eq!(post.channel, ChannelRef::Internal(1234567890));
        assert_eq!(post.msg_id, 42);
    }

    #[test]
    fn test_query_string_and_scheme_variants() {
        let post = parse_post_url("https://t.me/chan/100?single").unwrap();
        assert_eq!(post.msg_id, 100);

        let post = parse_post_url("t.me/chan/100").unwrap();
        assert_eq!(post.channel, ChannelRef::Username("chan".into()));

        let post = parse_post_url("http://telegram.me/chan/100/").unwrap();
        assert_eq!(post.msg_id, 100);
    }

    #[test]
    fn test_malformed_links_rejected() {
        for url in [
            "https://t.me/chan",              // missing id
            "https://t.me/chan/abc",          // non-numeric id
            "https://t.me/chan/0",            // id must be positive
            "https://t.me/chan/-5",           // id must be positive
            "https://t.me/c/123",             // private form missing id
            "https://t.me/c/abc/10",          // non-numeric internal id
            "https://example.com/chan/10",    // wrong host
            "https://t.me/a/b/c/d",           // too many segments
            "not a url at all",
            "",
        ] {
            assert!(
                matches!(parse_post_url(url), Err(FetchError::InvalidLink(_))),
                "expected rejection for {url:?}"
            );
        }
    }

    #[test]
    fn test_same_channel_comparison() {
        let a = parse_post_url("https://t.me/chan/1").unwrap();
        let b = parse_post_url("https://t.me/chan/2").unwrap();
        let c = parse_post_url("https://t.me/other/1").unwrap();
        assert_eq!(a.channel, b.channel);
        assert_ne!(a.channel, c.channel);
    }
}
