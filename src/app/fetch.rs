//! The single-post fetcher: resolve, size-check, download, re-upload, clean up.

use std::path::{Path, PathBuf};
use std::time::Duration;

use grammers_client::types::{Attribute, Media, Message};
use grammers_client::InputMessage;
use grammers_session::defs::PeerRef;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::App;
use crate::classify::{self, Content};
use crate::error::{FetchError, FetchResult};
use crate::link::{ChannelRef, PostRef};
use crate::progress::Progress;
use crate::tasks::TaskGuard;

impl App {
    /// Outer boundary of a /dl-style fetch: every failure is logged and
    /// becomes one short reply to the requester; nothing propagates further.
    /// The guard keeps the task registered until this returns.
    pub(crate) async fn fetch_post(
        &self,
        chat: PeerRef,
        request_id: i32,
        url: &str,
        guard: TaskGuard,
    ) {
        match crate::link::parse_post_url(url) {
            Ok(post) => self.fetch_known_post(chat, request_id, post, guard).await,
            Err(e) => {
                log::error!("Rejected {url}: {e}");
                let _ = self.reply(chat, request_id, &format!("Error: {e}")).await;
            }
        }
    }

    /// Same boundary for an already-parsed post reference (batch dispatch).
    pub(crate) async fn fetch_known_post(
        &self,
        chat: PeerRef,
        request_id: i32,
        post: PostRef,
        guard: TaskGuard,
    ) {
        let cancel = guard.token().clone();
        match self.fetch_post_inner(chat.clone(), request_id, &post, &cancel).await {
            Ok(()) => {}
            Err(FetchError::Cancelled) => {
                log::info!("Fetch of {}/{} cancelled", post.channel, post.msg_id);
            }
            Err(e) => {
                log::error!("Error downloading {}/{}: {e}", post.channel, post.msg_id);
                let _ = self.reply(chat, request_id, &format!("Error: {e}")).await;
            }
        }
    }

    async fn fetch_post_inner(
        &self,
        chat: PeerRef,
        request_id: i32,
        post: &PostRef,
        cancel: &CancellationToken,
    ) -> FetchResult<()> {
        let message = self
            .resolve_post(post)
            .await?
            .ok_or(FetchError::Unavailable)?;
        log::info!("Fetched post {}/{}", post.channel, post.msg_id);

        match classify::classify(&message) {
            Content::Empty => {
                self.reply(chat, request_id, "No media or text found in the post.")
                    .await
                    .map_err(FetchError::Other)?;
                Ok(())
            }
            Content::Text => {
                self.reply(chat, request_id, message.text())
                    .await
                    .map_err(FetchError::Other)?;
                Ok(())
            }
            Content::Grouped => {
                self.fetch_group(chat, request_id, post, &message, cancel)
                    .await
            }
            kind => {
                self.fetch_single(chat, request_id, &message, kind, cancel)
                    .await
            }
        }
    }

    /// Resolve the channel peer and fetch the target message with the user
    /// session. `Ok(None)` means the channel is reachable but the message is
    /// gone (deleted); an error means the session cannot see the channel.
    pub(crate) async fn resolve_post(&self, post: &PostRef) -> FetchResult<Option<Message>> {
        let peer = self.resolve_channel(&post.channel).await?;
        let messages = self
            .user
            .client
            .get_messages_by_id(peer, &[post.msg_id])
            .await
            .map_err(|_| FetchError::Unavailable)?;
        Ok(messages.into_iter().next().flatten())
    }

    async fn resolve_channel(&self, channel: &ChannelRef) -> FetchResult<PeerRef> {
        match channel {
            ChannelRef::Username(name) => {
                let peer = self
                    .user
                    .client
                    .resolve_username(name)
                    .await
                    .map_err(|_| FetchError::Unavailable)?
                    .ok_or(FetchError::Unavailable)?;
                Ok(PeerRef::from(&peer))
            }
            ChannelRef::Internal(id) => {
                // Private channels carry no username; the session only sees
                // them through its own dialogs.
                let mut dialogs = self.user.client.iter_dialogs();
                while let Some(dialog) = dialogs.next().await.map_err(|_| FetchError::Unavailable)? {
                    let peer = dialog.peer();
                    if peer.id().bare_id() == *id {
                        return Ok(PeerRef::from(peer));
                    }
                }
                Err(FetchError::Unavailable)
            }
        }
    }

    /// Download one media message and re-send it to the requesting chat.
    async fn fetch_single(
        &self,
        chat: PeerRef,
        request_id: i32,
        message: &Message,
        kind: Content,
        cancel: &CancellationToken,
    ) -> FetchResult<()> {
        // Size check only applies when a definite size is known up front.
        let size = classify::known_size(message);
        if let Err(rejection) = self.guard.check(size, self.premium) {
            self.reply(chat, request_id, &rejection.notice())
                .await
                .map_err(FetchError::Other)?;
            return Ok(());
        }

        let Some(media) = message.media() else {
            return Err(FetchError::Transfer(
                "media disappeared between classification and download".into(),
            ));
        };

        let status = self
            .reply(chat.clone(), request_id, "Downloading...")
            .await
            .map_err(FetchError::Other)?;
        let path = self.download_path(request_id, &artifact_name(message.id(), &media, kind));

        let result = self
            .transfer(
                chat.clone(),
                request_id,
                message.text(),
                &media,
                size,
                kind,
                &path,
                status.id(),
                cancel,
            )
            .await;

        // Cleanup runs no matter how the transfer ended.
        remove_artifact(&path).await;
        self.delete_status(chat, status.id()).await;

        result
    }

    /// Album fan-out: fetch every item sharing the post's grouped id and
    /// forward each one. The group fails only when no item was forwarded.
    async fn fetch_group(
        &self,
        chat: PeerRef,
        request_id: i32,
        post: &PostRef,
        message: &Message,
        cancel: &CancellationToken,
    ) -> FetchResult<()> {
        let Some(group_id) = message.grouped_id() else {
            return Err(FetchError::Transfer("album id disappeared".into()));
        };

        // Album items always live within a ten-message span of each other.
        let peer = self.resolve_channel(&post.channel).await?;
        let first = (post.msg_id - 9).max(1);
        let ids: Vec<i32> = (first..=post.msg_id.saturating_add(9)).collect();
        let items: Vec<Message> = self
            .user
            .client
            .get_messages_by_id(peer, &ids)
            .await
            .map_err(|_| FetchError::Unavailable)?
            .into_iter()
            .flatten()
            .filter(|m| m.grouped_id() == Some(group_id))
            .collect();

        let status = self
            .reply(chat.clone(), request_id, "Downloading album...")
            .await
            .map_err(FetchError::Other)?;

        let mut forwarded = 0usize;
        for item in &items {
            if cancel.is_cancelled() {
                self.delete_status(chat, status.id()).await;
                return Err(FetchError::Cancelled);
            }

            // Items report Grouped; the media kind alone decides dispatch.
            let Some(media) = item.media() else {
                continue;
            };
            let Some(kind) = classify::media_kind(&media) else {
                continue;
            };

            let size = classify::known_size(item);
            if self.guard.check(size, self.premium).is_err() {
                log::info!("Skipping album item {} over the size limit", item.id());
                continue;
            }

            let path = self.download_path(request_id, &artifact_name(item.id(), &media, kind));
            let result = self
                .transfer(
                    chat.clone(),
                    request_id,
                    item.text(),
                    &media,
                    size,
                    kind,
                    &path,
                    status.id(),
                    cancel,
                )
                .await;
            remove_artifact(&path).await;

            match result {
                Ok(()) => forwarded += 1,
                Err(FetchError::Cancelled) => {
                    self.delete_status(chat, status.id()).await;
                    return Err(FetchError::Cancelled);
                }
                Err(e) => log::error!("Album item {} failed: {e}", item.id()),
            }
        }

        self.delete_status(chat.clone(), status.id()).await;
        if forwarded == 0 {
            self.reply(chat, request_id, "Could not extract valid media from the group.")
                .await
                .map_err(FetchError::Other)?;
        }
        Ok(())
    }

    /// Download then re-upload. The caller owns cleanup of the artifact and
    /// the status message.
    #[allow(clippy::too_many_arguments)]
    async fn transfer(
        &self,
        chat: PeerRef,
        request_id: i32,
        caption: &str,
        media: &Media,
        total: u64,
        kind: Content,
        path: &Path,
        status_id: i32,
        cancel: &CancellationToken,
    ) -> FetchResult<()> {
        self.download_to(media, total, path, chat.clone(), status_id, cancel)
            .await?;
        log::info!("Downloaded media: {}", path.display());

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        self.send_media(chat, request_id, path, kind, caption).await
    }

    /// Chunked download with throttled progress edits on the status message.
    /// Cancellation is observed between chunks.
    async fn download_to(
        &self,
        media: &Media,
        total: u64,
        path: &Path,
        chat: PeerRef,
        status_id: i32,
        cancel: &CancellationToken,
    ) -> FetchResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::Transfer(e.to_string()))?;
        }
        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| FetchError::Transfer(e.to_string()))?;

        let mut progress = Progress::new("Downloading");
        let mut received: u64 = 0;
        let mut download = self.user.client.iter_download(media);

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            let chunk = match download.next().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => return Err(FetchError::Transfer(e.to_string())),
            };
            received += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::Transfer(e.to_string()))?;

            if let Some(text) = progress.tick(received, total) {
                // Best effort: a failed status edit never fails the transfer.
                self.edit_status(chat.clone(), status_id, &text).await;
            }
        }

        file.flush()
            .await
            .map_err(|e| FetchError::Transfer(e.to_string()))?;
        Ok(())
    }

    /// Re-send the local artifact to the requesting chat, tagged with the
    /// classified kind and the original caption.
    async fn send_media(
        &self,
        chat: PeerRef,
        request_id: i32,
        path: &Path,
        kind: Content,
        caption: &str,
    ) -> FetchResult<()> {
        let uploaded = self
            .bot
            .client
            .upload_file(path)
            .await
            .map_err(|e| FetchError::Transfer(format!("upload failed: {e}")))?;

        let input = InputMessage::new().text(caption).reply_to(Some(request_id));
        let input = match kind {
            Content::Photo => input.photo(uploaded),
            Content::Video => input.document(uploaded).attribute(Attribute::Video {
                supports_streaming: true,
                duration: Duration::ZERO,
                w: 0,
                h: 0,
                round_message: false,
            }),
            Content::Audio => input.document(uploaded).attribute(Attribute::Audio {
                duration: Duration::ZERO,
                title: None,
                performer: None,
            }),
            _ => input.document(uploaded),
        };

        self.bot
            .client
            .send_message(chat, input)
            .await
            .map_err(|e| FetchError::Transfer(format!("send failed: {e}")))?;
        Ok(())
    }

    fn download_path(&self, request_id: i32, name: &str) -> PathBuf {
        Path::new(&self.data_dir)
            .join("downloads")
            .join(request_id.to_string())
            .join(name)
    }
}

/// Local artifact name: the document's own name when it has one, otherwise a
/// kind-based fallback keyed by the source message id.
fn artifact_name(msg_id: i32, media: &Media, kind: Content) -> String {
    if let Media::Document(doc) = media {
        let name = sanitize_filename(doc.name());
        if !name.is_empty() {
            return name;
        }
    }
    match kind {
        Content::Photo => format!("photo-{msg_id}.jpg"),
        Content::Video => format!("video-{msg_id}.mp4"),
        Content::Audio => format!("audio-{msg_id}.mp3"),
        _ => format!("file-{msg_id}.bin"),
    }
}

/// Keep artifact names path-safe: no separators, no parent-dir tricks.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if matches!(c, '/' | '\\' | '\0') {
                '_'
            } else {
                c
            }
        })
        .collect();
    cleaned.trim().trim_matches('.').to_string()
}

/// Removing an artifact that was never created (or is already gone) is fine.
async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_filename("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_filename("  spaced  "), "spaced");
        assert_eq!(sanitize_filename(""), "");
    }

    #[tokio::test]
    async fn test_remove_artifact_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");

        tokio::fs::write(&path, b"data").await.unwrap();
        remove_artifact(&path).await;
        assert!(!path.exists());

        // Removing again (or a path that never existed) is a no-op.
        remove_artifact(&path).await;
        remove_artifact(&dir.path().join("never-created")).await;
    }
}
