//! Batch-range controller: walk an inclusive id range in fixed windows,
//! dispatching a fetch per post and waiting for each window to settle before
//! starting the next.

use std::sync::Arc;

use grammers_session::defs::PeerRef;

use super::App;
use crate::classify::{self, Content};
use crate::link::{ChannelRef, PostRef};
use crate::tasks::TaskGuard;

pub(crate) const WINDOW_SIZE: i32 = 10;

/// Outcome tally for a finished range.
///
/// "Downloaded" counts posts that were dispatched and ran to completion,
/// whether or not the individual fetch succeeded; per-post failures are
/// reported inline in the chat as they happen.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BatchReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }

    pub fn render(&self) -> String {
        format!(
            "Batch complete!\nDownloaded: {}\nSkipped: {}\nFailed: {}",
            self.downloaded, self.skipped, self.failed
        )
    }
}

/// Partition an inclusive id range into inclusive windows of at most
/// `window` ids each.
pub(crate) fn windows(start: i32, end: i32, window: i32) -> Vec<(i32, i32)> {
    let mut out = Vec::new();
    let mut lo = start;
    while lo <= end {
        let hi = lo.saturating_add(window - 1).min(end);
        out.push((lo, hi));
        if hi == end {
            break;
        }
        lo = hi + 1;
    }
    out
}

/// Dispatch decision for one resolved id. A post that no longer exists
/// (deleted ids are routine inside ranges) is skipped, like a post with no
/// usable content; only lookup errors count as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Run,
    Skip,
}

fn dispatch_for(content: Option<Content>) -> Dispatch {
    match content {
        None => Dispatch::Skip,
        Some(c) if c.is_empty() => Dispatch::Skip,
        Some(_) => Dispatch::Run,
    }
}

fn final_notice(cancelled: bool, report: &BatchReport) -> String {
    if cancelled {
        format!("Batch cancelled after {} posts.", report.downloaded)
    } else {
        report.render()
    }
}

impl App {
    pub(crate) async fn run_batch(
        self: &Arc<Self>,
        chat: PeerRef,
        request_id: i32,
        channel: ChannelRef,
        start_id: i32,
        end_id: i32,
        guard: TaskGuard,
    ) {
        let cancel = guard.token().clone();
        log::info!("Batch {channel}: posts {start_id}-{end_id}");

        let loading = match self
            .reply(
                chat.clone(),
                request_id,
                &format!("Downloading posts {start_id}-{end_id}..."),
            )
            .await
        {
            Ok(msg) => msg,
            Err(e) => {
                log::error!("Batch could not post its status message: {e:#}");
                return;
            }
        };

        let mut report = BatchReport::default();

        'range: for (lo, hi) in windows(start_id, end_id, WINDOW_SIZE) {
            let mut handles = Vec::new();
            for msg_id in lo..=hi {
                // /killall can land between resolutions; stop dispatching
                // the moment it does.
                if cancel.is_cancelled() {
                    break 'range;
                }

                let post = PostRef {
                    channel: channel.clone(),
                    msg_id,
                };
                match self.resolve_post(&post).await {
                    Err(e) => {
                        log::error!("Batch post {channel}/{msg_id} unavailable: {e}");
                        report.failed += 1;
                    }
                    Ok(resolved) => {
                        match dispatch_for(resolved.as_ref().map(classify::classify)) {
                            Dispatch::Skip => report.skipped += 1,
                            Dispatch::Run => {
                                let app = Arc::clone(self);
                                let chat = chat.clone();
                                // Child token: cancelling the batch cancels
                                // every fetch it dispatched.
                                let task_guard = self.registry.register_child(&cancel);
                                handles.push(tokio::spawn(async move {
                                    app.fetch_known_post(chat, request_id, post, task_guard)
                                        .await;
                                }));
                            }
                        }
                    }
                }
            }

            if handles.is_empty() {
                continue;
            }
            let dispatched = handles.len();

            // One window at a time; the next only starts once this one has
            // fully settled.
            tokio::select! {
                _ = cancel.cancelled() => break 'range,
                _ = futures::future::join_all(handles) => {
                    report.downloaded += dispatched;
                }
            }
        }

        self.delete_status(chat.clone(), loading.id()).await;
        let _ = self
            .reply(
                chat,
                request_id,
                &final_notice(cancel.is_cancelled(), &report),
            )
            .await;
        log::info!(
            "Batch {channel} finished: {} downloaded, {} skipped, {} failed ({} total)",
            report.downloaded,
            report.skipped,
            report.failed,
            report.total()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_window_range() {
        assert_eq!(windows(100, 104, 10), vec![(100, 104)]);
    }

    #[test]
    fn test_window_partitioning() {
        assert_eq!(
            windows(1, 25, 10),
            vec![(1, 10), (11, 20), (21, 25)]
        );
        assert_eq!(windows(5, 5, 10), vec![(5, 5)]);
        assert_eq!(windows(10, 9, 10), Vec::<(i32, i32)>::new());
    }

    #[test]
    fn test_windows_near_id_ceiling() {
        assert_eq!(
            windows(i32::MAX - 5, i32::MAX, 10),
            vec![(i32::MAX - 5, i32::MAX)]
        );
        assert_eq!(
            windows(i32::MAX - 12, i32::MAX, 10),
            vec![(i32::MAX - 12, i32::MAX - 3), (i32::MAX - 2, i32::MAX)]
        );
    }

    #[test]
    fn test_absent_posts_skip_instead_of_fail() {
        // Deleted posts resolve to no message; they must land in the
        // skipped count, not the failed one.
        assert_eq!(dispatch_for(None), Dispatch::Skip);
        assert_eq!(dispatch_for(Some(Content::Empty)), Dispatch::Skip);
        assert_eq!(dispatch_for(Some(Content::Photo)), Dispatch::Run);
        assert_eq!(dispatch_for(Some(Content::Grouped)), Dispatch::Run);
        assert_eq!(dispatch_for(Some(Content::Text)), Dispatch::Run);
    }

    #[test]
    fn test_final_notice_reports_cancellation() {
        let report = BatchReport {
            downloaded: 7,
            skipped: 2,
            failed: 0,
        };
        assert_eq!(final_notice(true, &report), "Batch cancelled after 7 posts.");
        assert!(final_notice(false, &report).starts_with("Batch complete!"));
    }

    #[test]
    fn test_report_tally() {
        let report = BatchReport {
            downloaded: 3,
            skipped: 1,
            failed: 1,
        };
        assert_eq!(report.total(), 5);
        let rendered = report.render();
        assert!(rendered.contains("Downloaded: 3"));
        assert!(rendered.contains("Skipped: 1"));
        assert!(rendered.contains("Failed: 1"));
    }
}
