//! Live tail of a single channel
//!
//! Independent of the monitoring loop: a tail polls one channel's latest
//! page on a fixed period and forwards every new message, enriched, oldest
//! first. It ends when the consumer drops the stream or the owning session
//! closes.

use std::future::Future;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use super::engine::now_ts;
use crate::config::MonitorConfig;
use crate::identity::{enrich_messages, EnrichedMessage};
use crate::scanner::ScanContext;
use crate::slack::Message;

pub type MessageStream = UnboundedReceiverStream<EnrichedMessage>;

/// Start tailing `channel_id`; `closed` resolves when the session goes away
pub fn spawn_tail<F>(ctx: ScanContext, channel_id: &str, config: &MonitorConfig, closed: F) -> MessageStream
where
    F: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let channel_id = channel_id.to_string();
    let interval = config.channel_stream_interval();
    let retry = config.channel_stream_retry();
    let limit = config.channel_stream_limit;
    let mut last_ts = now_ts() - config.channel_stream_lookback_secs;

    tokio::spawn(async move {
        tokio::pin!(closed);
        debug!(account = %ctx.account.account_id, channel = %channel_id, since = last_ts, "Channel tail started");

        loop {
            let pause = match ctx.pool.run(ctx.api.history(&channel_id, Some(last_ts), limit)).await {
                Ok(page) => {
                    let (fresh, newest) = newer_than(page, last_ts);
                    last_ts = newest;
                    for message in enrich_messages(&ctx.resolver, fresh).await {
                        if tx.send(message).is_err() {
                            break;
                        }
                    }
                    interval
                }
                Err(e) => {
                    warn!(channel = %channel_id, error = %e, "Channel tail poll failed");
                    retry
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = tx.closed() => break,
                _ = &mut closed => break,
            }
        }

        debug!(account = %ctx.account.account_id, channel = %channel_id, "Channel tail closed");
    });

    UnboundedReceiverStream::new(rx)
}

/// Messages after `since`, oldest first, and the new high-water mark
fn newer_than(page: Vec<Message>, since: f64) -> (Vec<Message>, f64) {
    let mut fresh: Vec<Message> = page.into_iter().filter(|m| m.timestamp() > since).collect();
    fresh.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));
    let newest = fresh.last().map_or(since, Message::timestamp);
    (fresh, newest)
}
