//! Mention detection and per-conversation scans

mod common;

use std::sync::Arc;

use common::{context, message, user, FakeApi, SELF_ID};
use slack_mention_monitor::classifier::{Priority, PriorityKeywords};
use slack_mention_monitor::notification::MentionReason;
use slack_mention_monitor::scanner::{
    detect_reason, list_activity, member_channels, scan_channel, scan_direct_messages, ActivityKind, ScanContext,
    ScanPolicy,
};
use slack_mention_monitor::slack::Channel;

fn watching(ctx: &ScanContext, ids: &[&str]) -> ScanContext {
    ctx.with_policy(Arc::new(ScanPolicy {
        watched_user_ids: ids.iter().map(|id| id.to_string()).collect(),
        ..ScanPolicy::default()
    }))
}

fn workspace() -> Arc<FakeApi> {
    let api = FakeApi::new();
    api.add_user(user(SELF_ID, "monitor", "Monitor Bot", ""));
    api.add_user(user("UALICE", "alice", "Alice Kim", ""));
    api.add_user(user("UBOB", "bob", "Bob Lee", ""));
    api.add_channel("C1", "general");
    api
}

fn general() -> Channel {
    Channel {
        id: "C1".into(),
        name: "general".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_detection_precedence() {
    let ctx = watching(&context(workspace()), &["UALICE"]);

    let direct = message("1.0", "UBOB", "<!here> <@UALICE> <@UBOT> look");
    assert_eq!(detect_reason(&ctx, &direct).await, Some(MentionReason::DirectMention));

    let broadcast = message("2.0", "UBOB", "<!channel> and <@UALICE>");
    assert_eq!(detect_reason(&ctx, &broadcast).await, Some(MentionReason::Broadcast));

    let plain_here = message("3.0", "UBOB", "@here standup in 5");
    assert_eq!(detect_reason(&ctx, &plain_here).await, Some(MentionReason::Broadcast));

    let watched = message("4.0", "UBOB", "ask <@UALICE>");
    assert_eq!(detect_reason(&ctx, &watched).await, Some(MentionReason::WatchedUser));

    let nothing = message("5.0", "UBOB", "ask <@UBOB>");
    assert_eq!(detect_reason(&ctx, &nothing).await, None);
}

#[tokio::test]
async fn test_own_messages_never_qualify() {
    let ctx = watching(&context(workspace()), &["UALICE"]);
    let own = message("1.0", SELF_ID, "<@UBOT> <!here> <@UALICE>");
    assert_eq!(detect_reason(&ctx, &own).await, None);
}

#[tokio::test]
async fn test_group_mention_with_empty_watch_list_fires() {
    let api = workspace();
    api.add_group("S1", "backend", &["UBOB"]);
    let ctx = context(api.clone());

    let msg = message("1.0", "UBOB", "<!subteam^S1|@backend> deploy is out");
    assert_eq!(
        detect_reason(&ctx, &msg).await,
        Some(MentionReason::GroupMention {
            handle: "backend".into()
        })
    );
    // inline handle, no directory lookup needed
    assert_eq!(api.count("usergroups.list"), 0);
}

#[tokio::test]
async fn test_group_mention_with_watched_member() {
    let api = workspace();
    api.add_group("S2", "ops", &["UBOB", "UALICE"]);
    let ctx = watching(&context(api.clone()), &["UALICE"]);

    let msg = message("1.0", "UBOB", "<!subteam^S2> rollout");
    assert_eq!(
        detect_reason(&ctx, &msg).await,
        Some(MentionReason::GroupMention { handle: "ops".into() })
    );
    assert_eq!(api.count("usergroups.list"), 1);
}

#[tokio::test]
async fn test_group_mention_with_self_member() {
    let api = workspace();
    api.add_group("S3", "oncall", &[SELF_ID]);
    let ctx = watching(&context(api), &["UALICE"]);

    let msg = message("1.0", "UBOB", "<!subteam^S3|@oncall> pager");
    assert_eq!(
        detect_reason(&ctx, &msg).await,
        Some(MentionReason::GroupMention {
            handle: "oncall".into()
        })
    );
}

#[tokio::test]
async fn test_unrelated_group_falls_through_to_watched_check() {
    let api = workspace();
    api.add_group("S4", "design", &["UBOB"]);
    let ctx = watching(&context(api), &["UALICE"]);

    let with_watched = message("1.0", "UBOB", "<!subteam^S4|@design> cc <@UALICE>");
    assert_eq!(detect_reason(&ctx, &with_watched).await, Some(MentionReason::WatchedUser));

    let without = message("2.0", "UBOB", "<!subteam^S4|@design> mockups");
    assert_eq!(detect_reason(&ctx, &without).await, None);
}

#[tokio::test]
async fn test_scan_channel_builds_events() {
    let api = workspace();
    api.post("C1", message("1001.000100", "UALICE", "<@UBOT> urgent fix needed"));
    api.post("C1", message("1002.000200", "UBOB", "lunch"));
    let ctx = context(api);

    let scan = scan_channel(ctx, general(), 1000.0).await;
    assert!(!scan.failed);
    assert_eq!(scan.channel_id, "C1");
    // the non-matching message still moves the local maximum
    assert_eq!(scan.local_max, 1002.0002);
    assert_eq!(scan.events.len(), 1);

    let event = &scan.events[0];
    assert_eq!(event.channel_name, "general");
    assert_eq!(event.channel_id, "C1");
    assert_eq!(event.sender_display_name, "Alice Kim");
    assert_eq!(event.text, "@Monitor Bot urgent fix needed");
    assert_eq!(event.ts, "1001.000100");
    assert_eq!(event.timestamp, 1001.0001);
    assert_eq!(event.reason, MentionReason::DirectMention);
    assert_eq!(event.reason_code(), "direct mention");
    assert_eq!(event.priority, Priority::Critical);
    assert_eq!(event.priority_reason, "keyword match: urgent");
    assert_eq!(
        event.permalink.as_deref(),
        Some("https://team.slack.com/archives/C1/p1001000100")
    );
}

#[tokio::test]
async fn test_scan_channel_events_oldest_first() {
    let api = workspace();
    api.post("C1", message("1003.0", "UBOB", "<!here> second"));
    api.post("C1", message("1001.0", "UBOB", "<!here> first"));
    let ctx = context(api);

    let scan = scan_channel(ctx, general(), 1000.0).await;
    let ts: Vec<_> = scan.events.iter().map(|e| e.ts.as_str()).collect();
    assert_eq!(ts, vec!["1001.0", "1003.0"]);
    assert_eq!(scan.local_max, 1003.0);
}

#[tokio::test]
async fn test_scan_uses_policy_keywords() {
    let api = workspace();
    api.post("C1", message("1001.0", "UBOB", "<@UBOT> Please REVIEW this"));
    let ctx = context(api).with_policy(Arc::new(ScanPolicy {
        keywords: PriorityKeywords {
            critical: vec![],
            high: vec!["review".into()],
            normal: vec![],
        },
        ..ScanPolicy::default()
    }));

    let scan = scan_channel(ctx, general(), 1000.0).await;
    assert_eq!(scan.events[0].priority, Priority::High);
    assert_eq!(scan.events[0].priority_reason, "keyword match: review");
}

#[tokio::test]
async fn test_failed_channel_keeps_since() {
    let api = workspace();
    api.fail_channel("C1");
    let ctx = context(api);

    let scan = scan_channel(ctx, general(), 1500.0).await;
    assert!(scan.failed);
    assert!(scan.events.is_empty());
    assert_eq!(scan.local_max, 1500.0);
}

#[tokio::test]
async fn test_empty_channel_keeps_since() {
    let ctx = context(workspace());
    let scan = scan_channel(ctx, general(), 1500.0).await;
    assert!(!scan.failed);
    assert_eq!(scan.local_max, 1500.0);
}

#[tokio::test]
async fn test_direct_message_scan() {
    let api = workspace();
    api.add_im("D1", "UALICE");
    api.add_im("D2", "UBOB");
    api.post("D1", message("1001.0", "UALICE", "got a minute?"));
    api.post("D1", message("1004.0", SELF_ID, "sure"));
    api.post("D2", message("999.0", "UBOB", "old news"));
    let ctx = context(api);

    let scan = scan_direct_messages(ctx, 1000.0).await;
    assert!(!scan.failed);
    assert_eq!(scan.events.len(), 1);
    // own reply is skipped but still counts toward the maximum
    assert_eq!(scan.local_max, 1004.0);

    let event = &scan.events[0];
    assert_eq!(event.channel_name, "DM from Alice Kim");
    assert_eq!(event.channel_id, "D1");
    assert_eq!(event.reason, MentionReason::DirectMessage);
    assert_eq!(event.reason_code(), "direct message");
}

#[tokio::test]
async fn test_member_channels_are_cached() {
    let api = workspace();
    let ctx = context(api.clone());

    let first = member_channels(&ctx).await.unwrap();
    let second = member_channels(&ctx).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(second[0].name, "general");
    assert_eq!(api.count("users.conversations"), 1);
}

#[tokio::test]
async fn test_activity_feed_newest_first() {
    let api = workspace();
    api.add_im("D1", "UALICE");
    api.post("C1", message("10.0", "UBOB", "<@UBOT> ping"));
    api.post("C1", message("11.0", "UBOB", "nothing to see"));
    api.post("C1", message("12.0", "UALICE", "@channel release"));
    api.post("D1", message("13.0", "UALICE", "hi"));
    let ctx = context(api);

    let items = list_activity(&ctx, 10).await.unwrap();
    let kinds: Vec<_> = items.iter().map(|i| i.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![ActivityKind::DirectMessage, ActivityKind::Broadcast, ActivityKind::Mention]
    );
    assert!(items[0].is_dm);
    assert_eq!(items[0].channel_name, "DM");
    assert_eq!(items[2].channel_name, "general");
    assert_eq!(items[2].message.display_text, "@Monitor Bot ping");

    let limited = list_activity(&ctx, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].kind, ActivityKind::DirectMessage);
}
