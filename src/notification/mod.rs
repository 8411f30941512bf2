//! Notification events and the test-injection samples

pub mod event;

pub use event::{local_time, sample_events, MentionReason, NotificationEvent, NotificationEventBuilder};
