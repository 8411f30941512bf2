//! Monitoring loop: pacing, per-session control task, channel tails and the public hub

pub mod engine;
pub mod hub;
pub mod pacing;
pub mod session;
pub mod tail;

pub use engine::{now_ts, InjectQueue, Monitor, TickOutcome};
pub use hub::{ChannelSummary, ConnectInfo, MonitorHub, DEFAULT_MESSAGE_LIMIT};
pub use pacing::{AdaptivePacer, Pace};
pub use session::{EventStream, Session, SessionState, Subscribers};
pub use tail::MessageStream;
