//! Identity resolution: users, bots, user groups and mention rewriting

pub mod display;
pub mod enrich;
pub mod resolver;
pub mod tokens;

pub use display::{bot_display_name, display_name_of, GROUP_PLACEHOLDER, UNKNOWN};
pub use enrich::{enrich_messages, snapshot_for, EnrichedMessage, IdentitySnapshot};
pub use resolver::IdentityResolver;
pub use tokens::GroupMention;
