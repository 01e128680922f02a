//! Domain core for Thrive: records, localization rules, badge evaluation and
//! the realtime event bus.

#[macro_use]
mod macros;

pub mod badges;
pub mod error;
pub mod events;
pub mod locale;
pub mod model;
pub mod time;

pub use self::badges::{ActivitySnapshot, BadgeCriterion, BadgeDefinition, UserBadge};
pub use self::error::{CoreError, Result};
pub use self::events::{EventBroadcaster, RealtimeEvent, RealtimeEventKind};
pub use self::time::{now_utc, parse_rfc3339, to_rfc3339};
