//! Data models for Huddle

mod availability;
mod group;
mod ids;
mod invite;
mod member;
mod plan;

pub use availability::*;
pub use group::*;
pub use ids::*;
pub use invite::*;
pub use member::*;
pub use plan::*;

/// Display name used when a record carries none
pub const DEFAULT_DISPLAY_NAME: &str = "Someone";

pub(crate) fn default_display_name() -> String {
    DEFAULT_DISPLAY_NAME.to_string()
}

/// Trimmed display name, or the default when nothing is left
pub(crate) fn display_name_or_default(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        default_display_name()
    } else {
        trimmed.to_string()
    }
}
