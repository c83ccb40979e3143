//! Crate-wide constants.

/// Application name, used for the state directory.
pub const APP_NAME: &str = "tgsync";

/// Maximum number of tags a single target group may carry.
pub const MAX_TAGS_PER_TARGET_GROUP: usize = 50;

/// Maximum length of a target group name.
pub const MAX_TARGET_GROUP_NAME_LEN: usize = 32;

/// Title of the console link surfaced in invocation outputs.
pub const CONSOLE_LINK_TITLE: &str = "Target Group";
