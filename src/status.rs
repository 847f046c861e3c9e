//! RFC 959 reply codes used by the client.

// 1xx: Positive Preliminary Reply
pub const RESTART_MARKER: u32 = 110;
pub const ALREADY_OPEN: u32 = 125;
pub const ABOUT_TO_SEND: u32 = 150;

// 2xx: Positive Completion Reply
pub const COMMAND_OK: u32 = 200;
pub const COMMAND_NOT_IMPLEMENTED: u32 = 202;
pub const SYSTEM: u32 = 211;
pub const FILE: u32 = 213;
pub const HELP: u32 = 214;
pub const NAME: u32 = 215;
pub const READY: u32 = 220;
pub const CLOSING: u32 = 221;
pub const CLOSING_DATA_CONNECTION: u32 = 226;
pub const PASSIVE_MODE: u32 = 227;
pub const LOGGED_IN: u32 = 230;
pub const AUTH_OK: u32 = 234;
pub const REQUESTED_FILE_ACTION_OK: u32 = 250;
pub const PATH_CREATED: u32 = 257;

// 3xx: Positive intermediate Reply
pub const NEED_PASSWORD: u32 = 331;
pub const REQUEST_FILE_PENDING: u32 = 350;

// 4xx: Transient Negative Completion Reply
pub const NOT_AVAILABLE: u32 = 421;
pub const CANNOT_OPEN_DATA_CONNECTION: u32 = 425;
pub const TRANSFER_ABORTED: u32 = 426;

// 5xx: Permanent Negative Completion Reply
pub const BAD_COMMAND: u32 = 500;
pub const NOT_IMPLEMENTED: u32 = 502;
pub const FILE_UNAVAILABLE: u32 = 550;

/// First code of the negative completion range (4xx and 5xx).
pub const FIRST_NEGATIVE: u32 = 400;

/// 1xx, 2xx and 3xx replies count as success.
pub fn is_success(code: u32) -> bool {
    code < FIRST_NEGATIVE
}
