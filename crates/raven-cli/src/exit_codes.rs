//! Exit codes of the `raven` CLI.
//! These codes are part of the public contract; scripts branch on them.

pub const SUCCESS: i32 = 0;
pub const ERROR: i32 = 1; // Usage, I/O or configuration error
pub const MALFORMED: i32 = 2; // Token violates structural rules
pub const INVALID: i32 = 3; // Token fails a semantic, temporal or signature check
pub const KEY_NOT_FOUND: i32 = 4; // Token names an untrusted key id
pub const POLICY_DENIED: i32 = 5; // Valid response refused by the access policy
