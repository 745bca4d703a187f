//! Wire format types for upstreams that do not speak the canonical schema
//!
//! Pure serde structs matching each upstream's JSON; only used at the
//! boundary.

pub mod bedrock;
