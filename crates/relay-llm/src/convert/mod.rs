//! Conversion between canonical types and upstream wire formats

pub mod bedrock;
