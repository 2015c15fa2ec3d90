//! Shared utility modules used across Segdex components.

pub mod varint;
