//! # Taskdock Shared Library
//!
//! Core building blocks shared by the Taskdock API server:
//!
//! - `auth`: JWT issuance/verification and Argon2id password hashing
//! - `models`: User and Task domain models
//! - `store`: record store traits plus Postgres and in-memory backends
//! - `blob`: blob store abstraction with a disk-backed implementation
//! - `upload`: intake screening for uploaded files (type, size, count)
//! - `attachments`: attachment lifecycle orchestration (store, link, detach, cascade)

pub mod attachments;
pub mod auth;
pub mod blob;
pub mod models;
pub mod store;
pub mod upload;
