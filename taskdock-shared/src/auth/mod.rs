//! Authentication primitives
//!
//! - `jwt`: stateless access tokens (HS256, 7-day default TTL)
//! - `password`: Argon2id password hashing and verification

pub mod jwt;
pub mod password;
