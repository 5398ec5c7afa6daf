//! Router Module Index
//!
//! Routes are grouped by the guard chain they sit behind. Every protected
//! group is wrapped in `guards::authenticate` by `create_router`; the role
//! guards are attached here, next to the paths they protect, so the access
//! rule for an endpoint can be read off its route definition.

/// Routes reachable without a token.
pub mod public;

/// Routes open to any authenticated, active user.
pub mod authenticated;

/// `/admin`: reads need moderator, mutations need admin.
pub mod admin;

/// Aptitude, core concept and notification management: content manager.
pub mod content;
