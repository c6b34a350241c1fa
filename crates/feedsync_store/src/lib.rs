//! # Feedsync Store
//!
//! Reactive state container and typed event dispatcher.
//!
//! This crate provides:
//! - [`StateStore`]: a versioned value with synchronous writes and
//!   selector-scoped subscriptions
//! - [`EventDispatcher`]: kind-keyed publish/subscribe for push events,
//!   with per-handler panic isolation
//!
//! ## Key invariants
//!
//! - Writes commit synchronously; subscribers run synchronously after
//!   the commit, in subscription order
//! - Subscribers observe a snapshot taken at commit time, so a
//!   re-entrant write cannot corrupt an in-progress notification
//! - A write that leaves the value equal to the previous one does not
//!   notify
//! - One panicking event handler never prevents delivery to the rest

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dispatcher;
mod store;

pub use dispatcher::{EventDispatcher, HandlerId};
pub use store::{StateStore, Subscription};
