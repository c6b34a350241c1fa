//! # Feedsync Client
//!
//! State-synchronization core for the feed service: a typed client that
//! keeps locally materialized feed state converged with the server
//! under concurrent REST responses and push events.
//!
//! The pieces:
//! - [`FeedsClient`] and [`FeedHandle`]: one reactive state store per
//!   feed, shared push-event routing, echo suppression
//! - [`RequestExecutor`]: path templating, query serialization, auth
//!   injection, correlation ids, rate-limit metadata
//! - [`reconcile`]: pure per-entity functions applying push events to
//!   feed state, idempotent under at-least-once delivery
//! - [`Throttle`] / [`OwnFieldsBatcher`]: burst coalescing for the
//!   batched per-feed capability query
//!
//! The core is synchronous and transport-agnostic: HTTP goes through
//! the [`HttpClient`] trait, credentials through [`TokenProvider`], and
//! the push channel feeds events in via [`FeedsClient::handle_event`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod http;
mod ops;
mod request;
mod suppression;
mod throttle;
mod token;

pub mod reconcile;

pub use client::{FeedHandle, FeedsClient};
pub use config::{ClientConfig, InsertEdge};
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, MockHttpClient};
pub use ops::{
    add_comment, add_reaction, delete_comment, delete_reaction, follow, query_own_fields,
    read_feed, unfollow, ReadQuery,
};
pub use request::{ApiResponse, QueryValue, RateLimitInfo, RequestExecutor, ResponseMetadata};
pub use suppression::{follow_key, reaction_key, scoped_key, SuppressionQueue};
pub use throttle::{
    Clock, MockClock, OwnFieldsBatcher, SystemClock, Throttle, ThrottleOptions,
    MAX_OWN_FIELDS_BATCH,
};
pub use token::{StaticTokenProvider, TokenProvider, TOKEN_MAX_ATTEMPTS};
