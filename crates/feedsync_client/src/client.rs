//! The client: feed handle registry, push-event routing, and the
//! shared per-session services (dispatcher, suppression, batched
//! own-fields fetches).

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::{HttpClient, Method};
use crate::reconcile::{apply_event, ReconcileCtx};
use crate::request::{ApiResponse, RequestExecutor};
use crate::suppression::{follow_key, reaction_key, scoped_key, SuppressionQueue};
use crate::throttle::{Clock, OwnFieldsBatcher, SystemClock};
use crate::token::TokenProvider;
use feedsync_model::{EventKind, FeedEvent, FeedId, FeedState, OwnFieldsResponse, UserId};
use feedsync_store::{EventDispatcher, HandlerId, StateStore, Subscription};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Client for the feed service.
///
/// Owns one handle per feed (get-or-create by fid), the push-event
/// dispatcher, and the suppression and batching state for this session.
/// Cloning is cheap; clones share everything.
#[derive(Clone)]
pub struct FeedsClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) executor: Arc<RequestExecutor>,
    pub(crate) dispatcher: EventDispatcher,
    pub(crate) suppression: SuppressionQueue,
    pub(crate) connected_user: Option<UserId>,
    pub(crate) feeds: RwLock<HashMap<String, FeedHandle>>,
    /// Held for the whole batch fetch, including the HTTP call and the
    /// store notifications it triggers. Subscriber callbacks must not
    /// re-enter the own-fields path; the lock is not re-entrant.
    own_fields: Mutex<OwnFieldsBatcher>,
}

impl FeedsClient {
    /// Creates a client using wall-clock time for throttling.
    pub fn new(
        config: ClientConfig,
        connected_user: Option<UserId>,
        token_provider: Arc<dyn TokenProvider>,
        http: Arc<dyn HttpClient>,
    ) -> ClientResult<Self> {
        Self::with_clock(
            config,
            connected_user,
            token_provider,
            http,
            Arc::new(SystemClock),
        )
    }

    /// Creates a client with an injected clock.
    pub fn with_clock(
        config: ClientConfig,
        connected_user: Option<UserId>,
        token_provider: Arc<dyn TokenProvider>,
        http: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> ClientResult<Self> {
        let executor = Arc::new(RequestExecutor::new(
            &config.base_url,
            config.api_key.clone(),
            config.client_id.clone(),
            token_provider,
            http,
        )?);
        let window = config.own_fields_window;

        let inner = Arc::new_cyclic(|weak: &Weak<ClientInner>| {
            let fetch_client = weak.clone();
            let batcher = OwnFieldsBatcher::new(window, clock, move |fids| {
                fetch_own_fields(&fetch_client, fids)
            });
            ClientInner {
                config,
                executor,
                dispatcher: EventDispatcher::new(),
                suppression: SuppressionQueue::new(),
                connected_user,
                feeds: RwLock::new(HashMap::new()),
                own_fields: Mutex::new(batcher),
            }
        });

        Ok(Self { inner })
    }

    /// Returns the handle for a feed, creating it on first access.
    ///
    /// Handles are keyed by fid: asking for the same feed twice returns
    /// handles sharing one state store.
    pub fn feed(&self, group: &str, id: &str) -> FeedHandle {
        let fid = FeedId::new(group, id);
        let key = fid.fid();

        if let Some(handle) = self.inner.feeds.read().get(&key) {
            return handle.clone();
        }

        let mut feeds = self.inner.feeds.write();
        feeds
            .entry(key)
            .or_insert_with(|| FeedHandle {
                inner: Arc::new(HandleInner {
                    fid,
                    state: StateStore::default(),
                    client: Arc::downgrade(&self.inner),
                }),
            })
            .clone()
    }

    /// The user this session is authenticated as, when known.
    pub fn connected_user(&self) -> Option<&UserId> {
        self.inner.connected_user.as_ref()
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Registers a push-event handler for one event kind.
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&FeedEvent) + Send + Sync + 'static,
    ) -> HandlerId {
        self.inner.dispatcher.on(kind, handler)
    }

    /// Registers a wildcard push-event handler.
    pub fn on_all(&self, handler: impl Fn(&FeedEvent) + Send + Sync + 'static) -> HandlerId {
        self.inner.dispatcher.on_all(handler)
    }

    /// Removes one push-event handler.
    pub fn off(&self, id: HandlerId) -> bool {
        self.inner.dispatcher.off(id)
    }

    /// Feeds one push event through the client.
    ///
    /// The event is dispatched to registered handlers first, then
    /// reconciled into every registered handle it concerns. The handle
    /// that issued a marked local mutation discards its own echo; all
    /// other handles still apply the event.
    pub fn handle_event(&self, event: &FeedEvent) {
        self.inner.dispatcher.dispatch(event);

        for fid in event.feed_ids() {
            let handle = self.inner.feeds.read().get(&fid.fid()).cloned();
            if let Some(handle) = handle {
                handle.apply(event);
            }
        }
    }

    /// Fires a due own-fields batch, if any. Returns true when one fired.
    ///
    /// Trailing batches are driven by the owner: call this from a timer
    /// or event loop.
    pub fn tick_own_fields(&self) -> bool {
        self.inner.own_fields.lock().tick()
    }

    /// Fires any pending own-fields batch immediately.
    pub fn flush_own_fields(&self) -> bool {
        self.inner.own_fields.lock().flush()
    }
}

impl ClientInner {
    pub(crate) fn enqueue_own_fields(&self, fid: String) {
        self.own_fields.lock().enqueue([fid]);
    }
}

/// Issues one batched own-fields request and distributes capabilities
/// to the registered handles. Returns the fids the server confirmed; a
/// failed request confirms nothing, so the ids stay queued.
fn fetch_own_fields(client: &Weak<ClientInner>, fids: Vec<String>) -> Vec<String> {
    let Some(client) = client.upgrade() else {
        return Vec::new();
    };

    let body = serde_json::json!({ "fids": fids });
    let result: ClientResult<ApiResponse<OwnFieldsResponse>> =
        client
            .executor
            .send(Method::Post, "feeds/query-own-fields", &[], &[], Some(&body));

    match result {
        Ok(resp) => {
            // Handles are cloned out before any store write so subscriber
            // callbacks run without the registry lock held.
            let targets: Vec<(FeedHandle, Vec<String>)> = {
                let feeds = client.feeds.read();
                resp.body
                    .capabilities
                    .iter()
                    .filter_map(|(fid, caps)| {
                        feeds.get(fid).map(|handle| (handle.clone(), caps.clone()))
                    })
                    .collect()
            };
            for (handle, caps) in targets {
                handle.store().partial_update(|s| s.own_capabilities = caps);
            }
            resp.body.capabilities.keys().cloned().collect()
        }
        Err(error) => {
            tracing::warn!(%error, "own-fields query failed, ids stay queued");
            Vec::new()
        }
    }
}

/// The suppression key a push event would have been marked under, for
/// the mutation kinds that go through the suppression queue.
fn suppression_key(event: &FeedEvent) -> Option<String> {
    match event {
        FeedEvent::FollowCreated { follow, .. } | FeedEvent::FollowDeleted { follow, .. } => {
            match (follow.source_fid(), follow.target_fid()) {
                (Some(source), Some(target)) => Some(follow_key(source, target)),
                _ => None,
            }
        }
        FeedEvent::ReactionAdded { reaction, .. } | FeedEvent::ReactionDeleted { reaction, .. } => {
            Some(reaction_key(&reaction.activity_id, &reaction.kind))
        }
        _ => None,
    }
}

struct HandleInner {
    fid: FeedId,
    state: StateStore<FeedState>,
    client: Weak<ClientInner>,
}

/// Handle to one feed's locally materialized state.
///
/// Cheap to clone; clones share the same state store.
#[derive(Clone)]
pub struct FeedHandle {
    inner: Arc<HandleInner>,
}

impl FeedHandle {
    /// The feed this handle tracks.
    pub fn fid(&self) -> &FeedId {
        &self.inner.fid
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> FeedState {
        self.inner.state.get()
    }

    /// Notifies on every committed state change.
    pub fn subscribe(&self, callback: impl Fn(&FeedState) + Send + 'static) -> Subscription {
        self.inner.state.subscribe(callback)
    }

    /// Notifies only when `selector`'s output changes.
    pub fn subscribe_with_selector<S>(
        &self,
        selector: impl Fn(&FeedState) -> S + Send + 'static,
        callback: impl Fn(&S) + Send + 'static,
    ) -> Subscription
    where
        S: PartialEq + Clone + Send + 'static,
    {
        self.inner.state.subscribe_with_selector(selector, callback)
    }

    pub(crate) fn store(&self) -> &StateStore<FeedState> {
        &self.inner.state
    }

    pub(crate) fn client(&self) -> ClientResult<Arc<ClientInner>> {
        self.inner
            .client
            .upgrade()
            .ok_or_else(|| ClientError::unknown("client was dropped"))
    }

    pub(crate) fn reconcile_ctx(&self, client: &ClientInner) -> ReconcileCtx {
        ReconcileCtx {
            own_fid: self.inner.fid.clone(),
            connected_user: client.connected_user.clone(),
            insert_edge: client.config.insert_edge,
        }
    }

    /// Reconciles one push event into this handle's state.
    ///
    /// Watch mode gates only echo suppression: a watching handle that
    /// marked this operation discards the echo, every other handle
    /// reconciles. The store drops no-op commits, so an event that
    /// changes nothing stays silent.
    fn apply(&self, event: &FeedEvent) {
        let Some(client) = self.inner.client.upgrade() else {
            return;
        };

        if self.inner.state.with(|s| s.watch) {
            if let Some(key) = suppression_key(event) {
                if client
                    .suppression
                    .consume(&scoped_key(&self.inner.fid, &key))
                {
                    tracing::debug!(
                        fid = %self.inner.fid,
                        kind = ?event.kind(),
                        "discarding echo of local mutation"
                    );
                    return;
                }
            }
        }

        let ctx = self.reconcile_ctx(&client);
        self.inner.state.update(|s| apply_event(event, s, &ctx).data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockHttpClient;
    use crate::token::StaticTokenProvider;
    use feedsync_model::Activity;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client() -> FeedsClient {
        FeedsClient::new(
            ClientConfig::new("https://api.example.com", "key"),
            Some(UserId::new("jane")),
            Arc::new(StaticTokenProvider::new("tok")),
            Arc::new(MockHttpClient::new()),
        )
        .unwrap()
    }

    fn activity_added(fid: FeedId, id: &str) -> FeedEvent {
        FeedEvent::ActivityAdded {
            fid,
            activity: Activity::new(id, "bob"),
            created_at: None,
        }
    }

    #[test]
    fn feed_handles_are_shared_by_fid() {
        let client = client();
        let a = client.feed("user", "jane");
        let b = client.feed("user", "jane");

        a.store().partial_update(|s| s.watch = true);
        assert!(b.state().watch);

        let other = client.feed("user", "bob");
        assert!(!other.state().watch);
    }

    #[test]
    fn events_apply_to_every_registered_handle() {
        let client = client();
        let watching = client.feed("user", "jane");
        watching.store().partial_update(|s| s.watch = true);
        let passive = client.feed("user", "bob");

        client.handle_event(&activity_added(FeedId::new("user", "jane"), "a1"));
        client.handle_event(&activity_added(FeedId::new("user", "bob"), "a2"));

        // Watch mode gates suppression, not event application.
        assert_eq!(watching.state().activities.len(), 1);
        assert_eq!(passive.state().activities.len(), 1);
    }

    #[test]
    fn unregistered_feed_event_is_harmless() {
        let client = client();
        client.handle_event(&activity_added(FeedId::new("user", "nobody"), "a1"));
    }

    #[test]
    fn handlers_fire_before_state_routing() {
        let client = client();
        let handle = client.feed("user", "jane");
        handle.store().partial_update(|s| s.watch = true);

        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);
        client.on(EventKind::ActivityAdded, move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        });

        client.handle_event(&activity_added(FeedId::new("user", "jane"), "a1"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state().activities.len(), 1);
    }

    #[test]
    fn marked_echo_is_discarded_once() {
        let client = client();
        let handle = client.feed("user", "jane");
        handle.store().partial_update(|s| s.watch = true);

        client.inner.suppression.mark(scoped_key(
            &FeedId::new("user", "jane"),
            &reaction_key("a1", "like"),
        ));
        // A placeholder activity so a reaction has somewhere to land.
        handle
            .store()
            .partial_update(|s| s.activities.push(Activity::new("a1", "bob")));

        let event = FeedEvent::ReactionAdded {
            fid: FeedId::new("user", "jane"),
            reaction: feedsync_model::Reaction {
                activity_id: "a1".into(),
                kind: "like".into(),
                user: UserId::new("jane"),
                score: 1,
                created_at: None,
                custom: serde_json::Value::Null,
            },
            created_at: None,
        };

        // First delivery is the echo: suppressed.
        client.handle_event(&event);
        assert!(handle.state().activities[0].latest_reactions.is_empty());

        // A genuine later delivery applies.
        client.handle_event(&event);
        assert_eq!(handle.state().activities[0].latest_reactions.len(), 1);
    }

    #[test]
    fn suppressed_events_still_reach_handlers() {
        let client = client();
        let handle = client.feed("user", "jane");
        handle.store().partial_update(|s| {
            s.watch = true;
            s.activities.push(Activity::new("a1", "bob"));
        });

        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);
        client.on_all(move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        });

        client.inner.suppression.mark(scoped_key(
            &FeedId::new("user", "jane"),
            &reaction_key("a1", "like"),
        ));
        client.handle_event(&FeedEvent::ReactionAdded {
            fid: FeedId::new("user", "jane"),
            reaction: feedsync_model::Reaction {
                activity_id: "a1".into(),
                kind: "like".into(),
                user: UserId::new("jane"),
                score: 1,
                created_at: None,
                custom: serde_json::Value::Null,
            },
            created_at: None,
        });

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        // The echo was discarded before reaching the store.
        assert!(handle.state().activities[0].latest_reactions.is_empty());
    }
}
