//! Proposer: drives prepare/accept rounds against a majority of acceptors
//!
//! A round fans out to every known acceptor as spawned tasks and returns as
//! soon as the phase is decided. Replies arriving after that are dropped
//! together with the channel; the requests themselves are not cancelled.

use std::cmp::Ordering::{Equal, Greater, Less};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ProposerConfig;
use crate::counter::CounterStore;
use crate::error::{BoxError, ProposeError, TransportError};
use crate::quorum::{QuorumOutcome, QuorumTally};
use crate::{AcceptorId, AcceptorState, Ballot, ProposerId, Transport};

type Reply = (AcceptorId, Result<AcceptorState, TransportError>);

/// Drives consensus rounds for any key.
///
/// The acceptor list is copy-on-write: membership changes swap in a new list
/// and every round works on the snapshot it loaded when it started.
#[derive(Debug)]
pub struct Proposer {
    id: ProposerId,
    config: ProposerConfig,
    counter: AtomicU64,
    acceptors: ArcSwap<Vec<Arc<dyn Transport>>>,
    counter_store: Option<Arc<dyn CounterStore>>,
}

impl Proposer {
    /// Creates a new `Proposer` with a counter starting at zero.
    #[must_use]
    pub fn new(id: ProposerId, config: ProposerConfig) -> Self {
        Self {
            id,
            config,
            counter: AtomicU64::new(0),
            acceptors: ArcSwap::from_pointee(Vec::new()),
            counter_store: None,
        }
    }

    /// Creates a `Proposer` whose counter is restored from, and written ahead
    /// to, `counter_store`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the counter cannot be loaded.
    pub async fn restore(
        id: ProposerId,
        config: ProposerConfig,
        counter_store: Arc<dyn CounterStore>,
    ) -> Result<Self, BoxError> {
        let counter = counter_store.load().await?;
        debug!(proposer = id, counter, "restored ballot counter");

        Ok(Self {
            counter: AtomicU64::new(counter),
            counter_store: Some(counter_store),
            ..Self::new(id, config)
        })
    }

    /// The proposer's id, stamped into every ballot it mints.
    pub const fn id(&self) -> ProposerId {
        self.id
    }

    /// The last counter value minted or observed.
    pub fn counter(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// The proposer's configuration.
    pub const fn config(&self) -> &ProposerConfig {
        &self.config
    }

    /// Snapshot of the acceptors the next round will use.
    pub fn acceptors(&self) -> Arc<Vec<Arc<dyn Transport>>> {
        self.acceptors.load_full()
    }

    /// Adds `transport` unless an acceptor with the same id is already known.
    /// Returns whether it was added.
    pub fn add_acceptor(&self, transport: Arc<dyn Transport>) -> bool {
        self.add_acceptors([transport]) == 1
    }

    /// Adds every transport whose acceptor is not yet known, keeping the
    /// first transport seen for each acceptor. Returns how many were added.
    pub fn add_acceptors<I>(&self, transports: I) -> usize
    where
        I: IntoIterator<Item = Arc<dyn Transport>>,
    {
        let transports: Vec<_> = transports.into_iter().collect();
        let mut added = 0;

        self.acceptors.rcu(|current| {
            let mut next = Vec::clone(current);
            added = 0;
            for transport in &transports {
                let id = transport.acceptor_id();
                if next.iter().all(|known| known.acceptor_id() != id) {
                    next.push(Arc::clone(transport));
                    added += 1;
                }
            }
            next
        });

        added
    }

    /// Removes the acceptor with `id`. Returns whether it was known.
    pub fn remove_acceptor(&self, id: AcceptorId) -> bool {
        let mut removed = false;

        self.acceptors.rcu(|current| {
            let next: Vec<_> = current
                .iter()
                .filter(|known| known.acceptor_id() != id)
                .cloned()
                .collect();
            removed = next.len() != current.len();
            next
        });

        removed
    }

    /// Runs one round on `key`: reads the current value from a majority,
    /// applies `change` to it and makes a majority accept the result.
    ///
    /// The current value is empty bytes when no acceptor ever accepted one.
    /// Returns the committed value.
    ///
    /// # Errors
    ///
    /// - `InsufficientAcceptors` if fewer than `min_acceptors` are known
    /// - `BallotExhausted` if the counter cannot advance any further
    /// - `CounterStore` if the new ballot cannot be persisted
    /// - `PrepareQuorum` / `AcceptQuorum` if a phase misses its majority
    /// - `ChangeFunction` if `change` fails
    /// - `ConflictingState` if two promises disagree under one ballot
    ///
    /// After an `AcceptQuorum` failure the value may or may not be committed;
    /// the next round on the key settles it.
    pub async fn propose<K, F, E>(&self, key: K, change: F) -> Result<Bytes, ProposeError>
    where
        K: Into<Bytes>,
        F: FnOnce(&[u8], Bytes) -> Result<Bytes, E> + Send,
        E: Into<BoxError>,
    {
        let key = key.into();
        let acceptors = self.acceptors();

        let required = self.config.min_acceptors.max(1);
        if acceptors.len() < required {
            warn!(
                proposer = self.id,
                known = acceptors.len(),
                required,
                "not enough acceptors to run a round"
            );
            return Err(ProposeError::InsufficientAcceptors {
                known: acceptors.len(),
                required,
            });
        }

        let ballot = self.next_ballot().await?;
        debug!(proposer = self.id, %ballot, key_len = key.len(), "starting round");

        let current = self.prepare_phase(&acceptors, ballot, &key).await?;

        let new_state =
            change(&key[..], current).map_err(|e| ProposeError::ChangeFunction(e.into()))?;

        self.accept_phase(&acceptors, ballot, &key, new_state.clone())
            .await?;

        info!(proposer = self.id, %ballot, key_len = key.len(), "round committed");
        Ok(new_state)
    }

    async fn next_ballot(&self) -> Result<Ballot, ProposeError> {
        let exhausted = || {
            warn!(proposer = self.id, "ballot counter exhausted");
            ProposeError::BallotExhausted { proposer: self.id }
        };

        let last = self
            .counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_add(1))
            .map_err(|_| exhausted())?;
        let ballot = Ballot::next(self.id, last).ok_or_else(exhausted)?;

        if let Some(counter_store) = &self.counter_store {
            counter_store
                .persist(ballot.counter)
                .await
                .map_err(ProposeError::CounterStore)?;
        }

        Ok(ballot)
    }

    /// Fast-forward past a competing ballot so the next round can outrank it.
    fn observe(&self, seen: Ballot) {
        let target = seen.counter_to_outrank(self.id);
        let previous = self.counter.fetch_max(target, Ordering::SeqCst);
        if target > previous {
            debug!(proposer = self.id, from = previous, to = target, "counter fast-forwarded");
        }
    }

    async fn prepare_phase(
        &self,
        acceptors: &[Arc<dyn Transport>],
        ballot: Ballot,
        key: &Bytes,
    ) -> Result<Bytes, ProposeError> {
        let mut replies = self.broadcast(acceptors, |transport| {
            let key = key.clone();
            async move { transport.prepare(ballot, key).await }
        });

        let mut tally = QuorumTally::new(acceptors.len());
        let mut newest: Option<AcceptorState> = None;

        while let Some((acceptor, reply)) = replies.recv().await {
            match reply {
                Ok(reply) if reply.is_promise_for(ballot) => {
                    debug!(
                        proposer = self.id,
                        acceptor,
                        %ballot,
                        accepted = %reply.ballot,
                        "promise"
                    );
                    tally.grant();
                    newest = Some(match newest.take() {
                        Some(best) => pick_newest(best, reply)?,
                        None => reply,
                    });
                }
                Ok(reply) => {
                    debug!(
                        proposer = self.id,
                        acceptor,
                        %ballot,
                        promised = %reply.ballot,
                        "prepare rejected"
                    );
                    tally.reject();
                    self.observe(reply.ballot);
                }
                Err(e) => {
                    warn!(proposer = self.id, acceptor, %ballot, "prepare failed: {}", e);
                    tally.fail();
                }
            }

            match tally.outcome() {
                QuorumOutcome::Pending => {}
                QuorumOutcome::Reached => {
                    return Ok(newest.map(|s| s.state).unwrap_or_default());
                }
                QuorumOutcome::Unreachable => break,
            }
        }

        warn!(
            proposer = self.id,
            %ballot,
            promised = tally.granted(),
            rejected = tally.rejected(),
            failed = tally.failed(),
            "prepare quorum not reached"
        );
        Err(ProposeError::PrepareQuorum {
            promised: tally.granted(),
            required: tally.quorum(),
            rejected: tally.rejected(),
            failed: tally.failed(),
        })
    }

    async fn accept_phase(
        &self,
        acceptors: &[Arc<dyn Transport>],
        ballot: Ballot,
        key: &Bytes,
        state: Bytes,
    ) -> Result<(), ProposeError> {
        let mut replies = self.broadcast(acceptors, |transport| {
            let key = key.clone();
            let state = state.clone();
            async move { transport.accept(ballot, key, state).await }
        });

        let mut tally = QuorumTally::new(acceptors.len());

        while let Some((acceptor, reply)) = replies.recv().await {
            match reply {
                Ok(reply) if reply.is_ack_for(ballot) => {
                    debug!(proposer = self.id, acceptor, %ballot, "accepted");
                    tally.grant();
                }
                Ok(reply) => {
                    debug!(
                        proposer = self.id,
                        acceptor,
                        %ballot,
                        promised = %reply.ballot,
                        "accept rejected"
                    );
                    tally.reject();
                    self.observe(reply.ballot);
                }
                Err(e) => {
                    warn!(proposer = self.id, acceptor, %ballot, "accept failed: {}", e);
                    tally.fail();
                }
            }

            match tally.outcome() {
                QuorumOutcome::Pending => {}
                QuorumOutcome::Reached => return Ok(()),
                QuorumOutcome::Unreachable => break,
            }
        }

        warn!(
            proposer = self.id,
            %ballot,
            acknowledged = tally.granted(),
            rejected = tally.rejected(),
            failed = tally.failed(),
            "accept quorum not reached"
        );
        Err(ProposeError::AcceptQuorum {
            acknowledged: tally.granted(),
            required: tally.quorum(),
            rejected: tally.rejected(),
            failed: tally.failed(),
        })
    }

    /// Spawns one request per acceptor and returns the channel their replies
    /// arrive on, in completion order.
    fn broadcast<F, Fut>(
        &self,
        acceptors: &[Arc<dyn Transport>],
        request: F,
    ) -> mpsc::Receiver<Reply>
    where
        F: Fn(Arc<dyn Transport>) -> Fut,
        Fut: Future<Output = Result<AcceptorState, TransportError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(acceptors.len().max(1));
        let timeout = self.config.request_timeout;

        for transport in acceptors {
            let acceptor = transport.acceptor_id();
            let pending = request(Arc::clone(transport));
            let tx = tx.clone();

            tokio::spawn(async move {
                let reply = match timeout {
                    Some(limit) => tokio::time::timeout(limit, pending)
                        .await
                        .unwrap_or(Err(TransportError::Timeout(limit))),
                    None => pending.await,
                };

                // The round may already be decided and the receiver gone
                let _ = tx.send((acceptor, reply)).await;
            });
        }

        rx
    }
}

/// Keeps the promise with the greater ballot. Equal ballots must carry equal
/// values since a ballot is only ever used by one proposer for one value.
fn pick_newest(best: AcceptorState, reply: AcceptorState) -> Result<AcceptorState, ProposeError> {
    match reply.ballot.cmp(&best.ballot) {
        Greater => Ok(reply),
        Less => Ok(best),
        Equal if reply.state == best.state => Ok(best),
        Equal => Err(ProposeError::ConflictingState {
            ballot: reply.ballot,
        }),
    }
}
