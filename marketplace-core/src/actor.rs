//! Actor-based concurrency for the ledger
//!
//! One Tokio task owns the `MarketplaceLedger`; every caller talks to it
//! through a cloneable `LedgerHandle`:
//! - Single writer, so operations apply in mailbox order
//! - Bounded mailbox gives backpressure
//! - Each request carries a oneshot reply channel
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox               │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │        MarketplaceLedger::register/acquire/...        │
//! └──────────────────────────────────────────────────────┘
//! ```

use crate::clock::BlockClock;
use crate::events::MarketEvent;
use crate::fees::Settlement;
use crate::ledger::MarketplaceLedger;
use crate::types::{ItemId, LedgerCounters, Listing, Principal};
use crate::{Error, Result};
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Register a listing
    RegisterContent {
        /// Asking price
        price: u64,
        /// Human-readable summary
        summary: String,
        /// Content type
        content_type: String,
        /// Secret disclosed to buyers
        access_token: String,
        /// Listing owner
        seller: Principal,
        /// Allocated id or rejection
        response: oneshot::Sender<Result<ItemId>>,
    },

    /// Book a purchase
    AcquireContent {
        /// Item to buy
        item_id: ItemId,
        /// Purchaser
        buyer: Principal,
        /// Outcome
        response: oneshot::Sender<Result<()>>,
    },

    /// Disclose an access token
    RetrieveAccessToken {
        /// Requested item
        item_id: ItemId,
        /// Caller claiming a purchase
        buyer: Principal,
        /// Token or rejection
        response: oneshot::Sender<Result<String>>,
    },

    /// Quote the fee split
    Quote {
        /// Listed item
        item_id: ItemId,
        /// Fee split at the current fee
        response: oneshot::Sender<Result<Settlement>>,
    },

    /// Get listing
    GetListing {
        /// Listed item
        item_id: ItemId,
        /// Listing, if registered
        response: oneshot::Sender<Option<Listing>>,
    },

    /// Get counters
    GetCounters {
        /// Counter snapshot
        response: oneshot::Sender<LedgerCounters>,
    },

    /// Drain the event journal
    DrainEvents {
        /// Events accepted since the last drain
        response: oneshot::Sender<Vec<MarketEvent>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
pub struct LedgerActor<C: BlockClock> {
    /// The ledger this task owns
    ledger: MarketplaceLedger<C>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl<C: BlockClock> LedgerActor<C> {
    /// Create new actor
    pub fn new(ledger: MarketplaceLedger<C>, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { ledger, mailbox }
    }

    /// Run the actor event loop until shutdown or all handles drop
    pub async fn run(mut self) -> MarketplaceLedger<C> {
        while let Some(msg) = self.mailbox.recv().await {
            if let LedgerMessage::Shutdown = msg {
                break;
            }
            self.handle_message(msg);
        }

        tracing::info!(
            listings = self.ledger.listing_count(),
            total_volume = self.ledger.counters().total_volume,
            "Ledger actor stopped"
        );

        self.ledger
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        // A dropped receiver means the caller gave up; nothing to do.
        match msg {
            LedgerMessage::RegisterContent {
                price,
                summary,
                content_type,
                access_token,
                seller,
                response,
            } => {
                let result = self.ledger.register_content(
                    price,
                    &summary,
                    &content_type,
                    &access_token,
                    &seller,
                );
                let _ = response.send(result);
            }

            LedgerMessage::AcquireContent {
                item_id,
                buyer,
                response,
            } => {
                let _ = response.send(self.ledger.acquire_content(item_id, &buyer));
            }

            LedgerMessage::RetrieveAccessToken {
                item_id,
                buyer,
                response,
            } => {
                let _ = response.send(self.ledger.retrieve_access_token(item_id, &buyer));
            }

            LedgerMessage::Quote { item_id, response } => {
                let _ = response.send(self.ledger.quote(item_id));
            }

            LedgerMessage::GetListing { item_id, response } => {
                let _ = response.send(self.ledger.listing(item_id).cloned());
            }

            LedgerMessage::GetCounters { response } => {
                let _ = response.send(*self.ledger.counters());
            }

            LedgerMessage::DrainEvents { response } => {
                let _ = response.send(self.ledger.drain_events());
            }

            LedgerMessage::Shutdown => {
                // Handled in run loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Register a listing
    pub async fn register_content(
        &self,
        price: u64,
        summary: impl Into<String>,
        content_type: impl Into<String>,
        access_token: impl Into<String>,
        seller: Principal,
    ) -> Result<ItemId> {
        let (summary, content_type, access_token) =
            (summary.into(), content_type.into(), access_token.into());
        self.request(|response| LedgerMessage::RegisterContent {
            price,
            summary,
            content_type,
            access_token,
            seller,
            response,
        })
        .await?
    }

    /// Book a purchase
    pub async fn acquire_content(&self, item_id: ItemId, buyer: Principal) -> Result<()> {
        self.request(|response| LedgerMessage::AcquireContent {
            item_id,
            buyer,
            response,
        })
        .await?
    }

    /// Disclose an access token
    pub async fn retrieve_access_token(&self, item_id: ItemId, buyer: Principal) -> Result<String> {
        self.request(|response| LedgerMessage::RetrieveAccessToken {
            item_id,
            buyer,
            response,
        })
        .await?
    }

    /// Quote the fee split
    pub async fn quote(&self, item_id: ItemId) -> Result<Settlement> {
        self.request(|response| LedgerMessage::Quote { item_id, response })
            .await?
    }

    /// Get listing
    pub async fn listing(&self, item_id: ItemId) -> Result<Option<Listing>> {
        self.request(|response| LedgerMessage::GetListing { item_id, response })
            .await
    }

    /// Get counters
    pub async fn counters(&self) -> Result<LedgerCounters> {
        self.request(|response| LedgerMessage::GetCounters { response })
            .await
    }

    /// Drain the event journal
    pub async fn drain_events(&self) -> Result<Vec<MarketEvent>> {
        self.request(|response| LedgerMessage::DrainEvents { response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
///
/// The returned join handle yields the ledger back once the actor stops.
pub fn spawn_ledger_actor<C: BlockClock + 'static>(
    ledger: MarketplaceLedger<C>,
    mailbox_capacity: usize,
) -> (LedgerHandle, tokio::task::JoinHandle<MarketplaceLedger<C>>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let actor = LedgerActor::new(ledger, rx);

    let join = tokio::spawn(actor.run());

    (LedgerHandle::new(tx), join)
}
