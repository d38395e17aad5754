//! # receipt-store: Work Queue and Receipt Store
//!
//! This crate provides the two shared resources of the submission pipeline:
//! a FIFO work queue of `(id, receipt)` entries and a key/value store of
//! processed receipts.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Receipt Processor Data Flow                         │
//! │                                                                         │
//! │  submit(receipt)                             retrieve(id)               │
//! │       │                                           ▲                     │
//! │       ▼                                           │                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 receipt-store (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   worker    ┌───────────────┐              │   │
//! │  │   │   WorkQueue   │ ──────────► │ ReceiptStore  │              │   │
//! │  │   │  (queue.rs)   │  dequeue →  │  (store.rs)   │              │   │
//! │  │   │               │    put      │               │              │   │
//! │  │   │ MemoryQueue   │             │ MemoryStore   │              │   │
//! │  │   │ RedisQueue    │             │ RedisStore    │              │   │
//! │  │   └───────────────┘             └───────────────┘              │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Redis (optional)                                               │   │
//! │  │   LIST   <queueName>                 ← LPUSH / BRPOP            │   │
//! │  │   STRING <storeNamespace>:<id>       ← SET / GET                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`queue`] - `WorkQueue` trait and the in-memory queue
//! - [`store`] - `ReceiptStore` trait and the in-memory store
//! - [`broker`] - Redis-backed queue and store
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use receipt_store::{MemoryQueue, MemoryStore, WorkQueue, ReceiptStore};
//!
//! let queue = MemoryQueue::new("receipt_task_queue");
//! let store = MemoryStore::new("receipts");
//!
//! queue.enqueue(QueueEntry::new(id, receipt)).await?;
//! let entry = queue.dequeue().await?;
//! store.put(entry.id, &entry.receipt).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod broker;
pub mod error;
pub mod queue;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use broker::{RedisBroker, RedisConfig, RedisQueue, RedisStore};
pub use error::{StoreError, StoreResult};
pub use queue::{MemoryQueue, WorkQueue};
pub use store::{store_key, MemoryStore, ReceiptStore};
