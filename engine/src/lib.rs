//! # Historical Engine
//!
//! The deterministic core of the Historical configuration-tracking
//! pipeline.
//!
//! This crate holds every piece of pipeline logic that can be expressed
//! without IO: the canonical record model, the transport codec, the
//! structural diff that decides whether a change is material, and the
//! shrink protocol for size-constrained channels. The server crate wires
//! these into batch handlers with real stores and channels.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of tables, queues, or networks
//! - **Deterministic**: the same inputs always produce the same outputs
//! - **Testable**: pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`ResourceRecord`] is one point-in-time description of a cloud
//! resource: identity (`arn`), when it changed (`event_time`), the full
//! provider-side `configuration`, and provenance metadata. An empty
//! configuration map is a deletion tombstone.
//!
//! ### Codec
//!
//! Change-stream images arrive as type-tagged attribute maps. The
//! [`codec`] module decodes them into records (stripping store-internal
//! bookkeeping) and never lets the tagged shape leak further.
//!
//! ### Diffing
//!
//! [`diff::has_material_change`] compares two configurations structurally:
//! unordered for collections, with ephemeral paths excluded, pure and
//! deterministic. A `true` verdict is what earns a resource a new durable
//! revision.
//!
//! ### Shrinking
//!
//! [`shrink::prepare_for_transport`] keeps records under a channel's size
//! ceiling by stripping the configuration payload and marking the record
//! for later rehydration from a table.
//!
//! ## Quick Start
//!
//! ```rust
//! use historical_engine::diff::{has_material_change, EPHEMERAL_PATHS};
//! use serde_json::json;
//!
//! let previous = json!({"configuration": {"Grants": ["a", "b"], "_version": 1}});
//! let current = json!({"configuration": {"Grants": ["b", "a"], "_version": 2}});
//!
//! // Reordered collection + ephemeral bump: not a material change.
//! assert!(!has_material_change(&previous, &current, EPHEMERAL_PATHS));
//! ```

pub mod attribute;
pub mod codec;
pub mod diff;
pub mod envelope;
pub mod error;
pub mod event;
pub mod record;
pub mod shrink;

// Re-export main types at crate root
pub use attribute::{attrs_from_json, attrs_to_json, AttrMap, AttrValue};
pub use codec::TableShape;
pub use diff::{has_material_change, EPHEMERAL_PATHS};
pub use envelope::unwrap_envelope;
pub use error::Error;
pub use event::{classify, ChangeDetail, ChangeEvent, EventClass, SkipReason};
pub use record::ResourceRecord;
pub use shrink::{StreamData, StreamEventName, StreamRecord, DEFAULT_SIZE_LIMIT};

/// Type aliases for clarity
pub type Arn = String;
pub type AccountId = String;
pub type RegionName = String;
/// ISO-8601 UTC timestamp string; lexicographic order is chronological.
pub type EventTime = String;
pub type SchemaVersion = u32;
