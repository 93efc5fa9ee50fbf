//! sift-filter - Content filters over data samples
//!
//! ============================================================================
//! OVERVIEW
//! ============================================================================
//!
//! A content filter is a boolean predicate evaluated against every sample to
//! decide whether the sample crosses a reader or writer boundary. This crate
//! is the host-facing façade over the expression engine in `sift-expr`:
//!
//! - [`ContentFilter`] is the *description*: either an expression (SQL-like
//!   text plus ordered `?N` parameter values) or a plain callback tagged by
//!   which inputs it wants.
//! - [`Filter`] is the live per-reader/per-writer *instance* created from a
//!   description and a [`TopicDescriptor`]. For the expression variant it
//!   owns the parsed and the optimized expression, plus a *reduced* topic
//!   descriptor retaining only the keyed fields the expression actually
//!   references — so the per-sample work deserializes just those fields and
//!   skips the rest.
//!
//! LIFECYCLE:
//! ----------
//! ```text
//!   ContentFilter --create--> Filter --attach to reader/writer
//!                               |  update(new description)
//!                               |    same expression text: rebind + rebuild
//!                               |    otherwise: recreate
//!                               v
//!                    reader_accept(bytes, info) / writer_accept(sample)
//! ```
//!
//! A failed `create` installs nothing (the entity keeps accepting
//! everything); a failed `update` leaves the previous filter in place; a
//! failed `accept` rejects the sample and asserts in debug builds.
//!
//! THREADING:
//! ----------
//! One filter instance serves one reader or writer and relies on the host's
//! per-entity serialization of sample delivery; accept methods take
//! `&mut self` and there are no internal locks. Distinct instances are
//! independent and may run in parallel.

mod codec;
mod description;
mod descriptor;
mod error;
mod filter;
mod sample;

pub use codec::{encode_key_fields, KeyCodec};
pub use description::{
    ContentFilter, ExpressionFilter, FilterArg, FilterFn, FilterParam, FunctionFilter,
};
pub use descriptor::{FieldKind, KeyField, TopicDescriptor};
pub use error::FilterError;
pub use filter::{reader_accept, writer_accept, DomainId, Filter};
pub use sample::{DecodedSample, FieldValue, SampleInfo, SampleView};
