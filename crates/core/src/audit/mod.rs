//! Audit/telemetry emission.
//!
//! Every authorization and entitlement decision in the core is recorded as
//! an immutable [`SecurityEvent`] and handed to the [`AuditEmitter`], which
//! forwards it to an append-only [`AuditSink`] without ever gating the
//! primary operation. Internal detail (which query, which tenant mismatch)
//! lives only here, never in response bodies.

mod emitter;
mod event;

pub use emitter::{AuditEmitter, AuditSink, InMemoryAuditSink};
pub use event::{AuditAction, AuditOutcome, SecurityEvent, Severity};
