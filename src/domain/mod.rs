//! Shared data model layer (structs/constants only).
//!
//! ## Purpose
//! - Keep record/report structs in one place.
//! - Avoid cyclic imports and duplicated type definitions.
//! - Make evidence document schema changes explicit and reviewable.
//!
//! ## Files
//! - `models.rs`: service records, phase results, verdict and report structs.
//! - `documents.rs`: per-slot evidence payload schemas.
//! - `constants.rs`: slot names, default thresholds and timeouts.
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem/network side effects.
//!
//! ## Compatibility note
//! Every payload struct is `#[serde(default)]`: unknown fields are ignored and
//! absent fields take the type's default. Changing a default changes how older
//! evidence is read, so keep such changes explicit and synchronized with
//! `docs/contracts/*`.

pub mod constants;
pub mod documents;
pub mod models;
