//! NetScaler application extraction and AS3 conversion.
//!
//! The pipeline reads a device configuration (plain `ns.conf` or a `.tgz` /
//! `.tar` support bundle), extracts every virtual server together with what
//! is bound to it, and maps the result onto AS3 declarative objects.
//!
//! # Extraction
//!
//! - [`loader`]: classify and read inputs, archives in memory
//! - [`detect`]: dialect version banner and hostname
//! - [`explode`]: build the [`model::Explosion`], including content-switch
//!   references
//! - [`diagnostics`]: run-level findings collector
//! - [`rules`]: regex rules evaluated against each application's lines
//!
//! # Output
//!
//! - [`as3`]: declaration fragments, bulk merge, naming and mapping tables
//! - [`coverage`]: which options were mapped, ignored or left for review
//! - [`validate`]: seam for an external validation / dry-run service
//! - [`report`]: terminal and markdown rendering
//!
//! # Examples
//!
//! ```ignore
//! use ns2as3::as3::{build_bulk, BuildOptions};
//! use ns2as3::explode::explode;
//!
//! let explosion = explode("ns.conf".as_ref())?;
//! let bulk = build_bulk(explosion.apps(), &BuildOptions::default());
//! println!("converted {} of {}", bulk.succeeded, bulk.results.len());
//! ```
//!
//! Statement-level parsing lives in `nsconf-core`; everything that knows
//! about applications lives here.

pub mod as3;
pub mod coverage;
pub mod detect;
pub mod diagnostics;
pub mod explode;
pub mod loader;
pub mod model;
pub mod report;
pub mod rules;
pub mod validate;
