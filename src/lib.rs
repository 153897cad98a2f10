//! # Unit Linker (Native Driver Core)
//!
//! Cross-unit naming state for a source-to-source compiler whose output runs
//! on a JavaScript runtime. Parsing and code generation are collaborators
//! behind [`SourceParser`] and [`CodeGenerator`]; this crate owns what glues
//! independently compiled units into one program.
//!
//! ## Ground Truth
//!
//! 1. **Interning**: every method / instance-variable name maps to one short
//!    id (`a`, `b`, ..., `z`, `aa`, ...). Idempotent and injective for the
//!    lifetime of a [`SymbolTable`]; ids are never reclaimed.
//!
//! 2. **Unit isolation**: a unit interns into a private [`ScratchTable`].
//!    Only a successful unit is merged into the persistent table. Syntax,
//!    generation and output failures leave the table untouched.
//!
//! 3. **Consistency**: a merge that would map one name to two ids, or one
//!    id to two names, fails with [`InternConsistencyError`] and aborts the
//!    build. It is never resolved by picking a side.
//!
//! 4. **Wrapping**: each unit is a function literal taking `($rt)` (or
//!    `($rt, $root, $file)` for the foundational unit) whose prologue binds
//!    every [`RuntimeHelper`] alias, in registry order.
//!
//! 5. **Determinism**: same starting table + same source = same bytes.
//!    Manifests serialize in insertion order so builds can be hash-compared.
//!
//! 6. **Incrementality**: a [`CachePayload`] exported at the end of one build
//!    and loaded before the next keeps every previously assigned id stable.
//!    Malformed payloads are rejected with [`CachePayloadError`], never
//!    treated as an empty table.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod cache;
mod codec;
mod driver;
mod error;
mod helpers;
mod ident;
mod table;
mod verify;
mod wrap;

#[cfg(feature = "napi")]
mod native;

#[cfg(test)]
mod test_support;


pub use cache::{CacheEntry, UnitCache};
pub use codec::{decode, encode, CachePayload, REGISTRAR};
pub use driver::{
    CodeGenerator, Driver, DriverOptions, SourceParser, UnitContext, UnitOutput, UnitSource,
};
pub use error::*;
pub use helpers::{HelperAlias, RuntimeHelper};
pub use ident::{is_identifier, is_valid_id, property_access, quote, IdCursor};
pub use table::{ScratchEntry, ScratchTable, SymbolTable};
pub use verify::verify_unit;
pub use wrap::{
    wrap, wrap_core_unit, wrap_unit, SymbolLiteral, SymbolLiterals, UnitShape, FILE_PARAM,
    ROOT_PARAM, RUNTIME_PARAM,
};

#[cfg(feature = "napi")]
pub use native::{decode_manifest_native, encode_manifest_native, NativeBuild};

#[cfg(feature = "napi")]
#[napi]
pub fn linker_bridge() -> String {
    "Unit Linker Native Bridge Connected".to_string()
}
