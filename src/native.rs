//! Node binding for generators that run on the JavaScript side.
//!
//! The host drives one unit at a time: `beginUnit`, any number of
//! `intern`/`symbol` calls, then `commitUnit` (wrap + merge) or `abortUnit`.

use crate::codec::{decode, encode, CachePayload};
use crate::helpers::RuntimeHelper;
use crate::table::{ScratchTable, SymbolTable};
use crate::wrap::{wrap, SymbolLiterals, UnitShape};
use napi_derive::napi;

struct PendingUnit {
    file: String,
    scratch: ScratchTable,
    symbols: SymbolLiterals,
}

#[napi]
#[derive(Default)]
pub struct NativeBuild {
    table: SymbolTable,
    unit: Option<PendingUnit>,
}

fn no_unit() -> napi::Error {
    napi::Error::from_reason("no unit in progress; call beginUnit first")
}

#[napi]
impl NativeBuild {
    #[napi(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the table from an embeddable manifest literal.
    #[napi]
    pub fn load_manifest(&mut self, literal: String) -> napi::Result<()> {
        let payload = decode(&literal).map_err(|e| napi::Error::from_reason(e.to_string()))?;
        self.table
            .load_snapshot(&payload)
            .map_err(|e| napi::Error::from_reason(e.to_string()))
    }

    #[napi]
    pub fn begin_unit(&mut self, file: String) {
        self.unit = Some(PendingUnit {
            file,
            scratch: self.table.begin_unit(),
            symbols: SymbolLiterals::new(),
        });
    }

    #[napi]
    pub fn intern(&mut self, name: String) -> napi::Result<String> {
        let unit = self.unit.as_mut().ok_or_else(no_unit)?;
        Ok(unit.scratch.intern(&self.table, &name))
    }

    #[napi]
    pub fn symbol(&mut self, name: String) -> napi::Result<String> {
        let unit = self.unit.as_mut().ok_or_else(no_unit)?;
        Ok(unit.symbols.get_or_insert(&name))
    }

    /// Wraps `raw`, merges the unit's names and returns the wrapped code.
    #[napi]
    pub fn commit_unit(&mut self, raw: String, core: bool) -> napi::Result<String> {
        let unit = self.unit.take().ok_or_else(no_unit)?;
        let shape = if core {
            UnitShape::Core
        } else {
            UnitShape::Ordinary
        };
        let code = wrap(
            shape,
            RuntimeHelper::registry(),
            unit.symbols.as_slice(),
            &raw,
        );
        self.table
            .merge_unit(unit.scratch)
            .map_err(|e| napi::Error::from_reason(format!("{}: {}", unit.file, e)))?;
        Ok(code)
    }

    #[napi]
    pub fn abort_unit(&mut self) {
        self.unit = None;
    }

    #[napi]
    pub fn build_manifest(&self) -> String {
        encode(&self.table.export_snapshot())
    }

    #[napi(getter)]
    pub fn size(&self) -> napi::Result<u32> {
        u32::try_from(self.table.len())
            .map_err(|_| napi::Error::from_reason("interning table exceeds u32 entries"))
    }
}

/// JSON manifest → embeddable literal.
#[napi]
pub fn encode_manifest_native(json: String) -> napi::Result<String> {
    let payload =
        CachePayload::from_json(&json).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    Ok(encode(&payload))
}

/// Embeddable literal → JSON manifest.
#[napi]
pub fn decode_manifest_native(literal: String) -> napi::Result<String> {
    decode(&literal)
        .and_then(|payload| payload.to_json())
        .map_err(|e| napi::Error::from_reason(e.to_string()))
}
