//! Compilation Driver
//!
//! Runs one compilation unit at a time through parse → generate → wrap →
//! (verify) → merge. A unit that fails at any step before the merge leaves
//! the persistent table exactly as it found it.

use crate::cache::{CacheEntry, UnitCache};
use crate::codec::{decode, CachePayload};
use crate::error::{DriverError, GenerateError, SyntaxDiagnostic, SyntaxError};
use crate::helpers::{HelperAlias, RuntimeHelper};
use crate::table::{ScratchTable, SymbolTable};
use crate::verify::verify_unit;
use crate::wrap::{wrap, SymbolLiteral, SymbolLiterals, UnitShape};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════════════
// COLLABORATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Turns source text into an AST. Shared across threads during batch builds.
pub trait SourceParser: Sync {
    type Ast: Send;

    fn parse(&self, source: &str, file: &str) -> Result<Self::Ast, SyntaxError>;
}

/// Turns an AST into raw target code, interning names through `unit`.
pub trait CodeGenerator<A> {
    fn generate(&mut self, ast: &A, unit: &mut UnitContext<'_>) -> Result<String, GenerateError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// PER-UNIT STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything a generator may touch while compiling one unit.
pub struct UnitContext<'t> {
    file: String,
    shape: UnitShape,
    table: &'t SymbolTable,
    scratch: ScratchTable,
    symbols: SymbolLiterals,
    unique: u32,
    indent: usize,
}

impl<'t> UnitContext<'t> {
    pub fn new(table: &'t SymbolTable, file: &str, shape: UnitShape) -> Self {
        Self {
            file: file.to_string(),
            shape,
            table,
            scratch: table.begin_unit(),
            symbols: SymbolLiterals::new(),
            unique: 0,
            indent: 0,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn shape(&self) -> UnitShape {
        self.shape
    }

    /// Interned id for `name`, stable across units and builds.
    pub fn intern(&mut self, name: &str) -> String {
        self.scratch.intern(self.table, name)
    }

    /// Unit-local variable holding the symbol literal `name`.
    pub fn symbol(&mut self, name: &str) -> String {
        self.symbols.get_or_insert(name)
    }

    /// Fresh temporary name, unique within the unit.
    pub fn unique_name(&mut self) -> String {
        self.unique += 1;
        format!("$t{}", self.unique)
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn outdent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn indentation(&self) -> String {
        "  ".repeat(self.indent)
    }

    pub fn symbols(&self) -> &[SymbolLiteral] {
        self.symbols.as_slice()
    }

    pub fn scratch(&self) -> &ScratchTable {
        &self.scratch
    }

    pub fn into_parts(self) -> (ScratchTable, Vec<SymbolLiteral>) {
        (self.scratch, self.symbols.into_vec())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DRIVER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverOptions {
    /// Parse every wrapped unit and reject unbound `$` references.
    pub verify_output: bool,
    /// Return cached output for units whose source and ids are unchanged.
    pub reuse_unchanged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSource {
    pub file: String,
    pub source: String,
    #[serde(default)]
    pub shape: UnitShape,
}

impl UnitSource {
    pub fn new(file: &str, source: &str) -> Self {
        Self {
            file: file.to_string(),
            source: source.to_string(),
            shape: UnitShape::Ordinary,
        }
    }

    pub fn core(file: &str, source: &str) -> Self {
        Self {
            shape: UnitShape::Core,
            ..Self::new(file, source)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOutput {
    pub file: String,
    pub code: String,
    /// Snapshot of the persistent table after this unit merged. Shared by
    /// every output produced while the table stays unchanged.
    pub manifest: Arc<CachePayload>,
    /// Distinct names the unit interned.
    pub interned: usize,
    /// Of those, how many received a new id.
    pub allocated: usize,
    /// True when the code came from the unit cache.
    pub cached: bool,
}

pub struct Driver<P, G> {
    parser: P,
    generator: G,
    table: SymbolTable,
    helpers: &'static [HelperAlias],
    options: DriverOptions,
    cache: UnitCache,
    compiled: usize,
    snapshot: Option<Arc<CachePayload>>,
}

impl<P, G> Driver<P, G>
where
    P: SourceParser,
    G: CodeGenerator<P::Ast>,
{
    pub fn new(parser: P, generator: G) -> Self {
        Self::with_options(parser, generator, DriverOptions::default())
    }

    pub fn with_options(parser: P, generator: G, options: DriverOptions) -> Self {
        Self {
            parser,
            generator,
            table: SymbolTable::new(),
            helpers: RuntimeHelper::registry(),
            options,
            cache: UnitCache::new(),
            compiled: 0,
            snapshot: None,
        }
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    pub fn unit_cache(&self) -> &UnitCache {
        &self.cache
    }

    pub fn set_unit_cache(&mut self, cache: UnitCache) {
        self.cache = cache;
    }

    /// Number of units merged so far.
    pub fn compiled(&self) -> usize {
        self.compiled
    }

    /// Seeds the persistent table for an incremental build.
    pub fn load_manifest(&mut self, payload: &CachePayload) -> Result<(), DriverError> {
        if self.compiled > 0 {
            return Err(DriverError::ManifestAfterCompile {
                compiled: self.compiled,
            });
        }
        self.table.load_snapshot(payload).map_err(|e| {
            tracing::warn!(error = %e, "rejected manifest");
            e
        })?;
        self.snapshot = None;
        Ok(())
    }

    /// [`Driver::load_manifest`] from the embeddable literal form.
    pub fn load_manifest_literal(&mut self, literal: &str) -> Result<(), DriverError> {
        let payload = decode(literal).map_err(|e| {
            tracing::warn!(error = %e, "rejected manifest literal");
            e
        })?;
        self.load_manifest(&payload)
    }

    /// Everything interned across the build so far.
    pub fn build_manifest(&self) -> CachePayload {
        self.table.export_snapshot()
    }

    /// Fresh per-unit state. The persistent table is not touched.
    pub fn reset_for_unit(&self, file: &str, shape: UnitShape) -> UnitContext<'_> {
        reset_for_unit(&self.table, file, shape)
    }

    pub fn compile(&mut self, source: &str, file: &str) -> Result<UnitOutput, DriverError> {
        self.compile_unit(source, file, UnitShape::Ordinary)
    }

    /// Compiles the foundational unit.
    pub fn compile_core(&mut self, source: &str, file: &str) -> Result<UnitOutput, DriverError> {
        self.compile_unit(source, file, UnitShape::Core)
    }

    pub fn compile_unit(
        &mut self,
        source: &str,
        file: &str,
        shape: UnitShape,
    ) -> Result<UnitOutput, DriverError> {
        let hash = UnitCache::compute_hash(shape, source);
        if let Some(output) = self.reuse_cached(file, &hash) {
            return Ok(output);
        }
        let ast = parse_unit(&self.parser, source, file)?;
        self.finish_unit(&ast, file, shape, hash)
    }

    /// Compiles a batch. Parsing runs in parallel; generation and merging
    /// run in input order, so ids match a sequential build exactly.
    ///
    /// Per-unit failures are reported in place. An interning consistency
    /// failure aborts the batch.
    pub fn compile_all(
        &mut self,
        units: &[UnitSource],
    ) -> Result<Vec<Result<UnitOutput, DriverError>>, DriverError> {
        let hashes: Vec<String> = units
            .iter()
            .map(|u| UnitCache::compute_hash(u.shape, &u.source))
            .collect();

        let parser = &self.parser;
        let cache = &self.cache;
        let reuse = self.options.reuse_unchanged;
        let parsed: Vec<Option<Result<P::Ast, DriverError>>> = units
            .par_iter()
            .zip(hashes.par_iter())
            .map(|(unit, hash)| {
                if reuse && cache.has_hash(&unit.file, hash) {
                    None
                } else {
                    Some(parse_unit(parser, &unit.source, &unit.file))
                }
            })
            .collect();

        let mut results = Vec::with_capacity(units.len());
        for ((unit, hash), parsed) in units.iter().zip(hashes).zip(parsed) {
            let result = match parsed {
                Some(parsed) => {
                    parsed.and_then(|ast| self.finish_unit(&ast, &unit.file, unit.shape, hash))
                }
                None => match self.reuse_cached(&unit.file, &hash) {
                    Some(output) => Ok(output),
                    None => parse_unit(&self.parser, &unit.source, &unit.file)
                        .and_then(|ast| self.finish_unit(&ast, &unit.file, unit.shape, hash)),
                },
            };
            match result {
                Err(e) if e.is_fatal() => return Err(e),
                other => results.push(other),
            }
        }
        Ok(results)
    }

    /// The current table snapshot, exported again only after the table changed.
    fn shared_snapshot(&mut self) -> Arc<CachePayload> {
        if let Some(snapshot) = &self.snapshot {
            return Arc::clone(snapshot);
        }
        let snapshot = Arc::new(self.table.export_snapshot());
        self.snapshot = Some(Arc::clone(&snapshot));
        snapshot
    }

    fn reuse_cached(&mut self, file: &str, hash: &str) -> Option<UnitOutput> {
        if !self.options.reuse_unchanged {
            return None;
        }
        let entry = self.cache.get(file, hash, &self.table)?;
        let (code, interned) = (entry.code.clone(), entry.interned.len());
        let output = UnitOutput {
            file: file.to_string(),
            code,
            manifest: self.shared_snapshot(),
            interned,
            allocated: 0,
            cached: true,
        };
        self.compiled += 1;
        tracing::debug!(file, "reused cached unit");
        Some(output)
    }

    fn finish_unit(
        &mut self,
        ast: &P::Ast,
        file: &str,
        shape: UnitShape,
        hash: String,
    ) -> Result<UnitOutput, DriverError> {
        let mut unit = reset_for_unit(&self.table, file, shape);
        let raw = self
            .generator
            .generate(ast, &mut unit)
            .map_err(|e| DriverError::Generate {
                file: file.to_string(),
                line: e.line,
                message: e.message,
            })?;
        let (scratch, symbols) = unit.into_parts();

        let code = wrap(shape, self.helpers, &symbols, &raw);
        if self.options.verify_output {
            verify_unit(file, &code)?;
        }

        let interned: Vec<(String, String)> = scratch
            .entries()
            .iter()
            .map(|e| (e.name.clone(), e.id.clone()))
            .collect();
        let allocated = scratch.allocated();

        let cursor = self.table.cursor();
        let added = self
            .table
            .merge_unit(scratch)
            .map_err(|source| DriverError::Consistency {
                file: file.to_string(),
                source,
            })?;
        if added > 0 || self.table.cursor() != cursor {
            self.snapshot = None;
        }
        self.compiled += 1;
        tracing::info!(file, interned = interned.len(), allocated, "compiled unit");

        let output = UnitOutput {
            file: file.to_string(),
            code: code.clone(),
            manifest: self.shared_snapshot(),
            interned: interned.len(),
            allocated,
            cached: false,
        };
        if self.options.reuse_unchanged {
            self.cache.set(
                file,
                CacheEntry {
                    hash,
                    code,
                    interned,
                },
            );
        }
        Ok(output)
    }
}

/// Scratch table, symbol literals, temporaries and indentation all start
/// over; only the persistent table carries across units.
fn reset_for_unit<'t>(table: &'t SymbolTable, file: &str, shape: UnitShape) -> UnitContext<'t> {
    tracing::trace!(file, cursor = %table.cursor(), "reset unit state");
    UnitContext::new(table, file, shape)
}

fn parse_unit<P: SourceParser>(
    parser: &P,
    source: &str,
    file: &str,
) -> Result<P::Ast, DriverError> {
    parser.parse(source, file).map_err(|e| {
        tracing::debug!(file, line = e.line, "syntax error");
        DriverError::from(SyntaxDiagnostic {
            file: file.to_string(),
            line: e.line,
            message: e.message,
        })
    })
}
