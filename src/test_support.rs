//! Line-oriented stand-ins for the external parser and generator.
//!
//! Each non-blank source line is one statement:
//!
//! - `call NAME`  send `NAME` to self
//! - `ivar NAME`  read instance variable `@NAME` into a temporary
//! - `sym NAME`   reference the symbol literal `NAME`
//! - `def NAME`   define method `NAME` returning nil
//! - `raw CODE`   emit `CODE` verbatim
//! - `fail`       parses, but the generator rejects it

use crate::driver::{CodeGenerator, SourceParser, UnitContext};
use crate::error::{GenerateError, SyntaxError};
use crate::ident::quote;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Call(String),
    Ivar(String),
    Sym(String),
    Def(String),
    Raw(String),
    Fail,
}

#[derive(Debug, Default)]
pub struct LineParser {
    pub calls: AtomicUsize,
}

impl LineParser {
    pub fn parse_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SourceParser for LineParser {
    type Ast = Vec<(u32, Stmt)>;

    fn parse(&self, source: &str, _file: &str) -> Result<Self::Ast, SyntaxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut stmts = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            let lineno = idx as u32 + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
            let rest = rest.trim();
            let stmt = match (head, rest.is_empty()) {
                ("call", false) => Stmt::Call(rest.to_string()),
                ("ivar", false) => Stmt::Ivar(rest.to_string()),
                ("sym", false) => Stmt::Sym(rest.to_string()),
                ("def", false) => Stmt::Def(rest.to_string()),
                ("raw", false) => Stmt::Raw(rest.to_string()),
                ("fail", true) => Stmt::Fail,
                _ => {
                    return Err(SyntaxError::new(
                        format!("unexpected '{}'", head),
                        lineno,
                    ))
                }
            };
            stmts.push((lineno, stmt));
        }
        Ok(stmts)
    }
}

#[derive(Debug, Default)]
pub struct LineGenerator;

impl CodeGenerator<Vec<(u32, Stmt)>> for LineGenerator {
    fn generate(
        &mut self,
        ast: &Vec<(u32, Stmt)>,
        unit: &mut UnitContext<'_>,
    ) -> Result<String, GenerateError> {
        let mut out = String::new();
        for (line, stmt) in ast {
            let code = match stmt {
                Stmt::Call(name) => {
                    let id = unit.intern(name);
                    format!("$send(self, {});", quote(&id))
                }
                Stmt::Ivar(name) => {
                    let id = unit.intern(&format!("@{}", name));
                    let tmp = unit.unique_name();
                    format!("var {} = self.{};", tmp, id)
                }
                Stmt::Sym(name) => {
                    let sym = unit.symbol(name);
                    format!("{};", sym)
                }
                Stmt::Def(name) => {
                    let id = unit.intern(name);
                    unit.indent();
                    let body = format!("{}return nil;", unit.indentation());
                    unit.outdent();
                    format!("$defn(self, {}, function() {{\n{}\n}});", quote(&id), body)
                }
                Stmt::Raw(code) => code.clone(),
                Stmt::Fail => {
                    return Err(GenerateError::new("unsupported construct").at_line(*line));
                }
            };
            out.push_str(&unit.indentation());
            out.push_str(&code);
            out.push('\n');
        }
        Ok(out)
    }
}
