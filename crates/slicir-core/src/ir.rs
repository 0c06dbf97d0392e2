/*! Statement-level program model.
 *
 * Procedures are ingested pre-lowered: a list of statements, a control-flow graph over
 * `[entry, statements..., exit]`, and def-use facts. The [`Program`] arena owns every statement,
 * including the synthetic entry/exit markers the dependence builders allocate, so a [`StmtId`] is
 * meaningful program-wide and graphs from different procedures can be stitched together.
 */

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::graph::StmtGraph;
use crate::sig::Signature;
use crate::{PdgError, Result};

/// Identifies a statement in the program arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtId(pub u32);

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stmt{}", self.0)
    }
}

/// Identifies a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcId(pub u32);

impl fmt::Display for ProcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc{}", self.0)
    }
}

/// How a call expression resolves its target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallExpr {
    /// Statically or virtually dispatched call with a declared target.
    Direct { target: Signature },
    /// Dynamically bootstrapped call; resolution goes through the bootstrap method.
    Dynamic { bootstrap: Signature },
}

impl CallExpr {
    /// The signature call resolution and sensitive-API matching key on.
    pub fn resolved_target(&self) -> &Signature {
        match self {
            CallExpr::Direct { target } => target,
            CallExpr::Dynamic { bootstrap } => bootstrap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StmtKind {
    /// Assignment, condition, or any other plain statement.
    Ordinary,
    /// Call site.
    Invoke(CallExpr),
    /// Procedure return, with the returned variable when one exists.
    Return(Option<String>),
    /// Synthetic procedure entry marker.
    Entry,
    /// Synthetic procedure exit marker.
    Exit,
    /// No-op placeholder.
    Nop,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: StmtId,
    pub proc: ProcId,
    /// Position in the procedure body; `None` for synthetic nodes.
    pub index: Option<u32>,
    pub kind: StmtKind,
    /// Source text used for labels and reports.
    pub text: String,
}

impl Stmt {
    pub fn is_invoke(&self) -> bool {
        matches!(self.kind, StmtKind::Invoke(_))
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, StmtKind::Return(_))
    }

    pub fn call_expr(&self) -> Option<&CallExpr> {
        match &self.kind {
            StmtKind::Invoke(call) => Some(call),
            _ => None,
        }
    }

    /// The variable a `return v` statement hands back, if any.
    pub fn returned_var(&self) -> Option<&str> {
        match &self.kind {
            StmtKind::Return(Some(var)) => Some(var.as_str()),
            _ => None,
        }
    }
}

/// One procedure: signature, body statements in order, control flow, def-use facts.
#[derive(Debug, Clone)]
pub struct Procedure {
    pub id: ProcId,
    pub sig: Signature,
    /// Body statements in declaration order, synthetic nodes excluded.
    pub body: Vec<StmtId>,
    /// Control flow over `[entry, body..., exit]`; the node order is load-bearing for the
    /// dominance calculator's index mapping.
    pub cfg: StmtGraph,
    /// Definition statement to the statements using its value.
    pub uses: IndexMap<StmtId, Vec<StmtId>>,
}

impl Procedure {
    pub fn uses_of(&self, def: StmtId) -> &[StmtId] {
        self.uses.get(&def).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Whole-program arena: every procedure and every statement ever allocated.
#[derive(Debug, Clone, Default)]
pub struct Program {
    stmts: Vec<Stmt>,
    procs: Vec<Procedure>,
    by_sig: IndexMap<Signature, ProcId>,
}

impl Program {
    pub fn new() -> Program {
        Program::default()
    }

    /// Register a procedure under its signature. The body arrives later through
    /// [`Program::define_body`], once its statements and flow graph exist.
    pub fn declare_proc(&mut self, sig: Signature) -> Result<ProcId> {
        if self.by_sig.contains_key(&sig) {
            return Err(PdgError::DuplicateProcedure(sig.to_string()));
        }
        let id = ProcId(self.procs.len() as u32);
        self.by_sig.insert(sig.clone(), id);
        self.procs.push(Procedure {
            id,
            sig,
            body: Vec::new(),
            cfg: StmtGraph::new(id),
            uses: IndexMap::new(),
        });
        Ok(id)
    }

    pub fn define_body(
        &mut self,
        proc: ProcId,
        body: Vec<StmtId>,
        cfg: StmtGraph,
        uses: IndexMap<StmtId, Vec<StmtId>>,
    ) {
        let p = &mut self.procs[proc.0 as usize];
        p.body = body;
        p.cfg = cfg;
        p.uses = uses;
    }

    pub fn alloc_stmt(
        &mut self,
        proc: ProcId,
        index: Option<u32>,
        kind: StmtKind,
        text: impl Into<String>,
    ) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(Stmt {
            id,
            proc,
            index,
            kind,
            text: text.into(),
        });
        id
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0 as usize]
    }

    pub fn proc(&self, id: ProcId) -> &Procedure {
        &self.procs[id.0 as usize]
    }

    pub fn proc_by_sig(&self, sig: &Signature) -> Option<ProcId> {
        self.by_sig.get(sig).copied()
    }

    /// The declared procedure a call statement resolves to, when its target is
    /// application code.
    pub fn resolved_callee(&self, stmt: StmtId) -> Option<ProcId> {
        let call = self.stmt(stmt).call_expr()?;
        self.proc_by_sig(call.resolved_target())
    }

    pub fn procs(&self) -> impl Iterator<Item = &Procedure> {
        self.procs.iter()
    }

    pub fn proc_count(&self) -> usize {
        self.procs.len()
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sig(name: &str) -> Signature {
        Signature::new("com.app.Main", name, Vec::new())
    }

    #[test]
    fn declare_rejects_duplicate_signature() {
        let mut program = Program::new();
        program.declare_proc(sig("main")).expect("first declaration");
        assert!(program.declare_proc(sig("main")).is_err());
    }

    #[test]
    fn resolves_callee_by_structured_signature() {
        let mut program = Program::new();
        let callee = program.declare_proc(sig("helper")).expect("declares");
        let caller = program.declare_proc(sig("main")).expect("declares");
        let call = program.alloc_stmt(
            caller,
            Some(0),
            StmtKind::Invoke(CallExpr::Direct {
                target: sig("helper"),
            }),
            "helper()",
        );
        assert_eq!(program.resolved_callee(call), Some(callee));
    }

    #[test]
    fn library_target_resolves_to_nothing() {
        let mut program = Program::new();
        let caller = program.declare_proc(sig("main")).expect("declares");
        let call = program.alloc_stmt(
            caller,
            Some(0),
            StmtKind::Invoke(CallExpr::Direct {
                target: Signature::new("java.io.PrintStream", "println", Vec::new()),
            }),
            "println()",
        );
        assert_eq!(program.resolved_callee(call), None);
    }

    #[test]
    fn returned_var_only_on_value_returns() {
        let mut program = Program::new();
        let p = program.declare_proc(sig("main")).expect("declares");
        let with = program.alloc_stmt(p, Some(0), StmtKind::Return(Some("v".into())), "return v");
        let without = program.alloc_stmt(p, Some(1), StmtKind::Return(None), "return");
        assert_eq!(program.stmt(with).returned_var(), Some("v"));
        assert_eq!(program.stmt(without).returned_var(), None);
    }
}
