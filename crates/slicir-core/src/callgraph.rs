/*! Call-graph subgraphs.
 *
 * Interprocedural analysis runs over pre-partitioned subgraphs of the program's call graph. A
 * subgraph is a named set of member procedures; call sites inside members are resolved against
 * the program's procedure table when the subgraph is built, so stitching later is pure lookup.
 */

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::ir::{ProcId, Program, StmtId};

#[derive(Debug, Clone)]
pub struct CallGraph {
    name: String,
    members: IndexSet<ProcId>,
    callees: IndexMap<StmtId, Vec<ProcId>>,
}

impl CallGraph {
    /// Resolve every invoke statement of the member procedures. Targets without a declared
    /// procedure are library code and resolve to nothing.
    pub fn build(
        program: &Program,
        name: impl Into<String>,
        members: impl IntoIterator<Item = ProcId>,
    ) -> CallGraph {
        let members: IndexSet<ProcId> = members.into_iter().collect();
        let mut callees: IndexMap<StmtId, Vec<ProcId>> = IndexMap::new();
        for &proc in &members {
            for &stmt in &program.proc(proc).body {
                if !program.stmt(stmt).is_invoke() {
                    continue;
                }
                match program.resolved_callee(stmt) {
                    Some(callee) => callees.entry(stmt).or_default().push(callee),
                    None => debug!(call = %stmt, "call target is not application code"),
                }
            }
        }
        CallGraph {
            name: name.into(),
            members,
            callees,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> impl Iterator<Item = ProcId> + '_ {
        self.members.iter().copied()
    }

    pub fn is_member(&self, proc: ProcId) -> bool {
        self.members.contains(&proc)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn callees_of(&self, call_site: StmtId) -> &[ProcId] {
        self.callees
            .get(&call_site)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}
