//! Solver adapter: the boundary to the external SAT engine.
//!
//! [`SolverSession`] maps declared relation keys onto `rustsat` variables
//! (key index `i` ↦ variable `i`), feeds it clauses and forced observation
//! literals, and answers two kinds of query:
//!
//! - [`SolverSession::enumerate_all`] reports **every** satisfying total
//!   assignment exactly once through a closure;
//! - [`SolverSession::solve_under`] finds one assignment under temporary
//!   assumptions.
//!
//! A session owns its solver and is never shared between requests.

use core::ops::ControlFlow;

use log::{debug, trace};
use rustsat::solvers::{Solve, SolveIncremental, SolverResult};
use rustsat::types::{Clause as SatClause, Lit, TernaryVal};
use rustsat_batsat::BasicSolver;

use crate::error::{Error, Result};
use crate::formula::{Clause, Formula};
use crate::model::{CausalModel, Namespace, VarIndex};
use crate::relation::{Literal, RelationKey};

// ───────────────────────────────────────────────────────────────
// Assignment
// ───────────────────────────────────────────────────────────────

/// One total assignment: a value for every declared key.
#[derive(Debug, Clone)]
pub struct Assignment<'a> {
    namespace: &'a Namespace,
    values: Vec<bool>,
}

impl<'a> Assignment<'a> {
    pub fn value(&self, key: &RelationKey) -> Option<bool> {
        let idx = self.namespace.index_of(key).ok()?;
        self.values.get(idx as usize).copied()
    }

    pub fn satisfies(&self, literal: &Literal) -> bool {
        self.value(&literal.key) == Some(literal.value)
    }

    /// `(key, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a RelationKey, bool)> + '_ {
        self.namespace.keys().zip(self.values.iter().copied())
    }
}

// ───────────────────────────────────────────────────────────────
// Session
// ───────────────────────────────────────────────────────────────

pub struct SolverSession<S = BasicSolver> {
    namespace: Namespace,
    solver: S,
    /// Whether each variable occurs in at least one clause.
    constrained: Vec<bool>,
    clause_count: usize,
}

impl SolverSession<BasicSolver> {
    /// Session over the default batsat backend.
    pub fn new(namespace: Namespace) -> Self {
        Self::with_solver(namespace, BasicSolver::default())
    }

    /// Session loaded with every constraint of `model`.
    pub fn for_model(model: &CausalModel) -> Result<Self> {
        let mut session = Self::new(model.namespace().clone());
        for clause in model.clauses() {
            session.add_clause(&clause)?;
        }
        Ok(session)
    }
}

impl<S> SolverSession<S>
where
    S: Solve + SolveIncremental,
{
    pub fn with_solver(namespace: Namespace, solver: S) -> Self {
        let constrained = vec![false; namespace.len()];
        Self {
            namespace,
            solver,
            constrained,
            clause_count: 0,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn clause_count(&self) -> usize {
        self.clause_count
    }

    /// Variables that occur in no clause.  They take either value in
    /// enumerated solutions.
    pub fn free_keys(&self) -> impl Iterator<Item = &RelationKey> {
        self.namespace
            .keys()
            .zip(&self.constrained)
            .filter(|(_, c)| !**c)
            .map(|(k, _)| k)
    }

    pub fn add_clause(&mut self, clause: &Clause) -> Result<()> {
        let mut lits = Vec::with_capacity(clause.len());
        for lit in clause {
            let idx = self.namespace.index_of(&lit.key)?;
            self.constrained[idx as usize] = true;
            lits.push(to_sat_lit(idx, lit.value));
        }
        self.solver.add_clause(lits.into_iter().collect::<SatClause>())?;
        self.clause_count += 1;
        Ok(())
    }

    pub fn add_formula(&mut self, formula: &Formula) -> Result<()> {
        for clause in formula.to_clauses() {
            self.add_clause(&clause)?;
        }
        Ok(())
    }

    /// Force an observed literal for the rest of the session.
    pub fn force(&mut self, literal: &Literal) -> Result<()> {
        self.add_clause(&vec![literal.clone()])
    }

    /// One satisfying assignment under `assumptions`, or `None`.
    ///
    /// Assumptions only hold for this call.
    pub fn solve_under(&mut self, assumptions: &[Literal]) -> Result<Option<Assignment<'_>>> {
        // Assumptions on free variables never reach the backend; they are
        // applied to the returned assignment directly.
        let mut assumps = Vec::with_capacity(assumptions.len());
        for lit in assumptions {
            let idx = self.namespace.index_of(&lit.key)?;
            if self.constrained[idx as usize] {
                assumps.push(to_sat_lit(idx, lit.value));
            }
        }

        match self.solver.solve_assumps(&assumps)? {
            SolverResult::Sat => {
                let mut values = self.read_constrained()?;
                // Free variables are unconstrained: any value is a model.
                for (v, c) in values.iter_mut().zip(&self.constrained) {
                    if !c {
                        *v = true;
                    }
                }
                for lit in assumptions {
                    let idx = self.namespace.index_of(&lit.key)? as usize;
                    if !self.constrained[idx] {
                        values[idx] = lit.value;
                    }
                }
                Ok(Some(Assignment {
                    namespace: &self.namespace,
                    values,
                }))
            }
            SolverResult::Unsat => Ok(None),
            other => Err(Error::Solver(format!("solve did not finish: {other:?}"))),
        }
    }

    /// Report every satisfying total assignment exactly once.
    ///
    /// Each model is blocked on the constrained variables; the free
    /// variables are expanded over both values.  `on_solution` may stop
    /// enumeration with [`ControlFlow::Break`]; an error it returns aborts
    /// enumeration and is propagated.  With `limit = Some(n)` reporting
    /// more than `n` assignments fails with [`Error::EnumerationLimit`].
    ///
    /// Returns the number of assignments reported.  Blocking clauses stay
    /// in the solver, so a session is spent after enumeration.
    pub fn enumerate_all<F>(&mut self, limit: Option<usize>, mut on_solution: F) -> Result<usize>
    where
        F: FnMut(&Assignment<'_>) -> Result<ControlFlow<()>>,
    {
        let free: Vec<usize> = (0..self.namespace.len())
            .filter(|&i| !self.constrained[i])
            .collect();
        let any_constrained = self.constrained.iter().any(|c| *c);
        let mut reported = 0usize;

        loop {
            match self.solver.solve()? {
                SolverResult::Sat => {}
                SolverResult::Unsat => break,
                other => return Err(Error::Solver(format!("solve did not finish: {other:?}"))),
            }
            let mut values = self.read_constrained()?;

            // Binary counter over the free variables, starting all-false.
            for &i in &free {
                values[i] = false;
            }
            loop {
                reported += 1;
                if let Some(n) = limit {
                    if reported > n {
                        return Err(Error::EnumerationLimit(n));
                    }
                }
                let assignment = Assignment {
                    namespace: &self.namespace,
                    values: values.clone(),
                };
                if on_solution(&assignment)?.is_break() {
                    debug!("enumeration stopped by caller after {reported} solutions");
                    return Ok(reported);
                }
                if !increment(&mut values, &free) {
                    break;
                }
            }

            if !any_constrained {
                break;
            }
            let blocking: SatClause = values
                .iter()
                .enumerate()
                .filter(|(i, _)| self.constrained[*i])
                .map(|(i, v)| to_sat_lit(i as VarIndex, !v))
                .collect();
            self.solver.add_clause(blocking)?;
        }

        trace!("enumeration complete: {reported} solutions");
        Ok(reported)
    }

    /// Values of the constrained variables in the current model.  Free
    /// variables read as `false`.
    fn read_constrained(&self) -> Result<Vec<bool>> {
        let mut values = vec![false; self.namespace.len()];
        for (i, value) in values.iter_mut().enumerate() {
            if !self.constrained[i] {
                continue;
            }
            *value = match self.solver.lit_val(to_sat_lit(i as VarIndex, true))? {
                TernaryVal::True => true,
                TernaryVal::False | TernaryVal::DontCare => false,
            };
        }
        Ok(values)
    }
}

fn to_sat_lit(idx: VarIndex, value: bool) -> Lit {
    if value {
        Lit::positive(idx)
    } else {
        Lit::negative(idx)
    }
}

/// Advance the binary counter stored in `values[positions]`.  Returns
/// `false` once it wraps around.
fn increment(values: &mut [bool], positions: &[usize]) -> bool {
    for &p in positions {
        if values[p] {
            values[p] = false;
        } else {
            values[p] = true;
            return true;
        }
    }
    false
}
