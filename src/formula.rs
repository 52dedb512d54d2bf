//! Structured boolean formulas and their clause-form compilation.
//!
//! Causal rules are built with constructors ([`Formula::iff`],
//! [`Formula::and`], ...) rather than assembled as text.  Before reaching
//! the solver a formula is compiled to CNF:
//!
//! 1. `a ⇔ b` becomes `(¬a ∨ b) ∧ (a ∨ ¬b)`;
//! 2. negations are pushed down to literals (negation normal form);
//! 3. disjunction is distributed over conjunction.
//!
//! The causal rules are shallow (a biconditional over a conjunction with
//! at most one nested disjunction), so distribution stays small and no
//! auxiliary variables are introduced.

use std::collections::BTreeSet;

use crate::relation::{Literal, RelationKey};

/// A disjunction of literals.  Empty means `false`.
pub type Clause = Vec<Literal>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    Lit(Literal),
    Not(Box<Formula>),
    /// Empty conjunction is `true`.
    And(Vec<Formula>),
    /// Empty disjunction is `false`.
    Or(Vec<Formula>),
    Iff(Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn var(key: RelationKey) -> Self {
        Self::Lit(key.holds())
    }

    pub fn lit(literal: Literal) -> Self {
        Self::Lit(literal)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(f: Formula) -> Self {
        Self::Not(Box::new(f))
    }

    pub fn and(parts: impl IntoIterator<Item = Formula>) -> Self {
        Self::And(parts.into_iter().collect())
    }

    pub fn or(parts: impl IntoIterator<Item = Formula>) -> Self {
        Self::Or(parts.into_iter().collect())
    }

    pub fn iff(lhs: Formula, rhs: Formula) -> Self {
        Self::Iff(Box::new(lhs), Box::new(rhs))
    }

    /// `a ⇒ b`, expressed as `¬a ∨ b`.
    pub fn implies(lhs: Formula, rhs: Formula) -> Self {
        Self::or([Self::not(lhs), rhs])
    }

    /// Every key mentioned anywhere in the formula.
    pub fn keys(&self) -> BTreeSet<&RelationKey> {
        let mut out = BTreeSet::new();
        self.collect_keys(&mut out);
        out
    }

    fn collect_keys<'a>(&'a self, out: &mut BTreeSet<&'a RelationKey>) {
        match self {
            Self::Lit(l) => {
                out.insert(&l.key);
            }
            Self::Not(f) => f.collect_keys(out),
            Self::And(fs) | Self::Or(fs) => fs.iter().for_each(|f| f.collect_keys(out)),
            Self::Iff(a, b) => {
                a.collect_keys(out);
                b.collect_keys(out);
            }
        }
    }

    /// Evaluate under a valuation.  `None` if a key has no value.
    pub fn eval(&self, value_of: &impl Fn(&RelationKey) -> Option<bool>) -> Option<bool> {
        Some(match self {
            Self::Lit(l) => value_of(&l.key)? == l.value,
            Self::Not(f) => !f.eval(value_of)?,
            Self::And(fs) => {
                let mut all = true;
                for f in fs {
                    all &= f.eval(value_of)?;
                }
                all
            }
            Self::Or(fs) => {
                let mut any = false;
                for f in fs {
                    any |= f.eval(value_of)?;
                }
                any
            }
            Self::Iff(a, b) => a.eval(value_of)? == b.eval(value_of)?,
        })
    }

    /// Compile to an equivalent set of clauses.
    ///
    /// Tautological clauses (containing `x` and `¬x`) are dropped and
    /// duplicate literals and clauses removed.  Clause order follows the
    /// formula structure, so equal formulas compile identically.
    pub fn to_clauses(&self) -> Vec<Clause> {
        let mut out: Vec<Clause> = Vec::new();
        for clause in self.nnf(true).cnf() {
            if is_tautology(&clause) || out.contains(&clause) {
                continue;
            }
            out.push(clause);
        }
        out
    }

    /// Negation normal form.  `positive == false` returns the NNF of `¬self`.
    fn nnf(&self, positive: bool) -> Nnf {
        match self {
            Self::Lit(l) => Nnf::Lit(if positive { l.clone() } else { l.negated() }),
            Self::Not(f) => f.nnf(!positive),
            Self::And(fs) => {
                let parts = fs.iter().map(|f| f.nnf(positive)).collect();
                if positive { Nnf::And(parts) } else { Nnf::Or(parts) }
            }
            Self::Or(fs) => {
                let parts = fs.iter().map(|f| f.nnf(positive)).collect();
                if positive { Nnf::Or(parts) } else { Nnf::And(parts) }
            }
            Self::Iff(a, b) => {
                // a ⇔ b   ≡ (¬a ∨ b) ∧ (a ∨ ¬b)
                // ¬(a ⇔ b) ≡ (a ∨ b) ∧ (¬a ∨ ¬b)
                let (a_pos, a_neg) = (a.nnf(true), a.nnf(false));
                let (b_pos, b_neg) = (b.nnf(true), b.nnf(false));
                if positive {
                    Nnf::And(vec![
                        Nnf::Or(vec![a_neg, b_pos]),
                        Nnf::Or(vec![a_pos, b_neg]),
                    ])
                } else {
                    Nnf::And(vec![
                        Nnf::Or(vec![a_pos, b_pos]),
                        Nnf::Or(vec![a_neg, b_neg]),
                    ])
                }
            }
        }
    }
}

/// Formula in negation normal form.
enum Nnf {
    Lit(Literal),
    And(Vec<Nnf>),
    Or(Vec<Nnf>),
}

impl Nnf {
    fn cnf(self) -> Vec<Clause> {
        match self {
            Self::Lit(l) => vec![vec![l]],
            Self::And(parts) => parts.into_iter().flat_map(Nnf::cnf).collect(),
            Self::Or(parts) => {
                // Cross product: one clause per choice of a clause from each part.
                let mut acc: Vec<Clause> = vec![Vec::new()];
                for part in parts {
                    let clauses = part.cnf();
                    let mut next = Vec::with_capacity(acc.len() * clauses.len());
                    for prefix in &acc {
                        for clause in &clauses {
                            let mut merged = prefix.clone();
                            for lit in clause {
                                if !merged.contains(lit) {
                                    merged.push(lit.clone());
                                }
                            }
                            next.push(merged);
                        }
                    }
                    acc = next;
                }
                acc
            }
        }
    }
}

fn is_tautology(clause: &Clause) -> bool {
    clause
        .iter()
        .any(|l| clause.iter().any(|m| m.key == l.key && m.value != l.value))
}
