//! Constraint model construction.
//!
//! A [`CpModelBuilder`] collects variables, constraints, an optional
//! objective, and solution hints. [`CpModelBuilder::build`] freezes them into
//! a [`CpModel`] that backends can solve.

use crate::expr::{BoolVar, IntVar, LinearExpr, Literal};

/// Lower bound used for "unbounded below" linear constraints.
pub(crate) const NEG_INF: i64 = i64::MIN;
/// Upper bound used for "unbounded above" linear constraints.
pub(crate) const POS_INF: i64 = i64::MAX;

/// Comparison operator of a linear constraint `lhs ⋈ rhs`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Comparison {
    /// `lhs ≤ rhs`
    Le,
    /// `lhs < rhs`
    Lt,
    /// `lhs ≥ rhs`
    Ge,
    /// `lhs > rhs`
    Gt,
    /// `lhs = rhs`
    Eq,
}

/// Handle to a constraint, used to attach enforcement literals.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ConstraintId(usize);

/// `lb ≤ Σ terms ≤ ub`, active only when every enforcement literal is true.
#[derive(Clone, Debug)]
pub(crate) struct LinearConstraint {
    pub(crate) terms: Vec<(u32, i64)>,
    pub(crate) lb: i64,
    pub(crate) ub: i64,
    pub(crate) enforcement: Vec<Literal>,
}

/// `target = max(exprs)`.
#[derive(Clone, Debug)]
pub(crate) struct MaxEquality {
    pub(crate) target: u32,
    pub(crate) exprs: Vec<LinearExpr>,
}

#[derive(Clone, Debug)]
pub(crate) enum Constraint {
    Linear(LinearConstraint),
    MaxEquality(MaxEquality),
}

impl Constraint {
    pub(crate) fn vars(&self) -> Vec<u32> {
        match self {
            Constraint::Linear(c) => c
                .terms
                .iter()
                .map(|&(v, _)| v)
                .chain(c.enforcement.iter().map(|l| l.var))
                .collect(),
            Constraint::MaxEquality(m) => std::iter::once(m.target)
                .chain(m.exprs.iter().flat_map(|e| e.terms.iter().map(|&(v, _)| v)))
                .collect(),
        }
    }
}

/// A path over 0/1 arc variables, grown from `source` during search.
///
/// The search follows arcs already set to true from `source` and branches
/// on the undecided arcs leaving the node where the path currently ends.
#[derive(Clone, Debug, Default)]
pub(crate) struct PathStrategy {
    pub(crate) source: usize,
    /// Outgoing `(variable, head)` arcs per node, most preferred first.
    pub(crate) out_arcs: Vec<Vec<(u32, usize)>>,
}

/// An immutable constraint model.
#[derive(Clone, Debug, Default)]
pub struct CpModel {
    pub(crate) domains: Vec<(i64, i64)>,
    pub(crate) is_bool: Vec<bool>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) objective: Option<LinearExpr>,
    pub(crate) hints: Vec<Option<i64>>,
    pub(crate) paths: Vec<PathStrategy>,
}

impl CpModel {
    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.domains.len()
    }

    /// Number of boolean variables.
    pub fn num_bool_vars(&self) -> usize {
        self.is_bool.iter().filter(|&&b| b).count()
    }

    /// Number of constraints.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Domain of an integer variable.
    pub fn domain(&self, var: IntVar) -> (i64, i64) {
        self.domains[var.index()]
    }

    /// Returns `true` if a minimization objective was set.
    pub fn has_objective(&self) -> bool {
        self.objective.is_some()
    }

    /// Checks the model for structural defects.
    pub fn validate(&self) -> Result<(), String> {
        for (i, &(lb, ub)) in self.domains.iter().enumerate() {
            if lb > ub {
                return Err(format!("variable #{i} has an empty domain [{lb}, {ub}]"));
            }
        }
        for (i, c) in self.constraints.iter().enumerate() {
            for v in c.vars() {
                if v as usize >= self.domains.len() {
                    return Err(format!("constraint #{i} references unknown variable #{v}"));
                }
            }
            if let Constraint::MaxEquality(m) = c {
                if m.exprs.is_empty() {
                    return Err(format!("max-equality constraint #{i} has no arguments"));
                }
            }
            if let Constraint::Linear(lin) = c {
                if let Some(l) = lin.enforcement.iter().find(|l| !self.is_bool[l.var as usize]) {
                    return Err(format!(
                        "constraint #{i} is enforced by non-boolean variable #{}",
                        l.var
                    ));
                }
            }
        }
        for (i, path) in self.paths.iter().enumerate() {
            let nodes = path.out_arcs.len();
            for &(v, head) in path.out_arcs.iter().flatten() {
                if !self.is_bool.get(v as usize).copied().unwrap_or(false) {
                    return Err(format!(
                        "path strategy #{i} branches on non-boolean variable #{v}"
                    ));
                }
                if head >= nodes {
                    return Err(format!("path strategy #{i} references node {head}"));
                }
            }
            if path.source >= nodes {
                return Err(format!("path strategy #{i} starts outside its graph"));
            }
        }
        Ok(())
    }
}

/// Incrementally builds a [`CpModel`].
#[derive(Clone, Debug, Default)]
pub struct CpModelBuilder {
    model: CpModel,
}

impl CpModelBuilder {
    /// Starts an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new 0/1 variable.
    pub fn new_bool_var(&mut self) -> BoolVar {
        let idx = self.push_var(0, 1, true);
        BoolVar(idx)
    }

    /// Creates a new integer variable with domain `[lb, ub]`.
    pub fn new_int_var(&mut self, lb: i64, ub: i64) -> IntVar {
        IntVar(self.push_var(lb, ub, false))
    }

    fn push_var(&mut self, lb: i64, ub: i64, is_bool: bool) -> u32 {
        let idx = self.model.domains.len() as u32;
        self.model.domains.push((lb, ub));
        self.model.is_bool.push(is_bool);
        self.model.hints.push(None);
        idx
    }

    /// Adds `lhs ⋈ rhs`.
    pub fn add_linear(
        &mut self,
        lhs: impl Into<LinearExpr>,
        cmp: Comparison,
        rhs: impl Into<LinearExpr>,
    ) -> ConstraintId {
        let expr = (lhs.into() - rhs).normalized();
        // Σ terms ⋈ −constant
        let rhs = -expr.constant;
        let (lb, ub) = match cmp {
            Comparison::Le => (NEG_INF, rhs),
            Comparison::Lt => (NEG_INF, rhs - 1),
            Comparison::Ge => (rhs, POS_INF),
            Comparison::Gt => (rhs + 1, POS_INF),
            Comparison::Eq => (rhs, rhs),
        };
        self.push_linear(expr.terms, lb, ub)
    }

    /// Adds `lhs ≤ rhs`.
    pub fn add_le(&mut self, lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) -> ConstraintId {
        self.add_linear(lhs, Comparison::Le, rhs)
    }

    /// Adds `lhs ≥ rhs`.
    pub fn add_ge(&mut self, lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) -> ConstraintId {
        self.add_linear(lhs, Comparison::Ge, rhs)
    }

    /// Adds `lhs = rhs`.
    pub fn add_eq(&mut self, lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) -> ConstraintId {
        self.add_linear(lhs, Comparison::Eq, rhs)
    }

    fn push_linear(&mut self, terms: Vec<(u32, i64)>, lb: i64, ub: i64) -> ConstraintId {
        let id = ConstraintId(self.model.constraints.len());
        self.model.constraints.push(Constraint::Linear(LinearConstraint {
            terms,
            lb,
            ub,
            enforcement: Vec::new(),
        }));
        id
    }

    fn literal_sum<I: IntoIterator<Item = Literal>>(literals: I) -> LinearExpr {
        literals.into_iter().collect()
    }

    /// Adds `Σ literals = 1`.
    pub fn add_exactly_one<I: IntoIterator<Item = Literal>>(&mut self, literals: I) -> ConstraintId {
        self.add_eq(Self::literal_sum(literals), 1)
    }

    /// Adds `Σ literals ≤ 1`.
    pub fn add_at_most_one<I: IntoIterator<Item = Literal>>(&mut self, literals: I) -> ConstraintId {
        self.add_le(Self::literal_sum(literals), 1)
    }

    /// Adds `∨ literals`.
    pub fn add_bool_or<I: IntoIterator<Item = Literal>>(&mut self, literals: I) -> ConstraintId {
        self.add_ge(Self::literal_sum(literals), 1)
    }

    /// Adds `target = max(exprs)`.
    ///
    /// `exprs` must not be empty.
    pub fn add_max_equality<I>(&mut self, target: IntVar, exprs: I)
    where
        I: IntoIterator,
        I::Item: Into<LinearExpr>,
    {
        let exprs: Vec<LinearExpr> = exprs.into_iter().map(|e| e.into().normalized()).collect();
        for e in &exprs {
            self.add_le(e.clone(), target);
        }
        self.model
            .constraints
            .push(Constraint::MaxEquality(MaxEquality {
                target: target.0,
                exprs,
            }));
    }

    /// Makes a constraint active only when every literal is true.
    ///
    /// Only linear constraints (including the cardinality helpers) accept
    /// enforcement literals; other constraint ids are ignored.
    pub fn only_enforce_if<I: IntoIterator<Item = Literal>>(&mut self, id: ConstraintId, literals: I) {
        if let Some(Constraint::Linear(c)) = self.model.constraints.get_mut(id.0) {
            c.enforcement.extend(literals);
        }
    }

    /// Asks the search to build a path from `source` arc by arc.
    ///
    /// `arcs` are `(tail, head, variable)` triples over nodes numbered from
    /// zero; arcs leaving the same node are tried in the order given. Paths
    /// are branched on in the order they were added, before any other
    /// variable, and each prefers setting its frontier arcs to true.
    pub fn add_path_strategy<I>(&mut self, source: usize, arcs: I)
    where
        I: IntoIterator<Item = (usize, usize, BoolVar)>,
    {
        let mut out_arcs: Vec<Vec<(u32, usize)>> = vec![Vec::new(); source + 1];
        for (tail, head, var) in arcs {
            let needed = tail.max(head) + 1;
            if out_arcs.len() < needed {
                out_arcs.resize_with(needed, Vec::new);
            }
            out_arcs[tail].push((var.0, head));
        }
        self.model.paths.push(PathStrategy { source, out_arcs });
    }

    /// Suggests a value for a variable; the search tries it first.
    pub fn add_hint(&mut self, var: impl Into<HintTarget>, value: i64) {
        let idx = var.into().0 as usize;
        if let Some(h) = self.model.hints.get_mut(idx) {
            *h = Some(value);
        }
    }

    /// Sets the expression to minimize, replacing any previous objective.
    pub fn minimize(&mut self, objective: impl Into<LinearExpr>) {
        self.model.objective = Some(objective.into().normalized());
    }

    /// Number of variables created so far.
    pub fn num_vars(&self) -> usize {
        self.model.domains.len()
    }

    /// Freezes the model.
    pub fn build(self) -> CpModel {
        self.model
    }
}

/// A variable that accepts a hint.
#[derive(Clone, Copy, Debug)]
pub struct HintTarget(u32);

impl From<IntVar> for HintTarget {
    fn from(v: IntVar) -> Self {
        HintTarget(v.0)
    }
}

impl From<BoolVar> for HintTarget {
    fn from(v: BoolVar) -> Self {
        HintTarget(v.0)
    }
}
