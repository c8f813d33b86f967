//! Depth-first branch-and-bound over bounds-propagated integer domains.
//!
//! Each worker keeps a lower and upper bound per variable and a trail of
//! bound changes for backtracking. Linear constraints (with enforcement
//! literals), max-equality constraints, and the objective cut are propagated
//! to a fixpoint after every decision. Path strategies are branched first,
//! one frontier arc at a time; the remaining variables follow in index order.
//! Workers run independently; the best objective wins and ties go to the
//! lowest worker index.

use crate::backend::CpBackend;
use crate::expr::Literal;
use crate::model::{Constraint, CpModel, LinearConstraint, MaxEquality, NEG_INF, POS_INF};
use crate::params::SolverParams;
use crate::response::{SolverResponse, SolverStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::time::Instant;

/// Search nodes between wall-clock checks.
const DEADLINE_POLL_INTERVAL: u64 = 256;

/// The built-in branch-and-bound engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBound;

impl CpBackend for BranchAndBound {
    fn name(&self) -> &'static str {
        "branch-and-bound"
    }

    fn solve(&self, model: &CpModel, params: &SolverParams) -> SolverResponse {
        let start = Instant::now();
        if let Err(msg) = model.validate() {
            tracing::warn!(%msg, "rejecting invalid constraint model");
            let mut response =
                SolverResponse::without_solution(SolverStatus::ModelInvalid, start.elapsed());
            response.validation_error = Some(msg);
            return response;
        }

        let shared = Shared::new(model);
        let deadline = params.time_limit.and_then(|d| start.checked_add(d));
        let workers = params.num_workers.max(1);
        let run = |index: usize| Worker::new(index, model, &shared, params, deadline).run();
        let outcomes: Vec<WorkerOutcome> = if workers == 1 {
            vec![run(0)]
        } else {
            (0..workers).into_par_iter().map(run).collect()
        };

        let exhausted = outcomes.iter().any(|o| o.exhausted);
        let winner = outcomes
            .iter()
            .filter_map(|o| o.best.as_ref().map(|(obj, _)| (*obj, o.index)))
            .min();
        let status = match (winner.is_some(), exhausted) {
            (true, true) => SolverStatus::Optimal,
            (true, false) => SolverStatus::Feasible,
            (false, true) => SolverStatus::Infeasible,
            (false, false) => SolverStatus::Unknown,
        };

        let mut response = SolverResponse::without_solution(status, start.elapsed());
        response.num_branches = outcomes.iter().map(|o| o.branches).sum();
        response.num_conflicts = outcomes.iter().map(|o| o.conflicts).sum();
        if let Some((objective, index)) = winner {
            response.objective_value = Some(objective);
            response.winning_worker = Some(index);
            if let Some((_, values)) = outcomes.into_iter().nth(index).and_then(|o| o.best) {
                response.values = values;
            }
        }

        tracing::debug!(
            backend = self.name(),
            %status,
            objective = ?response.objective_value,
            branches = response.num_branches,
            conflicts = response.num_conflicts,
            elapsed_ms = response.wall_time.as_millis() as u64,
            "search finished"
        );
        response
    }
}

/// Read-only data shared by all workers.
struct Shared {
    /// Constraints to wake when a variable's bounds change.
    watches: Vec<Vec<usize>>,
    /// Objective coefficient of each variable.
    objective_coeffs: Vec<i64>,
}

impl Shared {
    fn new(model: &CpModel) -> Self {
        let mut watches = vec![Vec::new(); model.num_vars()];
        for (ci, c) in model.constraints.iter().enumerate() {
            let mut vars = c.vars();
            vars.sort_unstable();
            vars.dedup();
            for v in vars {
                watches[v as usize].push(ci);
            }
        }
        let mut objective_coeffs = vec![0; model.num_vars()];
        if let Some(obj) = &model.objective {
            for &(v, c) in &obj.terms {
                objective_coeffs[v as usize] += c;
            }
        }
        Self {
            watches,
            objective_coeffs,
        }
    }
}

struct WorkerOutcome {
    index: usize,
    best: Option<(i64, Vec<i64>)>,
    exhausted: bool,
    branches: u64,
    conflicts: u64,
}

/// Propagation found an empty domain.
struct Conflict;

type Propagation = Result<(), Conflict>;

struct Worker<'m> {
    index: usize,
    model: &'m CpModel,
    shared: &'m Shared,
    lb: Vec<i64>,
    ub: Vec<i64>,
    trail: Vec<(u32, i64, i64)>,
    queue: Vec<usize>,
    queued: Vec<bool>,
    objective_dirty: bool,
    objective_ub: i64,
    rng: StdRng,
    deadline: Option<Instant>,
    polls: u64,
    stopped: bool,
    done: bool,
    log_progress: bool,
    best: Option<(i64, Vec<i64>)>,
    branches: u64,
    conflicts: u64,
}

impl<'m> Worker<'m> {
    fn new(
        index: usize,
        model: &'m CpModel,
        shared: &'m Shared,
        params: &SolverParams,
        deadline: Option<Instant>,
    ) -> Self {
        let (lb, ub) = model.domains.iter().copied().unzip();
        Self {
            index,
            model,
            shared,
            lb,
            ub,
            trail: Vec::new(),
            queue: Vec::new(),
            queued: vec![false; model.num_constraints()],
            objective_dirty: false,
            objective_ub: POS_INF,
            rng: StdRng::seed_from_u64(params.seed.wrapping_add(index as u64)),
            deadline,
            polls: 0,
            stopped: false,
            done: false,
            log_progress: params.log_search_progress,
            best: None,
            branches: 0,
            conflicts: 0,
        }
    }

    fn run(mut self) -> WorkerOutcome {
        for c in 0..self.model.num_constraints() {
            self.enqueue(c);
        }
        self.objective_dirty = true;
        if self.propagate().is_ok() {
            self.search();
        }
        WorkerOutcome {
            index: self.index,
            best: self.best,
            exhausted: !self.stopped,
            branches: self.branches,
            conflicts: self.conflicts,
        }
    }

    fn search(&mut self) {
        if self.should_stop() {
            return;
        }
        let Some((var, frontier)) = self.pick_branch_var() else {
            self.record_solution();
            return;
        };
        for (lo, hi) in self.branch_choices(var, frontier) {
            if self.stopped || self.done {
                return;
            }
            let mark = self.trail.len();
            self.branches += 1;
            self.objective_dirty = true;
            let ok = self.set_bounds(var, lo, hi).is_ok() && self.propagate().is_ok();
            if ok {
                self.search();
            } else {
                self.conflicts += 1;
                self.clear_queue();
            }
            self.backtrack(mark);
        }
    }

    fn should_stop(&mut self) -> bool {
        if self.done || self.stopped {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if self.polls % DEADLINE_POLL_INTERVAL == 0 && Instant::now() >= deadline {
                self.stopped = true;
            }
        }
        self.polls += 1;
        self.stopped
    }

    /// The next variable to branch on, and whether it is a path frontier arc.
    fn pick_branch_var(&self) -> Option<(u32, bool)> {
        if let Some(arc) = self.frontier_arc() {
            return Some((arc, true));
        }
        (0..self.lb.len())
            .find(|&v| self.lb[v] < self.ub[v])
            .map(|v| (v as u32, false))
    }

    /// An undecided arc leaving the end of the first unfinished path.
    ///
    /// Hinted arcs are preferred over the strategy's own order.
    fn frontier_arc(&self) -> Option<u32> {
        let open = |v: u32| self.lb[v as usize] < self.ub[v as usize];
        for path in &self.model.paths {
            let mut node = path.source;
            for _ in 0..path.out_arcs.len() {
                let arcs = &path.out_arcs[node];
                if let Some(&(_, head)) = arcs.iter().find(|&&(v, _)| self.lb[v as usize] > 0) {
                    node = head;
                    continue;
                }
                let hinted = arcs
                    .iter()
                    .find(|&&(v, _)| open(v) && self.model.hints[v as usize] == Some(1));
                if let Some(&(v, _)) = hinted.or_else(|| arcs.iter().find(|&&(v, _)| open(v))) {
                    return Some(v);
                }
                break;
            }
        }
        None
    }

    /// Domain splits to try, preferred value first.
    ///
    /// Frontier arcs prefer extending the path.
    fn branch_choices(&mut self, var: u32, frontier: bool) -> Vec<(i64, i64)> {
        let v = var as usize;
        let (lb, ub) = (self.lb[v], self.ub[v]);
        let coeff = self.shared.objective_coeffs[v];
        let natural = if coeff < 0 || frontier { ub } else { lb };
        let mut pref = match self.model.hints[v] {
            Some(h) if !frontier => h.clamp(lb, ub),
            _ => natural,
        };
        // Diversify helper workers.
        if self.index > 0 && self.rng.gen_ratio(1, 4) {
            pref = if pref == lb { ub } else { lb };
        }

        let mut choices = vec![(pref, pref)];
        let below = (pref > lb).then(|| (lb, pref - 1));
        let above = (pref < ub).then(|| (pref + 1, ub));
        if coeff < 0 {
            choices.extend(above);
            choices.extend(below);
        } else {
            choices.extend(below);
            choices.extend(above);
        }
        choices
    }

    fn record_solution(&mut self) {
        let objective = self
            .model
            .objective
            .as_ref()
            .map_or(0, |obj| obj.eval(&self.lb));
        if self.log_progress {
            tracing::info!(
                worker = self.index,
                objective,
                branches = self.branches,
                "improving solution"
            );
        }
        if self.best.as_ref().map_or(true, |(b, _)| objective < *b) {
            self.best = Some((objective, self.lb.clone()));
        }
        if self.model.objective.is_some() {
            self.objective_ub = objective.saturating_sub(1);
        } else {
            self.done = true;
        }
    }

    fn enqueue(&mut self, c: usize) {
        if !self.queued[c] {
            self.queued[c] = true;
            self.queue.push(c);
        }
    }

    fn clear_queue(&mut self) {
        for c in self.queue.drain(..) {
            self.queued[c] = false;
        }
    }

    fn backtrack(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some((v, lb, ub)) = self.trail.pop() {
                self.lb[v as usize] = lb;
                self.ub[v as usize] = ub;
            }
        }
    }

    fn set_bounds(&mut self, var: u32, new_lb: i64, new_ub: i64) -> Propagation {
        let v = var as usize;
        let (lb, ub) = (self.lb[v], self.ub[v]);
        let (nlb, nub) = (new_lb.max(lb), new_ub.min(ub));
        if nlb > nub {
            return Err(Conflict);
        }
        if nlb == lb && nub == ub {
            return Ok(());
        }
        self.trail.push((var, lb, ub));
        self.lb[v] = nlb;
        self.ub[v] = nub;
        let shared = self.shared;
        for &c in &shared.watches[v] {
            self.enqueue(c);
        }
        if shared.objective_coeffs[v] != 0 {
            self.objective_dirty = true;
        }
        Ok(())
    }

    fn set_lb(&mut self, var: u32, value: i128) -> Propagation {
        self.set_bounds(var, clamp_i64(value), POS_INF)
    }

    fn set_ub(&mut self, var: u32, value: i128) -> Propagation {
        self.set_bounds(var, NEG_INF, clamp_i64(value))
    }

    fn literal_value(&self, lit: Literal) -> Option<bool> {
        let v = lit.var as usize;
        (self.lb[v] == self.ub[v]).then(|| (self.lb[v] != 0) != lit.negated)
    }

    fn set_literal(&mut self, lit: Literal, value: bool) -> Propagation {
        if value != lit.negated {
            self.set_bounds(lit.var, 1, POS_INF)
        } else {
            self.set_bounds(lit.var, NEG_INF, 0)
        }
    }

    /// Runs queued constraints and the objective cut until nothing changes.
    fn propagate(&mut self) -> Propagation {
        let model = self.model;
        loop {
            while let Some(c) = self.queue.pop() {
                self.queued[c] = false;
                let result = match &model.constraints[c] {
                    Constraint::Linear(lin) => self.propagate_linear(lin),
                    Constraint::MaxEquality(max) => self.propagate_max(max),
                };
                if result.is_err() {
                    self.clear_queue();
                    return result;
                }
            }
            if !self.objective_dirty {
                return Ok(());
            }
            self.objective_dirty = false;
            if let Err(conflict) = self.propagate_objective() {
                self.clear_queue();
                return Err(conflict);
            }
        }
    }

    fn propagate_linear(&mut self, c: &LinearConstraint) -> Propagation {
        let mut open = None;
        for &lit in &c.enforcement {
            match self.literal_value(lit) {
                Some(false) => return Ok(()),
                Some(true) => {}
                None if open.is_some() => return Ok(()),
                None => open = Some(lit),
            }
        }
        let lb = (c.lb != NEG_INF).then_some(i128::from(c.lb));
        let ub = (c.ub != POS_INF).then_some(i128::from(c.ub));
        if let Some(lit) = open {
            // The last undecided enforcement literal must be false if the
            // constraint can no longer hold.
            let (min, max) = self.sum_bounds(&c.terms);
            if ub.is_some_and(|u| min > u) || lb.is_some_and(|l| max < l) {
                return self.set_literal(lit, false);
            }
            return Ok(());
        }
        self.tighten(&c.terms, lb, ub)
    }

    fn propagate_max(&mut self, m: &MaxEquality) -> Propagation {
        let bounds: Vec<(i128, i128)> = m
            .exprs
            .iter()
            .map(|e| {
                let (lo, hi) = self.sum_bounds(&e.terms);
                let k = i128::from(e.constant);
                (lo + k, hi + k)
            })
            .collect();
        let max_of_min = bounds.iter().map(|b| b.0).max().unwrap_or(i128::MIN);
        let max_of_max = bounds.iter().map(|b| b.1).max().unwrap_or(i128::MIN);
        self.set_lb(m.target, max_of_min)?;
        self.set_ub(m.target, max_of_max)?;

        // With a single expression able to reach the target, it must.
        let target_lb = i128::from(self.lb[m.target as usize]);
        let mut supports = bounds.iter().enumerate().filter(|(_, b)| b.1 >= target_lb);
        match (supports.next(), supports.next()) {
            (None, _) => Err(Conflict),
            (Some((i, _)), None) => {
                let e = &m.exprs[i];
                self.tighten(&e.terms, Some(target_lb - i128::from(e.constant)), None)
            }
            _ => Ok(()),
        }
    }

    fn propagate_objective(&mut self) -> Propagation {
        let model = self.model;
        let Some(obj) = &model.objective else {
            return Ok(());
        };
        if self.objective_ub == POS_INF {
            return Ok(());
        }
        let ub = i128::from(self.objective_ub) - i128::from(obj.constant);
        self.tighten(&obj.terms, None, Some(ub))
    }

    fn sum_bounds(&self, terms: &[(u32, i64)]) -> (i128, i128) {
        let mut min = 0i128;
        let mut max = 0i128;
        for &(v, a) in terms {
            let a = i128::from(a);
            let (lo, hi) = (
                i128::from(self.lb[v as usize]),
                i128::from(self.ub[v as usize]),
            );
            if a > 0 {
                min += a * lo;
                max += a * hi;
            } else {
                min += a * hi;
                max += a * lo;
            }
        }
        (min, max)
    }

    /// Enforces `lb ≤ Σ terms ≤ ub` on the variable bounds.
    fn tighten(&mut self, terms: &[(u32, i64)], lb: Option<i128>, ub: Option<i128>) -> Propagation {
        let (min, max) = self.sum_bounds(terms);
        if ub.is_some_and(|u| min > u) || lb.is_some_and(|l| max < l) {
            return Err(Conflict);
        }
        for &(v, a) in terms {
            let a128 = i128::from(a);
            let (lo, hi) = (
                i128::from(self.lb[v as usize]),
                i128::from(self.ub[v as usize]),
            );
            let (term_min, term_max) = if a > 0 {
                (a128 * lo, a128 * hi)
            } else {
                (a128 * hi, a128 * lo)
            };
            if let Some(u) = ub {
                let slack = u - (min - term_min);
                if a > 0 {
                    self.set_ub(v, floor_div(slack, a128))?;
                } else {
                    self.set_lb(v, ceil_div(slack, a128))?;
                }
            }
            if let Some(l) = lb {
                let need = l - (max - term_max);
                if a > 0 {
                    self.set_lb(v, ceil_div(need, a128))?;
                } else {
                    self.set_ub(v, floor_div(need, a128))?;
                }
            }
        }
        Ok(())
    }
}

fn floor_div(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn ceil_div(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

fn clamp_i64(v: i128) -> i64 {
    v.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
