//! Diagnostic codes and helper functions for routing findings.
//!
//! Routing codes `R001`--`R004` describe the flows and the routes found.
//! Solver codes `S001`--`S004` describe how the solve ended.

use tessera_diagnostics::{Category, Diagnostic, DiagnosticCode};

/// A flow's demand rescales to zero and will not count toward congestion.
pub const R001: DiagnosticCode = DiagnosticCode {
    category: Category::Routing,
    number: 1,
};

/// The returned routing leaves links congested.
pub const R002: DiagnosticCode = DiagnosticCode {
    category: Category::Routing,
    number: 2,
};

/// Latency-constrained flows exceed their hop budget.
pub const R003: DiagnosticCode = DiagnosticCode {
    category: Category::Routing,
    number: 3,
};

/// A flow starts and ends at the same router.
pub const R004: DiagnosticCode = DiagnosticCode {
    category: Category::Routing,
    number: 4,
};

/// The solver proved that no routing satisfies the constraints.
pub const S001: DiagnosticCode = DiagnosticCode {
    category: Category::Solver,
    number: 1,
};

/// The solver stopped before finding any routing.
pub const S002: DiagnosticCode = DiagnosticCode {
    category: Category::Solver,
    number: 2,
};

/// The solver stopped before proving its routing optimal.
pub const S003: DiagnosticCode = DiagnosticCode {
    category: Category::Solver,
    number: 3,
};

/// The bandwidth refinement solve found nothing; the first routing is kept.
pub const S004: DiagnosticCode = DiagnosticCode {
    category: Category::Solver,
    number: 4,
};

/// Creates a warning for a flow whose demand truncates to zero.
pub fn warn_zero_rescaled_bandwidth(flow: &str, bandwidth: f64, resolution: i64) -> Diagnostic {
    Diagnostic::warning(
        R001,
        format!("flow `{flow}` demand {bandwidth} rescales to zero at resolution {resolution}"),
    )
    .with_help("increase the bandwidth resolution to account for small flows")
}

/// Creates a warning listing congested links.
pub fn warn_congested_links(links: &[String]) -> Diagnostic {
    Diagnostic::warning(
        R002,
        format!(
            "{} link(s) carry more than their capacity: {}",
            links.len(),
            links.join(", ")
        ),
    )
}

/// Creates a warning for flows routed over their hop budget.
pub fn warn_latency_overrun(flows: &[(String, i64)]) -> Diagnostic {
    let detail: Vec<String> = flows
        .iter()
        .map(|(name, hops)| format!("`{name}` (+{hops})"))
        .collect();
    Diagnostic::warning(
        R003,
        format!(
            "{} flow(s) exceed their latency budget: {}",
            flows.len(),
            detail.join(", ")
        ),
    )
}

/// Creates a note for a flow whose endpoints share a router.
pub fn note_local_flow(flow: &str) -> Diagnostic {
    Diagnostic::note(
        R004,
        format!("flow `{flow}` starts and ends at the same router and needs no links"),
    )
}

/// Creates a warning for an infeasible routing problem.
pub fn warn_infeasible(flows: usize) -> Diagnostic {
    Diagnostic::warning(S001, format!("no legal routing exists for {flows} flow(s)"))
        .with_help("check the turn model and the router placement")
}

/// Creates a warning for a solve that ended without a solution.
pub fn warn_no_solution() -> Diagnostic {
    Diagnostic::warning(S002, "solver stopped before finding a routing")
        .with_help("raise the time limit")
}

/// Creates a note for a routing that was not proven optimal.
pub fn note_not_proven_optimal(objective: i64) -> Diagnostic {
    Diagnostic::note(
        S003,
        format!("time limit reached; best routing has objective {objective}"),
    )
}

/// Creates a note for a bandwidth refinement solve that found nothing.
pub fn note_refinement_fallback(status: impl std::fmt::Display) -> Diagnostic {
    Diagnostic::note(
        S004,
        format!("bandwidth refinement ended {status}; keeping the first routing"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_diagnostics::Severity;

    #[test]
    fn codes_display() {
        assert_eq!(R001.to_string(), "R001");
        assert_eq!(S004.to_string(), "S004");
    }

    #[test]
    fn helpers_pick_severity() {
        assert_eq!(warn_infeasible(2).severity, Severity::Warning);
        assert_eq!(note_local_flow("f").severity, Severity::Note);
        assert_eq!(warn_no_solution().code, S002);
    }

    #[test]
    fn overrun_message_lists_flows() {
        let d = warn_latency_overrun(&[("f0".into(), 1), ("f2".into(), 3)]);
        assert!(d.message.contains("`f0` (+1)"));
        assert!(d.message.contains("`f2` (+3)"));
    }
}
