use super::encode::Encoding;
use super::model::Model;
use super::propagate::Store;
use super::sat::SatResult;
use tracing::{debug, info};

/// Compteurs de la recherche.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Décisions prises.
    pub nodes: u64,
    /// Conflits rencontrés.
    pub failures: u64,
    pub propagations: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Une valeur par cellule.
    Solved(Vec<usize>),
    Infeasible,
    /// Budget de conflits épuisé sans verdict.
    Aborted,
}

/// Propagation initiale sur toutes les contraintes (impliquées comprises),
/// puis recherche avec apprentissage de clauses sur les contraintes postées,
/// restreintes aux domaines réduits.
pub fn search(model: &Model, max_failures: u64) -> (SearchOutcome, SearchStats) {
    let mut stats = SearchStats::default();
    let outcome = run(model, max_failures, &mut stats);
    info!(
        nodes = stats.nodes,
        failures = stats.failures,
        propagations = stats.propagations,
        verdict = match &outcome {
            SearchOutcome::Solved(_) => "solved",
            SearchOutcome::Infeasible => "infeasible",
            SearchOutcome::Aborted => "aborted",
        },
        "search finished"
    );
    (outcome, stats)
}

fn run(model: &Model, max_failures: u64, stats: &mut SearchStats) -> SearchOutcome {
    if model.domains().iter().any(|d| d.is_empty()) {
        debug!("empty initial domain");
        return SearchOutcome::Infeasible;
    }
    let mut store = Store::new(model);
    store.enqueue_all();
    let root = store.propagate();
    stats.propagations = store.propagations;
    if root.is_err() {
        debug!("conflict at root propagation");
        return SearchOutcome::Infeasible;
    }

    let mut encoding = Encoding::new(model, store.domains());
    debug!(
        variables = encoding.sat.var_count(),
        clauses = encoding.sat.clause_count(),
        "model encoded"
    );
    let result = encoding.sat.solve(max_failures);
    let sat = encoding.sat.stats;
    stats.nodes = sat.decisions;
    stats.failures = sat.conflicts;
    stats.propagations += sat.propagations;
    match result {
        SatResult::Sat(values) => SearchOutcome::Solved(encoding.decode(&values)),
        SatResult::Unsat => SearchOutcome::Infeasible,
        SatResult::Unknown => SearchOutcome::Aborted,
    }
}
