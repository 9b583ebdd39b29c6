mod builder;
mod materialize;
mod normalize;
mod types;

pub use materialize::{DayEntry, Schedule, StaffSchedule};
pub use types::{SolveError, SolveOutcome};

use crate::calendar::Period;
use crate::model::{PreAssignments, Roster, ShiftType};
use crate::rules::RuleParameters;
use crate::solver::{self, SearchOutcome};
use tracing::{error, info};

/// Scheduler : une période, une équipe et des règles, prêts à résoudre.
///
/// Aucun état partagé entre deux résolutions : chaque appel à [`Scheduler::solve`]
/// construit son propre modèle.
#[derive(Debug, Clone)]
pub struct Scheduler {
    period: Period,
    roster: Roster,
    rules: RuleParameters,
}

impl Scheduler {
    pub fn new(period: Period, roster: Roster) -> Self {
        Self {
            period,
            roster,
            rules: RuleParameters::default(),
        }
    }

    pub fn with_rules(mut self, rules: RuleParameters) -> Self {
        self.rules = rules;
        self
    }

    pub fn period(&self) -> &Period {
        &self.period
    }
    pub fn roster(&self) -> &Roster {
        &self.roster
    }
    pub fn rules(&self) -> &RuleParameters {
        &self.rules
    }

    /// Heures dues par chaque personne sur la période.
    pub fn required_hours(&self) -> u32 {
        self.rules.required_hours(self.period.working_day_count())
    }

    pub fn solve(&self, pre: &PreAssignments) -> Result<SolveOutcome, SolveError> {
        solve(&self.period, &self.roster, pre, &self.rules)
    }
}

/// Résout le planning : validation, modèle, recherche, puis vérification de
/// la solution avant de la matérialiser.
pub fn solve(
    period: &Period,
    roster: &Roster,
    pre: &PreAssignments,
    rules: &RuleParameters,
) -> Result<SolveOutcome, SolveError> {
    if roster.is_empty() {
        return Err(SolveError::InvalidInput("staff list is empty".into()));
    }
    rules.validate()?;
    normalize::validate(period, roster, pre)?;

    let built = builder::build(period, roster, rules, pre);
    let (outcome, stats) = solver::search(&built.model, rules.max_failures);
    let assignment = match outcome {
        SearchOutcome::Solved(a) => a,
        SearchOutcome::Infeasible => return Ok(SolveOutcome::Infeasible),
        SearchOutcome::Aborted => return Ok(SolveOutcome::SearchAborted(stats)),
    };
    if let Err(violation) = built.model.verify(&assignment) {
        error!(%violation, "solved assignment failed verification");
        return Err(SolveError::Internal(violation));
    }

    let layout = built.layout;
    let mut grid = Vec::with_capacity(layout.staff);
    for n in 0..layout.staff {
        let row = (0..layout.days)
            .map(|d| {
                ShiftType::from_index(assignment[layout.cell(n, d)]).ok_or_else(|| {
                    SolveError::Internal(format!("cell ({n}, {d}) has no shift"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        grid.push(row);
    }
    let schedule = Schedule::from_grid(period, roster, &rules.hours, grid)?;
    info!(
        required_hours = built.required_hours,
        overridden_requests = built.summary.overridden,
        nodes = stats.nodes,
        failures = stats.failures,
        "schedule solved"
    );
    Ok(SolveOutcome::Solved(schedule))
}
