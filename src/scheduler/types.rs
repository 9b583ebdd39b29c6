use super::materialize::Schedule;
use crate::solver::SearchStats;
use thiserror::Error;

/// Résultat métier d'une résolution ; l'infaisabilité n'est pas une erreur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Solved(Schedule),
    /// Aucune affectation ne respecte toutes les règles.
    Infeasible,
    /// Budget de conflits épuisé : ni solution ni preuve d'absence.
    SearchAborted(SearchStats),
}

impl SolveOutcome {
    pub fn schedule(&self) -> Option<&Schedule> {
        match self {
            SolveOutcome::Solved(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("invalid period: {year}-{month}")]
    InvalidPeriod { year: i32, month: u32 },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown rule parameter: {0}")]
    UnknownRule(String),
    #[error("invalid rule parameter: {0}")]
    InvalidRule(String),
    #[error("internal error: {0}")]
    Internal(String),
}
