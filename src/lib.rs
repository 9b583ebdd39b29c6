#![forbid(unsafe_code)]
//! Roulement : génération du planning mensuel d'une équipe de soins (sans BD).
//!
//! - Calendrier du mois, jours de week-end, heures dues.
//! - Modèle de contraintes (heures, repos, quotas, couverture) et moteur de
//!   recherche déterministe (propagation, puis apprentissage de clauses).
//! - Adaptateurs CSV (modèle vierge, import des demandes, export du planning)
//!   et configuration JSON.

pub mod calendar;
pub mod io;
pub mod model;
pub mod rules;
pub mod scheduler;
pub mod solver;
pub mod storage;

pub use calendar::Period;
pub use model::{PreAssignments, RawShiftCode, Roster, ShiftType, StaffId};
pub use rules::{Bounds, Coverage, RuleParameters, ShiftHours};
pub use scheduler::{solve, Schedule, Scheduler, SolveError, SolveOutcome};
pub use solver::SearchStats;
pub use storage::{Config, JsonStorage, Storage};
