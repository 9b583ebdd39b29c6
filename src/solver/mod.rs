//! Moteur générique de satisfaction de contraintes sur de petits domaines.
//!
//! Chaque cellule porte un ensemble de valeurs possibles (un booléen par
//! couple cellule/valeur). Les contraintes linéaires, d'implication et de
//! séquence élaguent d'abord ces ensembles par propagation ; le modèle
//! réduit est ensuite traduit en clauses et résolu par apprentissage de
//! conflits. Aucune horloge ni hasard : à entrées égales, même verdict.

mod domain;
mod encode;
mod model;
mod propagate;
mod sat;
mod search;
mod sumset;

pub use domain::{Domain, MAX_VALUES};
pub use model::{Constraint, Implies, Linear, Model, Sequence, Weights};
pub use search::{search, SearchOutcome, SearchStats};
