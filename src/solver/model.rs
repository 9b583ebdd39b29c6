use super::domain::{Domain, MAX_VALUES};

/// Poids d'une cellule pour chacune de ses valeurs.
pub type Weights = [u32; MAX_VALUES];

/// `lo ≤ Σ weights[i][valeur(cells[i])] ≤ hi`
#[derive(Debug, Clone)]
pub struct Linear {
    pub(crate) cells: Vec<usize>,
    pub(crate) weights: Vec<Weights>,
    pub(crate) lo: u32,
    pub(crate) hi: u32,
}

impl Linear {
    pub fn new(terms: Vec<(usize, Weights)>, lo: u32, hi: u32) -> Self {
        let (cells, weights) = terms.into_iter().unzip();
        Self {
            cells,
            weights,
            lo,
            hi,
        }
    }

    /// Compte les cellules qui prennent une valeur de `values`.
    pub fn count(cells: &[usize], values: Domain, lo: u32, hi: u32) -> Self {
        let mut w = [0; MAX_VALUES];
        for v in values.iter() {
            w[v] = 1;
        }
        Self::new(cells.iter().map(|&c| (c, w)).collect(), lo, hi)
    }
}

fn weighted_sum(cells: &[usize], weights: &[Weights], assignment: &[usize]) -> u64 {
    cells
        .iter()
        .zip(weights)
        .map(|(&c, w)| u64::from(w[assignment[c]]))
        .sum()
}

/// Plus grande somme possible, bornée à `hi` : largeur utile des tables de sommes.
pub(crate) fn sum_ceiling(weights: &[Weights], hi: u32) -> usize {
    let max: u64 = weights
        .iter()
        .map(|w| u64::from(w.iter().copied().max().unwrap_or(0)))
        .sum();
    max.min(u64::from(hi)) as usize
}

/// Si `cell ∈ when` alors `then_cell ∈ then`.
#[derive(Debug, Clone)]
pub struct Implies {
    pub(crate) cell: usize,
    pub(crate) when: Domain,
    pub(crate) then_cell: usize,
    pub(crate) then: Domain,
}

impl Implies {
    pub fn new(cell: usize, when: Domain, then_cell: usize, then: Domain) -> Self {
        Self {
            cell,
            when,
            then_cell,
            then,
        }
    }
}

/// Somme pondérée sur une suite ordonnée de cellules, avec transitions
/// autorisées entre valeurs consécutives : `next[u]` contient les valeurs
/// admises juste après `u`.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub(crate) cells: Vec<usize>,
    pub(crate) weights: Vec<Weights>,
    pub(crate) lo: u32,
    pub(crate) hi: u32,
    pub(crate) next: [Domain; MAX_VALUES],
}

impl Sequence {
    pub fn new(
        terms: Vec<(usize, Weights)>,
        lo: u32,
        hi: u32,
        next: [Domain; MAX_VALUES],
    ) -> Self {
        let (cells, weights) = terms.into_iter().unzip();
        Self {
            cells,
            weights,
            lo,
            hi,
            next,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Constraint {
    Linear(Linear),
    Implies(Implies),
    Sequence(Sequence),
}

impl Constraint {
    /// Cellules dont un changement de domaine réveille la contrainte.
    pub fn cells(&self) -> Vec<usize> {
        match self {
            Constraint::Linear(c) => c.cells.clone(),
            Constraint::Sequence(c) => c.cells.clone(),
            Constraint::Implies(c) => vec![c.cell, c.then_cell],
        }
    }

    /// Vérifie la contrainte sur une affectation complète.
    pub fn holds(&self, assignment: &[usize]) -> bool {
        match self {
            Constraint::Linear(c) => {
                let t = weighted_sum(&c.cells, &c.weights, assignment);
                u64::from(c.lo) <= t && t <= u64::from(c.hi)
            }
            Constraint::Implies(c) => {
                !c.when.contains(assignment[c.cell]) || c.then.contains(assignment[c.then_cell])
            }
            Constraint::Sequence(c) => {
                let t = weighted_sum(&c.cells, &c.weights, assignment);
                let steps_ok = c
                    .cells
                    .windows(2)
                    .all(|p| c.next[assignment[p[0]]].contains(assignment[p[1]]));
                steps_ok && u64::from(c.lo) <= t && t <= u64::from(c.hi)
            }
        }
    }
}

/// Modèle : un domaine par cellule, les contraintes postées et les
/// contraintes impliquées.
///
/// Les contraintes impliquées ne retirent aucune solution : elles servent à
/// la propagation initiale et à la vérification, pas à la recherche.
#[derive(Debug, Clone)]
pub struct Model {
    values: usize,
    domains: Vec<Domain>,
    constraints: Vec<Constraint>,
    implied: Vec<Constraint>,
}

impl Model {
    pub fn new(cells: usize, values: usize) -> Self {
        Self {
            values,
            domains: vec![Domain::full(values); cells],
            constraints: Vec::new(),
            implied: Vec::new(),
        }
    }

    pub fn values(&self) -> usize {
        self.values
    }
    pub fn cell_count(&self) -> usize {
        self.domains.len()
    }
    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
    pub fn implied(&self) -> &[Constraint] {
        &self.implied
    }

    /// Restreint le domaine initial d'une cellule (décision figée).
    pub fn restrict(&mut self, cell: usize, allowed: Domain) {
        self.domains[cell] = self.domains[cell].intersect(allowed);
    }

    pub fn post(&mut self, c: Constraint) {
        self.constraints.push(c);
    }

    pub fn imply(&mut self, c: Constraint) {
        self.implied.push(c);
    }

    /// Revérifie une affectation complète ; l'erreur décrit la première violation.
    pub fn verify(&self, assignment: &[usize]) -> Result<(), String> {
        if assignment.len() != self.domains.len() {
            return Err(format!(
                "assignment covers {} cells, model has {}",
                assignment.len(),
                self.domains.len()
            ));
        }
        if let Some(cell) = assignment
            .iter()
            .zip(&self.domains)
            .position(|(&v, d)| !d.contains(v))
        {
            return Err(format!("cell {cell} outside its initial domain"));
        }
        if let Some(i) = self.constraints.iter().position(|c| !c.holds(assignment)) {
            return Err(format!("constraint #{i} violated: {:?}", self.constraints[i]));
        }
        match self.implied.iter().position(|c| !c.holds(assignment)) {
            Some(i) => Err(format!("implied constraint #{i} violated: {:?}", self.implied[i])),
            None => Ok(()),
        }
    }
}
