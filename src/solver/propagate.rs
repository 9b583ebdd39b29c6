use super::domain::{Domain, MAX_VALUES};
use super::model::{sum_ceiling, Constraint, Implies, Linear, Model, Sequence};
use super::sumset::SumSet;
use std::collections::VecDeque;

/// Domaine vidé : le modèle est sans solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Conflict;

/// Domaines courants + file de réveil des contraintes.
///
/// Propage contraintes postées et impliquées jusqu'au point fixe, avant
/// l'encodage en clauses.
pub(crate) struct Store<'m> {
    constraints: Vec<&'m Constraint>,
    values: usize,
    domains: Vec<Domain>,
    watches: Vec<Vec<usize>>,
    queue: VecDeque<usize>,
    queued: Vec<bool>,
    pub(crate) propagations: u64,
}

impl<'m> Store<'m> {
    pub(crate) fn new(model: &'m Model) -> Self {
        let constraints: Vec<&Constraint> =
            model.constraints().iter().chain(model.implied()).collect();
        let mut watches = vec![Vec::new(); model.cell_count()];
        for (i, c) in constraints.iter().enumerate() {
            for cell in c.cells() {
                watches[cell].push(i);
            }
        }
        let queued = vec![false; constraints.len()];
        Self {
            constraints,
            values: model.values(),
            domains: model.domains().to_vec(),
            watches,
            queue: VecDeque::new(),
            queued,
            propagations: 0,
        }
    }

    pub(crate) fn domains(&self) -> &[Domain] {
        &self.domains
    }

    /// Intersecte le domaine de `cell` avec `allowed` et réveille ses contraintes.
    pub(crate) fn restrict(&mut self, cell: usize, allowed: Domain) -> Result<(), Conflict> {
        let old = self.domains[cell];
        let new = old.intersect(allowed);
        if new == old {
            return Ok(());
        }
        self.domains[cell] = new;
        if new.is_empty() {
            return Err(Conflict);
        }
        for &ci in &self.watches[cell] {
            if !self.queued[ci] {
                self.queued[ci] = true;
                self.queue.push_back(ci);
            }
        }
        Ok(())
    }

    pub(crate) fn enqueue_all(&mut self) {
        for ci in 0..self.constraints.len() {
            if !self.queued[ci] {
                self.queued[ci] = true;
                self.queue.push_back(ci);
            }
        }
    }

    fn clear_queue(&mut self) {
        while let Some(ci) = self.queue.pop_front() {
            self.queued[ci] = false;
        }
    }

    pub(crate) fn propagate(&mut self) -> Result<(), Conflict> {
        while let Some(ci) = self.queue.pop_front() {
            self.queued[ci] = false;
            self.propagations += 1;
            let constraint = self.constraints[ci];
            let res = match constraint {
                Constraint::Linear(c) => self.linear(c),
                Constraint::Implies(c) => self.implies(c),
                Constraint::Sequence(c) => self.sequence(c),
            };
            if res.is_err() {
                self.clear_queue();
                return res;
            }
        }
        Ok(())
    }

    fn implies(&mut self, c: &Implies) -> Result<(), Conflict> {
        if self.domains[c.cell].is_subset_of(c.when) {
            self.restrict(c.then_cell, c.then)?;
        }
        if !self.domains[c.then_cell].intersects(c.then) {
            self.restrict(c.cell, c.when.complement())?;
        }
        Ok(())
    }

    /// Cohérence de domaine par programmation dynamique sur les sommes :
    /// `prefix[i]` = sommes atteignables avec les `i` premiers termes,
    /// puis balayage arrière des compléments admissibles.
    fn linear(&mut self, c: &Linear) -> Result<(), Conflict> {
        let hi = sum_ceiling(&c.weights, c.hi);
        let lo = c.lo as usize;
        if hi < lo {
            return Err(Conflict);
        }
        let width = hi + 1;
        let k = c.cells.len();
        let doms: Vec<Domain> = c.cells.iter().map(|&cell| self.domains[cell]).collect();

        let mut prefix = Vec::with_capacity(k + 1);
        prefix.push(SumSet::zero(width));
        for (i, d) in doms.iter().enumerate() {
            let mut acc = SumSet::empty(width);
            for v in d.iter() {
                acc.union_shifted_up(&prefix[i], c.weights[i][v] as usize);
            }
            prefix.push(acc);
        }

        let mut suffix = SumSet::from(width, lo);
        if !prefix[k].intersects(&suffix) {
            return Err(Conflict);
        }
        for i in (0..k).rev() {
            let mut keep = Domain::EMPTY;
            let mut next = SumSet::empty(width);
            for v in doms[i].iter() {
                let s = suffix.shifted_down(c.weights[i][v] as usize);
                if prefix[i].intersects(&s) {
                    keep = keep.union(Domain::singleton(v));
                    next.union_with(&s);
                }
            }
            if keep != doms[i] {
                self.restrict(c.cells[i], keep)?;
            }
            suffix = next;
        }
        Ok(())
    }

    /// Comme `linear`, avec l'état (valeur précédente, somme partielle).
    fn sequence(&mut self, c: &Sequence) -> Result<(), Conflict> {
        let k = c.cells.len();
        if k == 0 {
            return if c.lo == 0 { Ok(()) } else { Err(Conflict) };
        }
        let (lo, hi) = (c.lo as usize, sum_ceiling(&c.weights, c.hi));
        if hi < lo {
            return Err(Conflict);
        }
        let width = hi + 1;
        let n = self.values.min(MAX_VALUES);
        let doms: Vec<Domain> = c.cells.iter().map(|&cell| self.domains[cell]).collect();
        let empty = SumSet::empty(width);

        // forward[i][v] : sommes atteignables sur 0..=i en finissant par v
        let mut forward: Vec<Vec<SumSet>> = Vec::with_capacity(k);
        let mut first = vec![empty.clone(); n];
        for v in doms[0].iter().filter(|&v| v < n) {
            first[v].union_shifted_up(&SumSet::zero(width), c.weights[0][v] as usize);
        }
        forward.push(first);
        for i in 1..k {
            let mut row = vec![empty.clone(); n];
            for v in doms[i].iter().filter(|&v| v < n) {
                let mut acc = SumSet::empty(width);
                for u in doms[i - 1].iter().filter(|&u| u < n) {
                    if c.next[u].contains(v) {
                        acc.union_with(&forward[i - 1][u]);
                    }
                }
                row[v].union_shifted_up(&acc, c.weights[i][v] as usize);
            }
            forward.push(row);
        }

        // backward[v] : compléments admissibles après la position courante
        let target = SumSet::from(width, lo);
        let mut backward: Vec<SumSet> = (0..n)
            .map(|v| if doms[k - 1].contains(v) { target.clone() } else { empty.clone() })
            .collect();
        let mut keep = vec![Domain::EMPTY; k];
        for i in (0..k).rev() {
            for v in doms[i].iter().filter(|&v| v < n) {
                if forward[i][v].intersects(&backward[v]) {
                    keep[i] = keep[i].union(Domain::singleton(v));
                }
            }
            if keep[i].is_empty() {
                return Err(Conflict);
            }
            if i > 0 {
                let mut prev = vec![empty.clone(); n];
                for u in doms[i - 1].iter().filter(|&u| u < n) {
                    for v in keep[i].iter() {
                        if c.next[u].contains(v) {
                            prev[u].union_with(&backward[v].shifted_down(c.weights[i][v] as usize));
                        }
                    }
                }
                backward = prev;
            }
        }
        for (i, kept) in keep.into_iter().enumerate() {
            if kept != doms[i] {
                self.restrict(c.cells[i], kept)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::model::Weights;

    fn w(ws: &[u32]) -> Weights {
        let mut out = [0; MAX_VALUES];
        out[..ws.len()].copy_from_slice(ws);
        out
    }

    #[test]
    fn linear_prunes_unsupported_values() {
        // 3 cellules, valeurs {0,1,2} de poids 0, 5, 7 ; somme exacte 12
        let mut m = Model::new(3, 3);
        let terms = (0..3).map(|c| (c, w(&[0, 5, 7]))).collect();
        m.post(Constraint::Linear(Linear::new(terms, 12, 12)));
        m.restrict(0, Domain::singleton(0));
        let mut s = Store::new(&m);
        s.enqueue_all();
        s.propagate().unwrap();
        // 12 = 5 + 7 uniquement : la valeur 0 disparaît des cellules 1 et 2
        assert_eq!(s.domains()[1], Domain::from_values([1, 2]));
        assert_eq!(s.domains()[2], Domain::from_values([1, 2]));
        s.restrict(1, Domain::singleton(1)).unwrap();
        s.propagate().unwrap();
        assert_eq!(s.domains()[2].value(), Some(2));
    }

    #[test]
    fn linear_detects_unreachable_sum() {
        let mut m = Model::new(2, 3);
        let terms = (0..2).map(|c| (c, w(&[0, 8, 12]))).collect();
        m.post(Constraint::Linear(Linear::new(terms, 4, 4)));
        let mut s = Store::new(&m);
        s.enqueue_all();
        assert_eq!(s.propagate(), Err(Conflict));
    }

    #[test]
    fn strictly_positive_weights_reach_the_top() {
        let mut m = Model::new(2, 2);
        let terms = (0..2).map(|c| (c, w(&[3, 4]))).collect();
        m.post(Constraint::Linear(Linear::new(terms, 8, u32::MAX)));
        let mut s = Store::new(&m);
        s.enqueue_all();
        s.propagate().unwrap();
        assert_eq!(s.domains()[0].value(), Some(1));
        assert_eq!(s.domains()[1].value(), Some(1));
    }

    #[test]
    fn implication_fires_both_ways() {
        let mut m = Model::new(2, 3);
        m.post(Constraint::Implies(Implies::new(
            0,
            Domain::singleton(2),
            1,
            Domain::singleton(0),
        )));
        let mut s = Store::new(&m);
        s.restrict(0, Domain::singleton(2)).unwrap();
        s.propagate().unwrap();
        assert_eq!(s.domains()[1].value(), Some(0));

        let mut s = Store::new(&m);
        s.restrict(1, Domain::singleton(1)).unwrap();
        s.propagate().unwrap();
        assert_eq!(s.domains()[0], Domain::from_values([0, 1]));
    }

    #[test]
    fn sequence_combines_sum_and_transitions() {
        // valeurs : 0 = repos (0h), 1 = nuit (12h) ; nuit suivie de repos ; 24h sur 4 jours
        let mut next = [Domain::full(2); MAX_VALUES];
        next[1] = Domain::singleton(0);
        let mut m = Model::new(4, 2);
        let terms = (0..4).map(|c| (c, w(&[0, 12]))).collect();
        m.post(Constraint::Sequence(Sequence::new(terms, 24, 24, next)));
        let mut s = Store::new(&m);
        s.enqueue_all();
        s.propagate().unwrap();
        // nuits possibles : {0,2}, {0,3}, {1,3}
        s.restrict(1, Domain::singleton(0)).unwrap();
        s.propagate().unwrap();
        assert_eq!(s.domains()[0].value(), Some(1));
        assert_eq!(s.domains()[2], Domain::full(2));
        s.restrict(2, Domain::singleton(1)).unwrap();
        s.propagate().unwrap();
        assert_eq!(s.domains()[3].value(), Some(0));
    }

    #[test]
    fn implied_constraints_are_propagated() {
        // deux cellules à 1 au plus, impliqué : au moins 2 ⇒ les deux à 1
        let mut m = Model::new(2, 2);
        m.post(Constraint::Linear(Linear::count(&[0, 1], Domain::singleton(1), 0, 2)));
        m.imply(Constraint::Linear(Linear::count(&[0, 1], Domain::singleton(1), 2, 2)));
        let mut s = Store::new(&m);
        s.enqueue_all();
        s.propagate().unwrap();
        assert_eq!(s.domains()[0].value(), Some(1));
        assert_eq!(s.domains()[1].value(), Some(1));
        assert!(m.verify(&[1, 0]).is_err());
        assert!(m.verify(&[1, 1]).is_ok());
    }

    #[test]
    fn sequence_rejects_impossible_rows() {
        let mut next = [Domain::full(2); MAX_VALUES];
        next[1] = Domain::singleton(0);
        let mut m = Model::new(3, 2);
        let terms = (0..3).map(|c| (c, w(&[0, 12]))).collect();
        // 36h imposerait trois nuits d'affilée
        m.post(Constraint::Sequence(Sequence::new(terms, 36, 36, next)));
        let mut s = Store::new(&m);
        s.enqueue_all();
        assert_eq!(s.propagate(), Err(Conflict));
    }
}
