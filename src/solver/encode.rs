//! Traduction du modèle en clauses.
//!
//! Une variable booléenne par couple (cellule, valeur encore possible),
//! exactement une vraie par cellule. Chaque somme pondérée devient un
//! diagramme de sommes partielles couche par couche : un nœud par somme
//! atteignable qui peut encore finir dans les bornes, un nœud « acquis »
//! quand toute suite convient.

use super::domain::{Domain, MAX_VALUES};
use super::model::{Constraint, Implies, Model, Sequence, Weights};
use super::sat::{Lit, Sat};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
enum Node {
    Open(u64),
    Done,
}

#[derive(Clone, Copy, Debug)]
struct Edge {
    from: u64,
    weight: u64,
    to: Node,
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

pub(crate) struct Encoding {
    pub(crate) sat: Sat,
    cells: Vec<[Option<usize>; MAX_VALUES]>,
}

impl Encoding {
    /// Encode les contraintes postées (pas les impliquées) sur les domaines
    /// donnés, en général ceux issus de la propagation initiale.
    pub(crate) fn new(model: &Model, domains: &[Domain]) -> Self {
        let mut sat = Sat::new();
        let mut cells = Vec::with_capacity(domains.len());
        for d in domains {
            let mut vars = [None; MAX_VALUES];
            for v in d.iter() {
                vars[v] = Some(sat.new_var());
            }
            let present: Vec<usize> = vars.iter().flatten().copied().collect();
            sat.add_clause(&present.iter().map(|&x| Lit::pos(x)).collect::<Vec<_>>());
            for (i, &a) in present.iter().enumerate() {
                for &b in &present[i + 1..] {
                    sat.add_clause(&[Lit::neg(a), Lit::neg(b)]);
                }
            }
            cells.push(vars);
        }
        let mut enc = Self { sat, cells };
        for c in model.constraints() {
            match c {
                Constraint::Linear(c) => enc.linear(&c.cells, &c.weights, c.lo, c.hi),
                Constraint::Implies(c) => enc.implies(c),
                Constraint::Sequence(c) => enc.sequence(c),
            }
        }
        enc
    }

    /// Valeur de chaque cellule dans une affectation des variables.
    pub(crate) fn decode(&self, model: &[bool]) -> Vec<usize> {
        self.cells
            .iter()
            .map(|vars| {
                vars.iter()
                    .position(|x| x.is_some_and(|x| model[x]))
                    .unwrap_or(usize::MAX)
            })
            .collect()
    }

    fn literals(&self, cell: usize, values: Domain) -> Vec<Lit> {
        values
            .iter()
            .filter_map(|v| self.cells[cell][v].map(Lit::pos))
            .collect()
    }

    fn implies(&mut self, c: &Implies) {
        let then = self.literals(c.then_cell, c.then);
        for v in c.when.iter() {
            if let Some(x) = self.cells[c.cell][v] {
                let mut clause = vec![Lit::neg(x)];
                clause.extend(&then);
                self.sat.add_clause(&clause);
            }
        }
    }

    fn sequence(&mut self, c: &Sequence) {
        for pair in c.cells.windows(2) {
            for u in 0..MAX_VALUES {
                if let Some(x) = self.cells[pair[0]][u] {
                    let mut clause = vec![Lit::neg(x)];
                    clause.extend(self.literals(pair[1], c.next[u]));
                    self.sat.add_clause(&clause);
                }
            }
        }
        self.linear(&c.cells, &c.weights, c.lo, c.hi);
    }

    /// `lo ≤ Σ weights[i][valeur(cells[i])] ≤ hi`, poids divisés par leur pgcd.
    fn linear(&mut self, cells: &[usize], weights: &[Weights], lo: u32, hi: u32) {
        let mut terms: Vec<Vec<(usize, u64)>> = cells
            .iter()
            .zip(weights)
            .map(|(&cell, w)| {
                (0..MAX_VALUES)
                    .filter_map(|v| self.cells[cell][v].map(|x| (x, u64::from(w[v]))))
                    .collect()
            })
            .collect();
        let g = terms.iter().flatten().fold(0, |g, &(_, w)| gcd(g, w));
        if g == 0 {
            if lo > 0 {
                self.sat.add_clause(&[]);
            }
            return;
        }
        let (lo, hi) = (u64::from(lo).div_ceil(g), u64::from(hi) / g);
        if lo > hi {
            self.sat.add_clause(&[]);
            return;
        }
        for term in &mut terms {
            for (_, w) in term.iter_mut() {
                *w /= g;
            }
        }

        let k = terms.len();
        let (mut min_rest, mut max_rest) = (vec![0u64; k + 1], vec![0u64; k + 1]);
        for i in (0..k).rev() {
            let ws = terms[i].iter().map(|t| t.1);
            min_rest[i] = min_rest[i + 1] + ws.clone().min().unwrap_or(0);
            max_rest[i] = max_rest[i + 1] + ws.max().unwrap_or(0);
        }
        let classify = |i: usize, t: u64| {
            if t + min_rest[i] > hi || t + max_rest[i] < lo {
                None
            } else if t + min_rest[i] >= lo && t + max_rest[i] <= hi {
                Some(Node::Done)
            } else {
                Some(Node::Open(t))
            }
        };
        let start = match classify(0, 0) {
            None => {
                self.sat.add_clause(&[]);
                return;
            }
            Some(Node::Done) => return,
            Some(node) => node,
        };

        // couches en avant, puis élagage des nœuds sans issue
        let steps: Vec<Vec<u64>> = terms
            .iter()
            .map(|t| {
                let mut ws: Vec<u64> = t.iter().map(|x| x.1).collect();
                ws.sort_unstable();
                ws.dedup();
                ws
            })
            .collect();
        let mut layers: Vec<BTreeSet<Node>> = vec![BTreeSet::from([start])];
        let mut arcs: Vec<Vec<Edge>> = Vec::with_capacity(k);
        for i in 0..k {
            let mut next = BTreeSet::new();
            let mut out = Vec::new();
            for &node in &layers[i] {
                match node {
                    Node::Done => {
                        next.insert(Node::Done);
                    }
                    Node::Open(s) => {
                        for &weight in &steps[i] {
                            if let Some(to) = classify(i + 1, s + weight) {
                                out.push(Edge { from: s, weight, to });
                                next.insert(to);
                            }
                        }
                    }
                }
            }
            arcs.push(out);
            layers.push(next);
        }
        let mut alive: Vec<BTreeSet<Node>> = vec![BTreeSet::new(); k + 1];
        alive[k] = layers[k].clone();
        for i in (0..k).rev() {
            arcs[i].retain(|a| alive[i + 1].contains(&a.to));
            let mut here: BTreeSet<Node> = arcs[i].iter().map(|a| Node::Open(a.from)).collect();
            if layers[i].contains(&Node::Done) {
                here.insert(Node::Done);
            }
            alive[i] = here;
        }
        if !alive[0].contains(&start) {
            self.sat.add_clause(&[]);
            return;
        }

        // la racine est vraie sans variable
        let nodes: Vec<BTreeMap<Node, Option<usize>>> = alive
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                layer
                    .iter()
                    .map(|&n| (n, (i > 0).then(|| self.sat.new_var())))
                    .collect()
            })
            .collect();
        let not_node = |i: usize, n: Node| -> Vec<Lit> {
            nodes[i].get(&n).copied().flatten().map(Lit::neg).into_iter().collect()
        };

        for i in 0..k {
            let arc_vars: Vec<usize> = arcs[i].iter().map(|_| self.sat.new_var()).collect();
            for (a, &t) in arcs[i].iter().zip(&arc_vars) {
                if let Some(Some(q)) = nodes[i].get(&Node::Open(a.from)) {
                    self.sat.add_clause(&[Lit::neg(t), Lit::pos(*q)]);
                }
                if let Some(Some(q)) = nodes[i + 1].get(&a.to) {
                    self.sat.add_clause(&[Lit::neg(t), Lit::pos(*q)]);
                }
                let mut clause = vec![Lit::neg(t)];
                clause.extend(
                    terms[i]
                        .iter()
                        .filter(|&&(_, w)| w == a.weight)
                        .map(|&(x, _)| Lit::pos(x)),
                );
                self.sat.add_clause(&clause);
            }

            // un nœud ouvert a une sortie, et chaque valeur y mène ou est exclue
            for &node in nodes[i].keys() {
                let Node::Open(s) = node else { continue };
                let mut clause = not_node(i, node);
                clause.extend(
                    arcs[i]
                        .iter()
                        .zip(&arc_vars)
                        .filter(|(a, _)| a.from == s)
                        .map(|(_, &t)| Lit::pos(t)),
                );
                self.sat.add_clause(&clause);
                for &(x, w) in &terms[i] {
                    let mut clause = not_node(i, node);
                    clause.push(Lit::neg(x));
                    let edge = arcs[i]
                        .iter()
                        .zip(&arc_vars)
                        .find(|(a, _)| a.from == s && a.weight == w);
                    if let Some((_, &t)) = edge {
                        clause.push(Lit::pos(t));
                    }
                    self.sat.add_clause(&clause);
                }
            }

            // « acquis » se transmet et accepte toute valeur
            let carry: Option<Lit> = nodes[i].get(&Node::Done).copied().flatten().map(Lit::pos);
            if let (Some(d), Some(Some(next))) = (carry, nodes[i + 1].get(&Node::Done)) {
                self.sat.add_clause(&[!d, Lit::pos(*next)]);
            }
            for (&node, q) in &nodes[i + 1] {
                let Some(q) = *q else { continue };
                let mut clause = vec![Lit::neg(q)];
                clause.extend(
                    arcs[i]
                        .iter()
                        .zip(&arc_vars)
                        .filter(|(a, _)| a.to == node)
                        .map(|(_, &t)| Lit::pos(t)),
                );
                if node == Node::Done {
                    clause.extend(carry);
                }
                self.sat.add_clause(&clause);
            }
            for &(x, w) in &terms[i] {
                let mut clause = vec![Lit::neg(x)];
                clause.extend(
                    arcs[i]
                        .iter()
                        .zip(&arc_vars)
                        .filter(|(a, _)| a.weight == w)
                        .map(|(_, &t)| Lit::pos(t)),
                );
                clause.extend(carry);
                self.sat.add_clause(&clause);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::model::Linear;
    use crate::solver::sat::SatResult;

    fn w(ws: &[u32]) -> Weights {
        let mut out = [0; MAX_VALUES];
        out[..ws.len()].copy_from_slice(ws);
        out
    }

    /// Vrai si l'affectation complète `values` satisfait les clauses.
    fn accepts(model: &Model, values: &[usize]) -> bool {
        let mut domains = model.domains().to_vec();
        for (d, &v) in domains.iter_mut().zip(values) {
            *d = d.intersect(Domain::singleton(v));
        }
        let mut enc = Encoding::new(model, &domains);
        matches!(enc.sat.solve(1_000), SatResult::Sat(_))
    }

    /// Toutes les affectations de `cells` cellules à `values` valeurs.
    fn every_assignment(cells: usize, values: usize) -> Vec<Vec<usize>> {
        (0..values.pow(cells as u32))
            .map(|mut code| {
                (0..cells)
                    .map(|_| {
                        let v = code % values;
                        code /= values;
                        v
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn linear_accepts_exactly_the_sums_in_range() {
        // poids 12, 1, 4 ; 2, 8 ; 6, 8 : le nœud acquis apparaît avant la fin
        let mut m = Model::new(3, 3);
        let terms = vec![(0, w(&[12, 1, 4])), (1, w(&[2, 8, 8])), (2, w(&[6, 8, 0]))];
        m.post(Constraint::Linear(Linear::new(terms.clone(), 14, 22)));
        for values in every_assignment(3, 3) {
            let sum: u32 = terms.iter().zip(&values).map(|((_, w), &v)| w[v]).sum();
            assert_eq!(accepts(&m, &values), (14..=22).contains(&sum), "{values:?}");
        }
    }

    #[test]
    fn hours_are_scaled_by_their_gcd() {
        // 0, 8, 12 h sur 4 jours, 32 h exactement
        let mut m = Model::new(4, 3);
        let terms = (0..4).map(|c| (c, w(&[0, 8, 12]))).collect();
        m.post(Constraint::Linear(Linear::new(terms, 32, 32)));
        for values in every_assignment(4, 3) {
            let sum: u32 = values.iter().map(|&v| [0, 8, 12][v]).sum();
            assert_eq!(accepts(&m, &values), sum == 32, "{values:?}");
        }
    }

    #[test]
    fn implication_and_transitions() {
        let mut next = [Domain::full(2); MAX_VALUES];
        next[1] = Domain::singleton(0);
        let mut m = Model::new(3, 2);
        let terms = (0..3).map(|c| (c, w(&[0, 12]))).collect();
        m.post(Constraint::Sequence(Sequence::new(terms, 12, 24, next)));
        m.post(Constraint::Implies(Implies::new(
            0,
            Domain::singleton(0),
            2,
            Domain::singleton(0),
        )));
        for values in every_assignment(3, 2) {
            let expected = Constraint::Sequence(Sequence::new(
                (0..3).map(|c| (c, w(&[0, 12]))).collect(),
                12,
                24,
                next,
            ))
            .holds(&values)
                && (values[0] != 0 || values[2] == 0);
            assert_eq!(accepts(&m, &values), expected, "{values:?}");
        }
    }

    #[test]
    fn unreachable_bounds_give_an_empty_clause() {
        let mut m = Model::new(2, 2);
        let terms = (0..2).map(|c| (c, w(&[0, 8]))).collect();
        m.post(Constraint::Linear(Linear::new(terms, 4, 4)));
        let mut enc = Encoding::new(&m, m.domains());
        assert_eq!(enc.sat.solve(10), SatResult::Unsat);
    }

    #[test]
    fn decode_reads_one_value_per_cell() {
        let mut m = Model::new(2, 3);
        m.restrict(1, Domain::singleton(2));
        m.post(Constraint::Linear(Linear::count(&[0, 1], Domain::singleton(1), 1, 1)));
        let mut enc = Encoding::new(&m, m.domains());
        let SatResult::Sat(model) = enc.sat.solve(100) else {
            panic!("satisfiable");
        };
        assert_eq!(enc.decode(&model), vec![1, 2]);
    }
}
