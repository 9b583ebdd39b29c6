//! Recherche CDCL sur des clauses : propagation unitaire à deux littéraux
//! surveillés, apprentissage au premier point d'implication unique,
//! activités VSIDS, redémarrages de Luby et mémoire des phases.
//!
//! Tout est déterministe : activités en flottants mais ordre total
//! (activité décroissante, puis plus petit indice de variable).

use std::ops::Not;

/// Littéral : variable et signe, `2 * var + négation`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub(crate) struct Lit(u32);

impl Lit {
    pub(crate) fn pos(var: usize) -> Self {
        Lit((var as u32) << 1)
    }

    pub(crate) fn neg(var: usize) -> Self {
        Lit((var as u32) << 1 | 1)
    }

    pub(crate) fn var(self) -> usize {
        (self.0 >> 1) as usize
    }

    fn is_neg(self) -> bool {
        self.0 & 1 == 1
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit(self.0 ^ 1)
    }
}

/// Conflits entre deux redémarrages, multipliés par la suite de Luby.
const RESTART_BASE: u64 = 100;
const VAR_DECAY: f64 = 0.95;
const CLAUSE_DECAY: f64 = 0.999;
const RESCALE: f64 = 1e100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SatResult {
    /// Valeur de chaque variable.
    Sat(Vec<bool>),
    Unsat,
    /// Budget de conflits épuisé.
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SatStats {
    pub decisions: u64,
    pub conflicts: u64,
    pub propagations: u64,
}

struct Clause {
    lits: Vec<Lit>,
    learnt: bool,
    activity: f64,
    deleted: bool,
}

/// Tas des variables libres, ordonné par activité.
struct VarOrder {
    heap: Vec<usize>,
    position: Vec<Option<usize>>,
}

impl VarOrder {
    fn new() -> Self {
        Self {
            heap: Vec::new(),
            position: Vec::new(),
        }
    }

    fn grow(&mut self, vars: usize) {
        self.position.resize(vars, None);
    }

    fn before(activity: &[f64], a: usize, b: usize) -> bool {
        activity[a] > activity[b] || (activity[a] == activity[b] && a < b)
    }

    fn contains(&self, var: usize) -> bool {
        self.position[var].is_some()
    }

    fn insert(&mut self, var: usize, activity: &[f64]) {
        if self.contains(var) {
            return;
        }
        self.position[var] = Some(self.heap.len());
        self.heap.push(var);
        self.sift_up(self.heap.len() - 1, activity);
    }

    /// À appeler après une hausse d'activité.
    fn bumped(&mut self, var: usize, activity: &[f64]) {
        if let Some(i) = self.position[var] {
            self.sift_up(i, activity);
        }
    }

    fn pop(&mut self, activity: &[f64]) -> Option<usize> {
        let top = *self.heap.first()?;
        let last = self.heap.len() - 1;
        self.swap(0, last);
        self.heap.pop();
        self.position[top] = None;
        if !self.heap.is_empty() {
            self.sift_down(0, activity);
        }
        Some(top)
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.position[self.heap[i]] = Some(i);
        self.position[self.heap[j]] = Some(j);
    }

    fn sift_up(&mut self, mut i: usize, activity: &[f64]) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !Self::before(activity, self.heap[i], self.heap[parent]) {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize, activity: &[f64]) {
        loop {
            let (l, r) = (2 * i + 1, 2 * i + 2);
            let mut best = i;
            if l < self.heap.len() && Self::before(activity, self.heap[l], self.heap[best]) {
                best = l;
            }
            if r < self.heap.len() && Self::before(activity, self.heap[r], self.heap[best]) {
                best = r;
            }
            if best == i {
                break;
            }
            self.swap(i, best);
            i = best;
        }
    }
}

/// `1, 1, 2, 1, 1, 2, 4, 1, …` (indice à partir de 1).
fn luby(mut i: u64) -> u64 {
    loop {
        let mut k = 1;
        while (1u64 << k) - 1 < i {
            k += 1;
        }
        if (1u64 << k) - 1 == i {
            return 1 << (k - 1);
        }
        i -= (1u64 << (k - 1)) - 1;
    }
}

pub(crate) struct Sat {
    clauses: Vec<Clause>,
    /// `watches[l]` : clauses qui surveillent `l`, visitées quand `l` devient faux.
    watches: Vec<Vec<usize>>,
    units: Vec<Lit>,
    empty_clause: bool,

    assigns: Vec<Option<bool>>,
    level: Vec<usize>,
    reason: Vec<Option<usize>>,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    head: usize,

    activity: Vec<f64>,
    var_inc: f64,
    clause_inc: f64,
    order: VarOrder,
    phase: Vec<bool>,
    seen: Vec<bool>,

    learnts: usize,
    pub(crate) stats: SatStats,
}

impl Sat {
    pub(crate) fn new() -> Self {
        Self {
            clauses: Vec::new(),
            watches: Vec::new(),
            units: Vec::new(),
            empty_clause: false,
            assigns: Vec::new(),
            level: Vec::new(),
            reason: Vec::new(),
            trail: Vec::new(),
            trail_lim: Vec::new(),
            head: 0,
            activity: Vec::new(),
            var_inc: 1.0,
            clause_inc: 1.0,
            order: VarOrder::new(),
            phase: Vec::new(),
            seen: Vec::new(),
            learnts: 0,
            stats: SatStats::default(),
        }
    }

    pub(crate) fn var_count(&self) -> usize {
        self.assigns.len()
    }

    pub(crate) fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    pub(crate) fn new_var(&mut self) -> usize {
        let v = self.assigns.len();
        self.assigns.push(None);
        self.level.push(0);
        self.reason.push(None);
        self.activity.push(0.0);
        self.phase.push(false);
        self.seen.push(false);
        self.watches.push(Vec::new());
        self.watches.push(Vec::new());
        self.order.grow(v + 1);
        v
    }

    /// Ajoute une clause avant la recherche. Une clause vide rend le
    /// problème insatisfiable ; une tautologie est ignorée.
    pub(crate) fn add_clause(&mut self, lits: &[Lit]) {
        let mut lits = lits.to_vec();
        lits.sort_unstable();
        lits.dedup();
        if lits.windows(2).any(|p| p[0] == !p[1]) {
            return;
        }
        match lits.len() {
            0 => self.empty_clause = true,
            1 => self.units.push(lits[0]),
            _ => {
                self.attach(lits, false);
            }
        }
    }

    fn attach(&mut self, lits: Vec<Lit>, learnt: bool) -> usize {
        let id = self.clauses.len();
        self.watches[lits[0].index()].push(id);
        self.watches[lits[1].index()].push(id);
        self.clauses.push(Clause {
            lits,
            learnt,
            activity: 0.0,
            deleted: false,
        });
        id
    }

    fn value(&self, l: Lit) -> Option<bool> {
        self.assigns[l.var()].map(|b| b != l.is_neg())
    }

    fn decision_level(&self) -> usize {
        self.trail_lim.len()
    }

    fn assign(&mut self, l: Lit, reason: Option<usize>) {
        let v = l.var();
        self.assigns[v] = Some(!l.is_neg());
        self.level[v] = self.decision_level();
        self.reason[v] = reason;
        self.trail.push(l);
    }

    fn cancel_until(&mut self, level: usize) {
        if self.decision_level() <= level {
            return;
        }
        let stop = self.trail_lim[level];
        for i in (stop..self.trail.len()).rev() {
            let v = self.trail[i].var();
            self.phase[v] = !self.trail[i].is_neg();
            self.assigns[v] = None;
            self.reason[v] = None;
            self.order.insert(v, &self.activity);
        }
        self.trail.truncate(stop);
        self.trail_lim.truncate(level);
        self.head = self.head.min(stop);
    }

    /// Propagation unitaire ; renvoie la clause en conflit.
    fn propagate(&mut self) -> Option<usize> {
        while self.head < self.trail.len() {
            let p = self.trail[self.head];
            self.head += 1;
            self.stats.propagations += 1;
            let falsified = !p;
            let mut watching = std::mem::take(&mut self.watches[falsified.index()]);
            let (mut i, mut j) = (0, 0);
            let mut conflict = None;
            while i < watching.len() {
                let id = watching[i];
                i += 1;
                if self.clauses[id].deleted {
                    continue;
                }
                {
                    let lits = &mut self.clauses[id].lits;
                    if lits[0] == falsified {
                        lits.swap(0, 1);
                    }
                }
                let first = self.clauses[id].lits[0];
                if self.value(first) == Some(true) {
                    watching[j] = id;
                    j += 1;
                    continue;
                }
                let replacement = (2..self.clauses[id].lits.len())
                    .find(|&k| self.value(self.clauses[id].lits[k]) != Some(false));
                if let Some(k) = replacement {
                    self.clauses[id].lits.swap(1, k);
                    let watch = self.clauses[id].lits[1];
                    self.watches[watch.index()].push(id);
                    continue;
                }
                watching[j] = id;
                j += 1;
                if self.value(first) == Some(false) {
                    conflict = Some(id);
                    while i < watching.len() {
                        watching[j] = watching[i];
                        j += 1;
                        i += 1;
                    }
                } else {
                    self.assign(first, Some(id));
                }
            }
            watching.truncate(j);
            self.watches[falsified.index()] = watching;
            if conflict.is_some() {
                self.head = self.trail.len();
                return conflict;
            }
        }
        None
    }

    fn bump_var(&mut self, v: usize) {
        self.activity[v] += self.var_inc;
        if self.activity[v] > RESCALE {
            for a in &mut self.activity {
                *a /= RESCALE;
            }
            self.var_inc /= RESCALE;
        }
        self.order.bumped(v, &self.activity);
    }

    fn bump_clause(&mut self, id: usize) {
        self.clauses[id].activity += self.clause_inc;
        if self.clauses[id].activity > RESCALE {
            for c in self.clauses.iter_mut().filter(|c| c.learnt) {
                c.activity /= RESCALE;
            }
            self.clause_inc /= RESCALE;
        }
    }

    /// Clause apprise (littéral assertif en tête) et niveau de retour.
    fn analyze(&mut self, mut conflict: usize) -> (Vec<Lit>, usize) {
        let mut learnt = vec![Lit(0)];
        let mut pending = 0usize;
        let mut index = self.trail.len();
        let mut asserting: Option<Lit> = None;
        loop {
            if self.clauses[conflict].learnt {
                self.bump_clause(conflict);
            }
            let skip = usize::from(asserting.is_some());
            for k in skip..self.clauses[conflict].lits.len() {
                let q = self.clauses[conflict].lits[k];
                let v = q.var();
                if self.seen[v] || self.level[v] == 0 {
                    continue;
                }
                self.seen[v] = true;
                self.bump_var(v);
                if self.level[v] >= self.decision_level() {
                    pending += 1;
                } else {
                    learnt.push(q);
                }
            }
            loop {
                index -= 1;
                if self.seen[self.trail[index].var()] {
                    break;
                }
            }
            let p = self.trail[index];
            self.seen[p.var()] = false;
            pending -= 1;
            asserting = Some(p);
            if pending == 0 {
                break;
            }
            // p n'est pas une décision : il reste des littéraux du niveau courant
            match self.reason[p.var()] {
                Some(r) => conflict = r,
                None => break,
            }
        }
        if let Some(p) = asserting {
            learnt[0] = !p;
        }

        // un littéral dont la raison est déjà couverte par la clause est superflu
        let mut minimized = vec![learnt[0]];
        for &l in &learnt[1..] {
            let redundant = self.reason[l.var()].is_some_and(|r| {
                self.clauses[r].lits[1..]
                    .iter()
                    .all(|q| self.seen[q.var()] || self.level[q.var()] == 0)
            });
            if !redundant {
                minimized.push(l);
            }
        }
        for l in &learnt[1..] {
            self.seen[l.var()] = false;
        }

        if minimized.len() == 1 {
            return (minimized, 0);
        }
        let mut max = 1;
        for i in 2..minimized.len() {
            if self.level[minimized[i].var()] > self.level[minimized[max].var()] {
                max = i;
            }
        }
        minimized.swap(1, max);
        let back = self.level[minimized[1].var()];
        (minimized, back)
    }

    fn locked(&self, id: usize) -> bool {
        let first = self.clauses[id].lits[0];
        self.reason[first.var()] == Some(id) && self.value(first) == Some(true)
    }

    /// Oublie la moitié la moins active des clauses apprises.
    fn reduce(&mut self) {
        let mut candidates: Vec<usize> = (0..self.clauses.len())
            .filter(|&id| {
                let c = &self.clauses[id];
                c.learnt && !c.deleted && c.lits.len() > 2 && !self.locked(id)
            })
            .collect();
        candidates.sort_by(|&a, &b| {
            self.clauses[a]
                .activity
                .total_cmp(&self.clauses[b].activity)
                .then(a.cmp(&b))
        });
        for &id in &candidates[..candidates.len() / 2] {
            self.clauses[id].deleted = true;
            self.clauses[id].lits = Vec::new();
            self.learnts -= 1;
        }
        let clauses = &self.clauses;
        for list in &mut self.watches {
            list.retain(|&id| !clauses[id].deleted);
        }
    }

    fn decide(&mut self) -> Option<Lit> {
        while let Some(v) = self.order.pop(&self.activity) {
            if self.assigns[v].is_none() {
                return Some(if self.phase[v] { Lit::pos(v) } else { Lit::neg(v) });
            }
        }
        None
    }

    /// Cherche une affectation ; au-delà de `max_conflicts` conflits, abandonne.
    pub(crate) fn solve(&mut self, max_conflicts: u64) -> SatResult {
        if self.empty_clause {
            return SatResult::Unsat;
        }
        for v in 0..self.var_count() {
            self.order.insert(v, &self.activity);
        }
        for l in std::mem::take(&mut self.units) {
            match self.value(l) {
                Some(false) => return SatResult::Unsat,
                Some(true) => {}
                None => self.assign(l, None),
            }
        }

        let mut max_learnts = (self.clauses.len() / 3).max(1_000);
        let mut restarts = 1;
        let mut budget = RESTART_BASE * luby(restarts);
        let mut since_restart = 0;
        loop {
            if let Some(conflict) = self.propagate() {
                self.stats.conflicts += 1;
                since_restart += 1;
                if self.decision_level() == 0 {
                    return SatResult::Unsat;
                }
                if self.stats.conflicts > max_conflicts {
                    return SatResult::Unknown;
                }
                let (learnt, back) = self.analyze(conflict);
                self.cancel_until(back);
                if learnt.len() == 1 {
                    self.assign(learnt[0], None);
                } else {
                    let first = learnt[0];
                    let id = self.attach(learnt, true);
                    self.learnts += 1;
                    self.bump_clause(id);
                    self.assign(first, Some(id));
                }
                self.var_inc /= VAR_DECAY;
                self.clause_inc /= CLAUSE_DECAY;
                continue;
            }
            if since_restart >= budget {
                restarts += 1;
                budget = RESTART_BASE * luby(restarts);
                since_restart = 0;
                self.cancel_until(0);
                continue;
            }
            if self.learnts >= max_learnts + self.trail.len() {
                self.reduce();
                max_learnts += max_learnts / 10;
            }
            let Some(decision) = self.decide() else {
                let model = self.assigns.iter().map(|a| a.unwrap_or(false)).collect();
                return SatResult::Sat(model);
            };
            self.stats.decisions += 1;
            self.trail_lim.push(self.trail.len());
            self.assign(decision, None);
        }
    }
}
