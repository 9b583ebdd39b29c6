use std::fmt;

/// Nombre maximal de valeurs par cellule.
pub const MAX_VALUES: usize = 8;

/// Ensemble des valeurs encore possibles pour une cellule (un bit par valeur).
///
/// Un domaine vide signale un conflit ; un singleton, une cellule décidée.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Domain(u8);

impl Domain {
    pub const EMPTY: Domain = Domain(0);

    /// Les valeurs `0..n`.
    pub fn full(n: usize) -> Self {
        debug_assert!(n <= MAX_VALUES);
        if n >= MAX_VALUES {
            Domain(u8::MAX)
        } else {
            Domain(((1u16 << n) - 1) as u8)
        }
    }

    pub fn singleton(v: usize) -> Self {
        debug_assert!(v < MAX_VALUES);
        Domain(1 << v)
    }

    pub fn from_values<I: IntoIterator<Item = usize>>(values: I) -> Self {
        values
            .into_iter()
            .fold(Domain::EMPTY, |d, v| d.union(Domain::singleton(v)))
    }

    pub fn contains(self, v: usize) -> bool {
        v < MAX_VALUES && self.0 >> v & 1 == 1
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn size(self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_fixed(self) -> bool {
        self.size() == 1
    }

    /// Valeur de la cellule si elle est décidée.
    pub fn value(self) -> Option<usize> {
        self.is_fixed().then(|| self.0.trailing_zeros() as usize)
    }

    pub fn intersect(self, other: Domain) -> Domain {
        Domain(self.0 & other.0)
    }
    pub fn union(self, other: Domain) -> Domain {
        Domain(self.0 | other.0)
    }
    pub fn complement(self) -> Domain {
        Domain(!self.0)
    }

    pub fn is_subset_of(self, other: Domain) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn intersects(self, other: Domain) -> bool {
        self.0 & other.0 != 0
    }

    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..MAX_VALUES).filter(move |&v| self.contains(v))
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_set_operations() {
        let d = Domain::full(5);
        assert_eq!(d.size(), 5);
        assert!(!d.is_fixed());
        let d = d.intersect(Domain::from_values([0, 2, 4]).complement());
        assert_eq!(d.iter().collect::<Vec<_>>(), vec![1, 3]);
        let d = d.intersect(Domain::singleton(3));
        assert_eq!(d.value(), Some(3));
        assert!(d.is_subset_of(Domain::from_values([3, 4])));
        assert!(d.intersect(Domain::singleton(1)).is_empty());
        assert_eq!(Domain::full(8).size(), 8);
        assert_eq!(Domain::EMPTY.value(), None);
    }
}
