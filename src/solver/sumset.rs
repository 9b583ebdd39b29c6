/// Ensemble de sommes atteignables `{0..width}`, un bit par somme.
///
/// Sert aux programmations dynamiques des contraintes linéaires.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct SumSet {
    width: usize,
    words: Vec<u64>,
}

impl SumSet {
    pub(crate) fn empty(width: usize) -> Self {
        Self {
            width,
            words: vec![0; width.div_ceil(64)],
        }
    }

    /// `{0}`
    pub(crate) fn zero(width: usize) -> Self {
        let mut s = Self::empty(width);
        s.insert(0);
        s
    }

    /// `{lo..width}`
    pub(crate) fn from(width: usize, lo: usize) -> Self {
        let mut s = Self::empty(width);
        for i in lo..width {
            s.insert(i);
        }
        s
    }

    pub(crate) fn insert(&mut self, i: usize) {
        if i < self.width {
            self.words[i / 64] |= 1 << (i % 64);
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, i: usize) -> bool {
        i < self.width && self.words[i / 64] >> (i % 64) & 1 == 1
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub(crate) fn intersects(&self, other: &SumSet) -> bool {
        self.words.iter().zip(&other.words).any(|(a, b)| a & b != 0)
    }

    pub(crate) fn union_with(&mut self, other: &SumSet) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= b;
        }
    }

    /// `self |= { s + k | s ∈ src }`, tronqué à `width`.
    pub(crate) fn union_shifted_up(&mut self, src: &SumSet, k: usize) {
        let (ws, bs) = (k / 64, k % 64);
        let n = self.words.len();
        for i in (ws..n).rev() {
            let j = i - ws;
            let mut w = src.words[j] << bs;
            if bs > 0 && j > 0 {
                w |= src.words[j - 1] >> (64 - bs);
            }
            self.words[i] |= w;
        }
        self.trim();
    }

    /// `{ s - k | s ∈ self, s ≥ k }`
    pub(crate) fn shifted_down(&self, k: usize) -> SumSet {
        let (ws, bs) = (k / 64, k % 64);
        let n = self.words.len();
        let mut out = SumSet::empty(self.width);
        for i in 0..n {
            let j = i + ws;
            if j >= n {
                break;
            }
            let mut w = self.words[j] >> bs;
            if bs > 0 && j + 1 < n {
                w |= self.words[j + 1] << (64 - bs);
            }
            out.words[i] = w;
        }
        out
    }

    fn trim(&mut self) {
        let rem = self.width % 64;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(s: &SumSet, width: usize) -> Vec<usize> {
        (0..width).filter(|&i| s.contains(i)).collect()
    }

    #[test]
    fn shifts_cross_word_boundaries() {
        let mut s = SumSet::zero(150);
        s.insert(60);
        let mut up = SumSet::empty(150);
        up.union_shifted_up(&s, 70);
        assert_eq!(members(&up, 150), vec![70, 130]);
        up.union_shifted_up(&s, 100);
        assert_eq!(members(&up, 150), vec![70, 100, 130]);
        let down = up.shifted_down(65);
        assert_eq!(members(&down, 150), vec![5, 35, 65]);
        assert!(down.intersects(&SumSet::from(150, 60)));
        assert!(!down.intersects(&SumSet::from(150, 66)));
    }

    #[test]
    fn shifting_past_width_empties() {
        let s = SumSet::from(10, 0);
        let mut up = SumSet::empty(10);
        up.union_shifted_up(&s, 10);
        assert!(up.is_empty());
        assert!(s.shifted_down(10).is_empty());
        assert_eq!(members(&s.shifted_down(7), 10), vec![0, 1, 2]);
    }
}
