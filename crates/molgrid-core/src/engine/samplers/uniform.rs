use super::{ExampleSampler, Sample};
use crate::engine::error::ProviderError;
use crate::engine::example::ExampleRef;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Serves references in order, reshuffling each pass when `shuffle` is set.
#[derive(Debug, Clone, Default)]
pub struct UniformSampler {
    indices: Vec<usize>,
    position: usize,
    shuffle: bool,
}

impl UniformSampler {
    pub fn new(shuffle: bool) -> Self {
        Self {
            indices: Vec::new(),
            position: 0,
            shuffle,
        }
    }
}

impl ExampleSampler for UniformSampler {
    fn add(&mut self, index: usize, _example: &ExampleRef) {
        self.indices.push(index);
    }

    fn setup(&mut self, rng: &mut StdRng) -> Result<(), ProviderError> {
        if self.shuffle {
            self.indices.shuffle(rng);
        }
        self.position = 0;
        Ok(())
    }

    fn next(&mut self, rng: &mut StdRng) -> Option<Sample> {
        if self.indices.is_empty() {
            return None;
        }
        if self.position >= self.indices.len() {
            self.position = 0;
            if self.shuffle {
                self.indices.shuffle(rng);
            }
        }
        let index = self.indices[self.position];
        self.position += 1;
        Some(Sample::new(index))
    }

    fn len(&self) -> usize {
        self.indices.len()
    }

    fn small_epoch_size(&self) -> usize {
        self.indices.len()
    }

    fn large_epoch_size(&self) -> usize {
        self.indices.len()
    }

    fn reset(&mut self) {
        self.position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn filled(shuffle: bool, n: usize) -> UniformSampler {
        let mut s = UniformSampler::new(shuffle);
        for i in 0..n {
            s.add(i, &example(&[0.0], &["x"]));
        }
        s
    }

    #[test]
    fn cycles_in_order_without_shuffle() {
        let mut rng = rng();
        let mut s = filled(false, 3);
        s.setup(&mut rng).unwrap();
        assert_eq!(draw(&mut s, &mut rng, 7), vec![0, 1, 2, 0, 1, 2, 0]);
        s.reset();
        assert_eq!(draw(&mut s, &mut rng, 1), vec![0]);
    }

    #[test]
    fn shuffled_passes_cover_every_index_and_repeat_under_a_seed() {
        let mut rng = rng();
        let mut s = filled(true, 20);
        s.setup(&mut rng).unwrap();
        let mut pass = draw(&mut s, &mut rng, 20);
        let first = pass.clone();
        pass.sort_unstable();
        assert_eq!(pass, (0..20).collect::<Vec<_>>());
        assert_ne!(first, (0..20).collect::<Vec<_>>());

        let mut rng2 = super::super::test_support::rng();
        let mut again = filled(true, 20);
        again.setup(&mut rng2).unwrap();
        assert_eq!(draw(&mut again, &mut rng2, 20), first);
    }

    #[test]
    fn empty_sampler_yields_nothing() {
        let mut rng = rng();
        let mut s = UniformSampler::new(false);
        assert!(s.next(&mut rng).is_none());
        assert!(s.is_empty());
    }
}
