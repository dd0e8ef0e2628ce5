use super::{ExampleSampler, Sample, SamplerFactory, next_round_robin};
use crate::engine::error::ProviderError;
use crate::engine::example::ExampleRef;
use rand::rngs::StdRng;
use std::collections::HashMap;
use tracing::warn;

/// Round-robin over receptors, where an example's receptor is its first file.
pub struct ReceptorStratifiedSampler {
    factory: SamplerFactory,
    receptors: Vec<String>,
    lookup: HashMap<String, usize>,
    parts: Vec<Box<dyn ExampleSampler>>,
    cursor: usize,
}

impl ReceptorStratifiedSampler {
    pub fn new(factory: SamplerFactory) -> Self {
        Self {
            factory,
            receptors: Vec::new(),
            lookup: HashMap::new(),
            parts: Vec::new(),
            cursor: 0,
        }
    }

    pub fn num_receptors(&self) -> usize {
        self.parts.len()
    }
}

impl ExampleSampler for ReceptorStratifiedSampler {
    fn add(&mut self, index: usize, example: &ExampleRef) {
        let receptor = example.receptor();
        let slot = match self.lookup.get(receptor) {
            Some(&slot) => slot,
            None => {
                self.receptors.push(receptor.to_string());
                self.parts.push((self.factory)());
                self.lookup.insert(receptor.to_string(), self.parts.len() - 1);
                self.parts.len() - 1
            }
        };
        self.parts[slot].add(index, example);
    }

    fn setup(&mut self, rng: &mut StdRng) -> Result<(), ProviderError> {
        let mut kept_names = Vec::with_capacity(self.parts.len());
        let mut kept_parts = Vec::with_capacity(self.parts.len());
        for (name, mut part) in self.receptors.drain(..).zip(self.parts.drain(..)) {
            match part.setup(rng) {
                Ok(()) => {
                    kept_names.push(name);
                    kept_parts.push(part);
                }
                Err(e) => warn!("Dropping receptor '{}' from stratified sampling: {}", name, e),
            }
        }
        self.lookup = kept_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        self.receptors = kept_names;
        self.parts = kept_parts;
        self.cursor = 0;
        if self.parts.is_empty() {
            return Err(ProviderError::Sampler(
                "no receptor has a usable set of examples".to_string(),
            ));
        }
        Ok(())
    }

    fn next(&mut self, rng: &mut StdRng) -> Option<Sample> {
        next_round_robin(&mut self.parts, &mut self.cursor, rng)
    }

    fn len(&self) -> usize {
        self.parts.iter().map(|p| p.len()).sum()
    }

    fn small_epoch_size(&self) -> usize {
        let smallest = self.parts.iter().map(|p| p.small_epoch_size()).min().unwrap_or(0);
        smallest * self.parts.len()
    }

    fn large_epoch_size(&self) -> usize {
        let largest = self.parts.iter().map(|p| p.large_epoch_size()).max().unwrap_or(0);
        largest * self.parts.len()
    }

    fn reset(&mut self) {
        self.parts.iter_mut().for_each(|p| p.reset());
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::super::UniformSampler;
    use super::super::test_support::*;
    use super::*;
    use std::sync::Arc;

    fn uniform_factory() -> SamplerFactory {
        Arc::new(|| Box::new(UniformSampler::new(false)))
    }

    #[test]
    fn round_robin_over_receptors() {
        let mut rng = rng();
        let mut s = ReceptorStratifiedSampler::new(uniform_factory());
        let files = ["a", "a", "a", "b", "c", "c"];
        for (i, rec) in files.iter().enumerate() {
            s.add(i, &example(&[0.0], &[rec, "lig"]));
        }
        s.setup(&mut rng).unwrap();
        assert_eq!(s.num_receptors(), 3);
        assert_eq!(draw(&mut s, &mut rng, 8), vec![0, 3, 4, 1, 3, 5, 2, 3]);
        assert_eq!(s.small_epoch_size(), 3);
        assert_eq!(s.large_epoch_size(), 9);
    }

    #[test]
    fn receptors_failing_setup_are_dropped() {
        use super::super::BalancedSampler;
        let mut rng = rng();
        let mut s = ReceptorStratifiedSampler::new(Arc::new(|| Box::new(BalancedSampler::new(0, false))));
        s.add(0, &example(&[1.0], &["a", "l"]));
        s.add(1, &example(&[0.0], &["a", "l"]));
        s.add(2, &example(&[1.0], &["b", "l"]));
        s.setup(&mut rng).unwrap();
        assert_eq!(s.num_receptors(), 1);
        assert_eq!(draw(&mut s, &mut rng, 3), vec![0, 1, 0]);
    }
}
