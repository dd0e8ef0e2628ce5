use super::uniform::UniformSampler;
use super::{ExampleSampler, Sample};
use crate::engine::error::ProviderError;
use crate::engine::example::ExampleRef;
use rand::rngs::StdRng;

/// Alternates between actives (`label[labelpos] > 0`) and inactives, starting with
/// an active.
#[derive(Debug, Clone)]
pub struct BalancedSampler {
    labelpos: usize,
    actives: UniformSampler,
    decoys: UniformSampler,
    next_active: bool,
}

impl BalancedSampler {
    pub fn new(labelpos: usize, shuffle: bool) -> Self {
        Self {
            labelpos,
            actives: UniformSampler::new(shuffle),
            decoys: UniformSampler::new(shuffle),
            next_active: true,
        }
    }
}

impl ExampleSampler for BalancedSampler {
    fn add(&mut self, index: usize, example: &ExampleRef) {
        if example.label(self.labelpos).is_some_and(|l| l > 0.0) {
            self.actives.add(index, example);
        } else {
            self.decoys.add(index, example);
        }
    }

    fn setup(&mut self, rng: &mut StdRng) -> Result<(), ProviderError> {
        if self.actives.is_empty() || self.decoys.is_empty() {
            return Err(ProviderError::Sampler(format!(
                "balanced sampling needs actives and inactives (found {} and {})",
                self.actives.len(),
                self.decoys.len()
            )));
        }
        self.actives.setup(rng)?;
        self.decoys.setup(rng)?;
        self.next_active = true;
        Ok(())
    }

    fn next(&mut self, rng: &mut StdRng) -> Option<Sample> {
        let sample = if self.next_active {
            self.actives.next(rng)
        } else {
            self.decoys.next(rng)
        };
        self.next_active = !self.next_active;
        sample
    }

    fn len(&self) -> usize {
        self.actives.len() + self.decoys.len()
    }

    fn small_epoch_size(&self) -> usize {
        2 * self.actives.len().min(self.decoys.len())
    }

    fn large_epoch_size(&self) -> usize {
        2 * self.actives.len().max(self.decoys.len())
    }

    fn reset(&mut self) {
        self.actives.reset();
        self.decoys.reset();
        self.next_active = true;
    }
}
