use super::{ExampleSampler, Sample, SamplerFactory, next_round_robin};
use crate::engine::error::ProviderError;
use crate::engine::example::ExampleRef;
use rand::rngs::StdRng;

/// Binning of one label into `ceil((max - min) / step)` bins; values outside the range
/// fall into the first or last bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueBins {
    pub pos: usize,
    pub abs: bool,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ValueBins {
    pub fn count(&self) -> usize {
        (((self.max - self.min) / self.step).ceil() as usize).max(1)
    }

    pub fn bin_of(&self, example: &ExampleRef) -> usize {
        let mut value = example.label(self.pos).unwrap_or(0.0);
        if self.abs {
            value = value.abs();
        }
        let bin = ((value - self.min) / self.step).floor();
        if bin <= 0.0 {
            0
        } else {
            (bin as usize).min(self.count() - 1)
        }
    }
}

/// Round-robin over value bins of a label, skipping empty bins.
///
/// All bins are kept so examples added after setup still land in their own bin.
pub struct ValueStratifiedSampler {
    bins: ValueBins,
    parts: Vec<Box<dyn ExampleSampler>>,
    cursor: usize,
}

impl ValueStratifiedSampler {
    pub fn new(factory: SamplerFactory, bins: ValueBins) -> Self {
        let parts = (0..bins.count()).map(|_| factory()).collect();
        Self {
            bins,
            parts,
            cursor: 0,
        }
    }

    /// Number of bins holding at least one example.
    pub fn num_bins(&self) -> usize {
        self.filled().count()
    }

    fn filled(&self) -> impl Iterator<Item = &Box<dyn ExampleSampler>> {
        self.parts.iter().filter(|p| !p.is_empty())
    }
}

impl ExampleSampler for ValueStratifiedSampler {
    fn add(&mut self, index: usize, example: &ExampleRef) {
        let bin = self.bins.bin_of(example);
        self.parts[bin].add(index, example);
    }

    fn setup(&mut self, rng: &mut StdRng) -> Result<(), ProviderError> {
        if self.parts.iter().all(|p| p.is_empty()) {
            return Err(ProviderError::Sampler(
                "every value stratification bin is empty".to_string(),
            ));
        }
        for part in self.parts.iter_mut().filter(|p| !p.is_empty()) {
            part.setup(rng)?;
        }
        self.cursor = 0;
        Ok(())
    }

    fn next(&mut self, rng: &mut StdRng) -> Option<Sample> {
        next_round_robin(&mut self.parts, &mut self.cursor, rng)
    }

    fn len(&self) -> usize {
        self.parts.iter().map(|p| p.len()).sum()
    }

    fn small_epoch_size(&self) -> usize {
        let smallest = self.filled().map(|p| p.small_epoch_size()).min().unwrap_or(0);
        smallest * self.num_bins()
    }

    fn large_epoch_size(&self) -> usize {
        let largest = self.filled().map(|p| p.large_epoch_size()).max().unwrap_or(0);
        largest * self.num_bins()
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

    fn bins() -> ValueBins {
        ValueBins {
            pos: 1,
            abs: true,
            min: 0.0,
            max: 10.0,
            step: 5.0,
        }
    }

    #[test]
    fn binning_clamps_and_uses_absolute_values() {
        let b = bins();
        assert_eq!(b.count(), 2);
        assert_eq!(b.bin_of(&example(&[1.0, -7.0], &["r"])), 1);
        assert_eq!(b.bin_of(&example(&[1.0, 3.0], &["r"])), 0);
        assert_eq!(b.bin_of(&example(&[1.0, 42.0], &["r"])), 1);
        let signed = ValueBins { abs: false, ..b };
        assert_eq!(signed.bin_of(&example(&[1.0, -7.0], &["r"])), 0);
    }

    #[test]
    fn alternates_between_bins() {
        let mut rng = rng();
        let mut s = ValueStratifiedSampler::new(Arc::new(|| Box::new(UniformSampler::new(false))), bins());
        for (i, v) in [1.0, 2.0, 3.0, 8.0].iter().enumerate() {
            s.add(i, &example(&[0.0, *v], &["r"]));
        }
        s.setup(&mut rng).unwrap();
        assert_eq!(s.num_bins(), 2);
        assert_eq!(draw(&mut s, &mut rng, 6), vec![0, 3, 1, 3, 2, 3]);
        assert_eq!(s.small_epoch_size(), 2);
        assert_eq!(s.large_epoch_size(), 6);
    }
}
