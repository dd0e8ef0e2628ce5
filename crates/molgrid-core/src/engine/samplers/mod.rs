//! Strategies for choosing which example comes next.
//!
//! Samplers hold indices into the provider's list of [`ExampleRef`]s. Stratifying
//! samplers partition their input and delegate each partition to a fresh inner
//! sampler built by a [`SamplerFactory`], so strategies compose.

pub mod balanced;
pub mod grouped;
pub mod receptor;
pub mod uniform;
pub mod value;

use super::config::ExampleProviderSettings;
use super::error::ProviderError;
use super::example::ExampleRef;
use rand::rngs::StdRng;
use std::sync::Arc;

pub use balanced::BalancedSampler;
pub use grouped::GroupedSampler;
pub use receptor::ReceptorStratifiedSampler;
pub use uniform::UniformSampler;
pub use value::ValueStratifiedSampler;

/// A sampled example reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub index: usize,
    pub seqcont: bool,
}

impl Sample {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            seqcont: false,
        }
    }
}

pub trait ExampleSampler: Send {
    /// Registers the reference stored at `index`.
    fn add(&mut self, index: usize, example: &ExampleRef);

    /// Prepares for sampling after references were added; restarts iteration.
    fn setup(&mut self, rng: &mut StdRng) -> Result<(), ProviderError>;

    /// The next sample, or `None` when nothing was added.
    fn next(&mut self, rng: &mut StdRng) -> Option<Sample>;

    /// Number of references held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples until the most sparsely represented partition has been fully seen.
    fn small_epoch_size(&self) -> usize;

    /// Samples until every reference has been served at least once.
    fn large_epoch_size(&self) -> usize;

    /// Restarts iteration from the beginning.
    fn reset(&mut self);
}

pub type SamplerFactory = Arc<dyn Fn() -> Box<dyn ExampleSampler> + Send + Sync>;

/// Composes the sampler stack selected by `settings`.
///
/// The base is balanced or uniform; receptor stratification, value stratification and
/// grouping wrap it in that order.
pub fn build_sampler(settings: &ExampleProviderSettings) -> Box<dyn ExampleSampler> {
    let (balanced, shuffle, labelpos) = (settings.balanced, settings.shuffle, settings.labelpos);
    let mut factory: SamplerFactory = Arc::new(move || -> Box<dyn ExampleSampler> {
        if balanced {
            Box::new(BalancedSampler::new(labelpos, shuffle))
        } else {
            Box::new(UniformSampler::new(shuffle))
        }
    });

    if settings.stratify_receptor {
        let inner = factory.clone();
        factory = Arc::new(move || Box::new(ReceptorStratifiedSampler::new(inner.clone())));
    }

    if settings.is_value_stratified() {
        let inner = factory.clone();
        let bins = value::ValueBins {
            pos: settings.stratify_pos,
            abs: settings.stratify_abs,
            min: settings.stratify_min,
            max: settings.stratify_max,
            step: settings.stratify_step,
        };
        factory = Arc::new(move || Box::new(ValueStratifiedSampler::new(inner.clone(), bins)));
    }

    if settings.is_grouped() {
        Box::new(GroupedSampler::new(
            factory(),
            settings.group_batch_size,
            settings.max_group_size,
        ))
    } else {
        factory()
    }
}

/// Round-robin over partitions, skipping any whose sampler yields nothing.
pub(crate) fn next_round_robin(
    parts: &mut [Box<dyn ExampleSampler>],
    cursor: &mut usize,
    rng: &mut StdRng,
) -> Option<Sample> {
    for _ in 0..parts.len() {
        let i = *cursor % parts.len();
        *cursor = (i + 1) % parts.len();
        if let Some(sample) = parts[i].next(rng) {
            return Some(sample);
        }
    }
    None
}
