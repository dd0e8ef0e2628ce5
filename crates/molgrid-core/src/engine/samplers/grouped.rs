use super::{ExampleSampler, Sample};
use crate::engine::error::ProviderError;
use crate::engine::example::ExampleRef;
use rand::rngs::StdRng;
use std::collections::HashMap;

/// Serves sequences of frames for a fixed set of groups.
///
/// Groups are chosen `group_batch_size` at a time by the inner sampler, which sees one
/// representative (the first frame) per group. Each chosen group is then stepped
/// through `max_group_size` frames, interleaved slot by slot so that consecutive
/// batches of `group_batch_size` examples continue the same groups. Groups shorter
/// than `max_group_size` repeat their last frame.
pub struct GroupedSampler {
    inner: Box<dyn ExampleSampler>,
    group_batch_size: usize,
    max_group_size: usize,
    frames: Vec<Vec<usize>>,
    group_of_id: HashMap<i32, usize>,
    group_of_representative: HashMap<usize, usize>,
    current: Vec<usize>,
    slot: usize,
    frame: usize,
}

impl GroupedSampler {
    pub fn new(inner: Box<dyn ExampleSampler>, group_batch_size: usize, max_group_size: usize) -> Self {
        Self {
            inner,
            group_batch_size: group_batch_size.max(1),
            max_group_size: max_group_size.max(1),
            frames: Vec::new(),
            group_of_id: HashMap::new(),
            group_of_representative: HashMap::new(),
            current: Vec::new(),
            slot: 0,
            frame: 0,
        }
    }

    pub fn num_groups(&self) -> usize {
        self.frames.len()
    }

    fn choose_groups(&mut self, rng: &mut StdRng) -> Option<()> {
        self.current.clear();
        for _ in 0..self.group_batch_size {
            let rep = self.inner.next(rng)?.index;
            let group = *self.group_of_representative.get(&rep)?;
            self.current.push(group);
        }
        Some(())
    }
}

impl ExampleSampler for GroupedSampler {
    fn add(&mut self, index: usize, example: &ExampleRef) {
        let id = example.group.unwrap_or(-1);
        match self.group_of_id.get(&id) {
            Some(&group) => self.frames[group].push(index),
            None => {
                let group = self.frames.len();
                self.frames.push(vec![index]);
                self.group_of_id.insert(id, group);
                self.group_of_representative.insert(index, group);
                self.inner.add(index, example);
            }
        }
    }

    fn setup(&mut self, rng: &mut StdRng) -> Result<(), ProviderError> {
        self.inner.setup(rng)?;
        self.current.clear();
        self.slot = 0;
        self.frame = 0;
        Ok(())
    }

    fn next(&mut self, rng: &mut StdRng) -> Option<Sample> {
        if self.slot == 0 && self.frame == 0 {
            self.choose_groups(rng)?;
        }
        let group = *self.current.get(self.slot)?;
        let frames = &self.frames[group];
        let index = frames[self.frame.min(frames.len() - 1)];
        let sample = Sample {
            index,
            seqcont: self.frame > 0,
        };

        self.slot += 1;
        if self.slot == self.group_batch_size {
            self.slot = 0;
            self.frame += 1;
            if self.frame == self.max_group_size {
                self.frame = 0;
            }
        }
        Some(sample)
    }

    fn len(&self) -> usize {
        self.frames.iter().map(Vec::len).sum()
    }

    fn small_epoch_size(&self) -> usize {
        self.inner.small_epoch_size() * self.max_group_size
    }

    fn large_epoch_size(&self) -> usize {
        self.inner.large_epoch_size() * self.max_group_size
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.current.clear();
        self.slot = 0;
        self.frame = 0;
    }
}
