use super::config::{ConfigError, ExampleProviderSettings, IterationScheme};
use super::error::ProviderError;
use super::example::{Example, ExampleRef};
use super::extractor::ExampleExtractor;
use super::samplers::{ExampleSampler, build_sampler};
use crate::core::typing::Typer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Streams labeled examples read from types files.
///
/// Each line of a types file is `label* [group] file+ [# comment]`. Lines are parsed
/// into [`ExampleRef`]s by [`populate`](Self::populate); [`next`](Self::next) and
/// [`next_batch`](Self::next_batch) sample references with the configured strategy
/// and load them into [`Example`]s.
pub struct ExampleProvider {
    settings: ExampleProviderSettings,
    refs: Vec<ExampleRef>,
    sampler: Box<dyn ExampleSampler>,
    extractor: ExampleExtractor,
    rng: StdRng,
    num_labels: Option<usize>,
    ready: bool,
    served: usize,
    new_epoch: bool,
}

impl ExampleProvider {
    /// # Errors
    ///
    /// Fails when the settings are invalid, no typer is given, or a molcache cannot be
    /// read.
    pub fn new(settings: ExampleProviderSettings, typers: Vec<Typer>) -> Result<Self, ProviderError> {
        settings.validate()?;
        if typers.is_empty() {
            return Err(ConfigError::MissingParameter("typers").into());
        }
        let extractor = ExampleExtractor::new(&settings, typers)?;
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            sampler: build_sampler(&settings),
            num_labels: settings.num_labels,
            settings,
            refs: Vec::new(),
            extractor,
            rng,
            ready: false,
            served: 0,
            new_epoch: false,
        })
    }

    pub fn builder() -> ExampleProviderBuilder {
        ExampleProviderBuilder::default()
    }

    pub fn settings(&self) -> &ExampleProviderSettings {
        &self.settings
    }

    /// Reads a types file. May be called repeatedly to add more examples.
    pub fn populate<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, ProviderError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ProviderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let added = self.populate_reader(BufReader::new(file), &path.display().to_string())?;
        info!("Read {} examples from {}", added, path.display());
        Ok(added)
    }

    pub fn populate_reader(&mut self, reader: impl BufRead, source_name: &str) -> Result<usize, ProviderError> {
        let mut added = 0;
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| ProviderError::Io {
                path: source_name.into(),
                source,
            })?;
            added += self.add_line(&line, source_name, i + 1)?;
        }
        Ok(added)
    }

    /// Adds examples from in-memory lines.
    pub fn populate_lines<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> Result<usize, ProviderError> {
        let mut added = 0;
        for (i, line) in lines.into_iter().enumerate() {
            added += self.add_line(line, "<lines>", i + 1)?;
        }
        Ok(added)
    }

    fn add_line(&mut self, line: &str, source_name: &str, line_no: usize) -> Result<usize, ProviderError> {
        let data = line.split_once('#').map_or(line, |(data, _)| data);
        if data.trim().is_empty() {
            return Ok(0);
        }
        let grouped = self.settings.is_grouped();
        let num_labels = match self.num_labels {
            Some(n) => n,
            None => {
                let numeric = ExampleRef::count_numeric_prefix(line);
                let n = numeric.saturating_sub(usize::from(grouped));
                debug!("Detected {} label columns from {} line {}", n, source_name, line_no);
                self.num_labels = Some(n);
                n
            }
        };
        let parsed = ExampleRef::parse(line, num_labels, grouped).map_err(|message| ProviderError::Parse {
            source_name: source_name.to_string(),
            line: line_no,
            message,
        })?;
        let Some(example) = parsed else {
            return Ok(0);
        };
        let index = self.refs.len();
        self.sampler.add(index, &example);
        self.refs.push(example);
        self.ready = false;
        Ok(1)
    }

    fn ensure_ready(&mut self) -> Result<(), ProviderError> {
        if self.ready {
            return Ok(());
        }
        if self.refs.is_empty() {
            return Err(ProviderError::Empty);
        }
        let labels = self.num_labels();
        if self.settings.balanced && self.settings.labelpos >= labels {
            return Err(ConfigError::InvalidParameter {
                name: "labelpos",
                reason: format!("label {} requested but examples have {}", self.settings.labelpos, labels),
            }
            .into());
        }
        if self.settings.is_value_stratified() && self.settings.stratify_pos >= labels {
            return Err(ConfigError::InvalidParameter {
                name: "stratify_pos",
                reason: format!("label {} requested but examples have {}", self.settings.stratify_pos, labels),
            }
            .into());
        }
        self.sampler.setup(&mut self.rng)?;
        self.ready = true;
        Ok(())
    }

    /// Number of example references read.
    pub fn size(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels.unwrap_or(0)
    }

    fn num_files(&self) -> usize {
        self.refs.first().map_or(0, |r| r.files.len())
    }

    /// Channels of a merged example, judged from the first example read.
    pub fn num_types(&self) -> usize {
        self.extractor.num_types(self.num_files())
    }

    pub fn type_names(&self) -> Vec<String> {
        self.extractor.type_names(self.num_files())
    }

    pub fn example_refs(&self) -> &[ExampleRef] {
        &self.refs
    }

    /// Loads the next example.
    pub fn next(&mut self) -> Result<Example, ProviderError> {
        self.ensure_ready()?;
        let sample = self.sampler.next(&mut self.rng).ok_or(ProviderError::Empty)?;
        let mut example = self.extractor.extract(&self.refs[sample.index])?;
        example.seqcont = sample.seqcont;
        self.served += 1;
        Ok(example)
    }

    /// Loads a batch of `batch_size` examples; zero selects the default batch size.
    ///
    /// With [`IterationScheme::SmallEpoch`] the batch ends early at the end of a small
    /// epoch.
    #[instrument(level = "debug", skip(self))]
    pub fn next_batch(&mut self, batch_size: usize) -> Result<Vec<Example>, ProviderError> {
        let n = if batch_size == 0 {
            self.settings.default_batch_size
        } else {
            batch_size
        };
        self.ensure_ready()?;
        self.new_epoch = false;
        let small = self.sampler.small_epoch_size().max(1);
        let large = self.sampler.large_epoch_size().max(1);
        let mut batch = Vec::with_capacity(n);
        for _ in 0..n {
            batch.push(self.next()?);
            match self.settings.iteration_scheme {
                IterationScheme::Continuous => {}
                IterationScheme::LargeEpoch => {
                    if self.served % large == 0 {
                        self.new_epoch = true;
                    }
                }
                IterationScheme::SmallEpoch => {
                    if self.served % small == 0 {
                        self.new_epoch = true;
                        break;
                    }
                }
            }
        }
        Ok(batch)
    }

    /// Restarts sampling from the beginning and clears the epoch counters.
    pub fn reset(&mut self) {
        self.sampler.reset();
        self.served = 0;
        self.new_epoch = false;
    }

    /// Examples served since construction or the last reset.
    pub fn served(&self) -> usize {
        self.served
    }

    pub fn small_epoch_size(&self) -> usize {
        self.sampler.small_epoch_size()
    }

    pub fn large_epoch_size(&self) -> usize {
        self.sampler.large_epoch_size()
    }

    pub fn small_epoch_num(&self) -> usize {
        self.served / self.sampler.small_epoch_size().max(1)
    }

    pub fn large_epoch_num(&self) -> usize {
        self.served / self.sampler.large_epoch_size().max(1)
    }

    /// Whether the last batch completed an epoch of the configured scheme.
    pub fn at_new_epoch(&self) -> bool {
        self.new_epoch
    }
}

/// Builder for [`ExampleProvider`]; at least one typer is required.
#[derive(Default)]
pub struct ExampleProviderBuilder {
    settings: Option<ExampleProviderSettings>,
    typers: Vec<Typer>,
}

impl ExampleProviderBuilder {
    pub fn settings(mut self, settings: ExampleProviderSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn typer(mut self, typer: Typer) -> Self {
        self.typers.push(typer);
        self
    }

    pub fn build(self) -> Result<ExampleProvider, ProviderError> {
        ExampleProvider::new(self.settings.unwrap_or_default(), self.typers)
    }
}
