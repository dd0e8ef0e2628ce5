use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// How batches relate to passes over the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IterationScheme {
    /// Batches are always full and epochs are never reported.
    #[default]
    Continuous,
    /// Batches are always full; an epoch ends once every example has been served.
    LargeEpoch,
    /// A batch is cut short at the end of each small epoch.
    SmallEpoch,
}

impl IterationScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Continuous => "continuous",
            Self::LargeEpoch => "large-epoch",
            Self::SmallEpoch => "small-epoch",
        }
    }
}

impl fmt::Display for IterationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IterationScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "continuous" => Ok(Self::Continuous),
            "large-epoch" | "large" => Ok(Self::LargeEpoch),
            "small-epoch" | "small" => Ok(Self::SmallEpoch),
            other => Err(ConfigError::InvalidParameter {
                name: "iteration_scheme",
                reason: format!("unknown scheme '{}'", other),
            }),
        }
    }
}

/// Settings controlling how an [`ExampleProvider`](super::provider::ExampleProvider)
/// reads, samples and loads examples.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleProviderSettings {
    pub shuffle: bool,
    pub balanced: bool,
    pub stratify_receptor: bool,
    /// Label used to split actives from inactives when balancing.
    pub labelpos: usize,
    /// Label used for value stratification.
    pub stratify_pos: usize,
    pub stratify_abs: bool,
    pub stratify_min: f32,
    pub stratify_max: f32,
    pub stratify_step: f32,
    pub group_batch_size: usize,
    /// Frames per group; zero disables grouping.
    pub max_group_size: usize,
    pub cache_structs: bool,
    pub duplicate_first: bool,
    pub make_vector_types: bool,
    pub data_root: PathBuf,
    pub recmolcache: Option<PathBuf>,
    pub ligmolcache: Option<PathBuf>,
    /// Number of leading label columns; detected from the first line when unset.
    pub num_labels: Option<usize>,
    pub default_batch_size: usize,
    pub iteration_scheme: IterationScheme,
    pub seed: Option<u64>,
}

impl Default for ExampleProviderSettings {
    fn default() -> Self {
        Self {
            shuffle: false,
            balanced: false,
            stratify_receptor: false,
            labelpos: 0,
            stratify_pos: 1,
            stratify_abs: true,
            stratify_min: 0.0,
            stratify_max: 0.0,
            stratify_step: 0.0,
            group_batch_size: 1,
            max_group_size: 0,
            cache_structs: true,
            duplicate_first: false,
            make_vector_types: false,
            data_root: PathBuf::new(),
            recmolcache: None,
            ligmolcache: None,
            num_labels: None,
            default_batch_size: 1,
            iteration_scheme: IterationScheme::Continuous,
            seed: None,
        }
    }
}

impl ExampleProviderSettings {
    pub fn builder() -> ExampleProviderSettingsBuilder {
        ExampleProviderSettingsBuilder::new()
    }

    pub fn is_grouped(&self) -> bool {
        self.max_group_size > 0
    }

    pub fn is_value_stratified(&self) -> bool {
        self.stratify_min != self.stratify_max
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name, reason: &str| ConfigError::InvalidParameter {
            name,
            reason: reason.to_string(),
        };
        if self.default_batch_size == 0 {
            return Err(invalid("default_batch_size", "must be at least 1"));
        }
        if self.group_batch_size == 0 {
            return Err(invalid("group_batch_size", "must be at least 1"));
        }
        if self.is_value_stratified() {
            if self.stratify_max < self.stratify_min {
                return Err(invalid("stratify_max", "must not be below stratify_min"));
            }
            if !(self.stratify_step > 0.0) {
                return Err(invalid(
                    "stratify_step",
                    "must be positive when stratifying by value",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct ExampleProviderSettingsBuilder {
    shuffle: Option<bool>,
    balanced: Option<bool>,
    stratify_receptor: Option<bool>,
    labelpos: Option<usize>,
    stratify_pos: Option<usize>,
    stratify_abs: Option<bool>,
    stratify_min: Option<f32>,
    stratify_max: Option<f32>,
    stratify_step: Option<f32>,
    group_batch_size: Option<usize>,
    max_group_size: Option<usize>,
    cache_structs: Option<bool>,
    duplicate_first: Option<bool>,
    make_vector_types: Option<bool>,
    data_root: Option<PathBuf>,
    recmolcache: Option<PathBuf>,
    ligmolcache: Option<PathBuf>,
    num_labels: Option<usize>,
    default_batch_size: Option<usize>,
    iteration_scheme: Option<IterationScheme>,
    seed: Option<u64>,
}

impl ExampleProviderSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = Some(shuffle);
        self
    }
    pub fn balanced(mut self, balanced: bool) -> Self {
        self.balanced = Some(balanced);
        self
    }
    pub fn stratify_receptor(mut self, stratify: bool) -> Self {
        self.stratify_receptor = Some(stratify);
        self
    }
    pub fn labelpos(mut self, pos: usize) -> Self {
        self.labelpos = Some(pos);
        self
    }
    pub fn stratify_pos(mut self, pos: usize) -> Self {
        self.stratify_pos = Some(pos);
        self
    }
    pub fn stratify_abs(mut self, abs: bool) -> Self {
        self.stratify_abs = Some(abs);
        self
    }
    pub fn stratify_range(mut self, min: f32, max: f32, step: f32) -> Self {
        self.stratify_min = Some(min);
        self.stratify_max = Some(max);
        self.stratify_step = Some(step);
        self
    }
    pub fn group_batch_size(mut self, size: usize) -> Self {
        self.group_batch_size = Some(size);
        self
    }
    pub fn max_group_size(mut self, size: usize) -> Self {
        self.max_group_size = Some(size);
        self
    }
    pub fn cache_structs(mut self, cache: bool) -> Self {
        self.cache_structs = Some(cache);
        self
    }
    pub fn duplicate_first(mut self, duplicate: bool) -> Self {
        self.duplicate_first = Some(duplicate);
        self
    }
    pub fn make_vector_types(mut self, vector: bool) -> Self {
        self.make_vector_types = Some(vector);
        self
    }
    pub fn data_root(mut self, root: PathBuf) -> Self {
        self.data_root = Some(root);
        self
    }
    pub fn recmolcache(mut self, path: PathBuf) -> Self {
        self.recmolcache = Some(path);
        self
    }
    pub fn ligmolcache(mut self, path: PathBuf) -> Self {
        self.ligmolcache = Some(path);
        self
    }
    pub fn num_labels(mut self, n: usize) -> Self {
        self.num_labels = Some(n);
        self
    }
    pub fn default_batch_size(mut self, n: usize) -> Self {
        self.default_batch_size = Some(n);
        self
    }
    pub fn iteration_scheme(mut self, scheme: IterationScheme) -> Self {
        self.iteration_scheme = Some(scheme);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<ExampleProviderSettings, ConfigError> {
        let d = ExampleProviderSettings::default();
        let settings = ExampleProviderSettings {
            shuffle: self.shuffle.unwrap_or(d.shuffle),
            balanced: self.balanced.unwrap_or(d.balanced),
            stratify_receptor: self.stratify_receptor.unwrap_or(d.stratify_receptor),
            labelpos: self.labelpos.unwrap_or(d.labelpos),
            stratify_pos: self.stratify_pos.unwrap_or(d.stratify_pos),
            stratify_abs: self.stratify_abs.unwrap_or(d.stratify_abs),
            stratify_min: self.stratify_min.unwrap_or(d.stratify_min),
            stratify_max: self.stratify_max.unwrap_or(d.stratify_max),
            stratify_step: self.stratify_step.unwrap_or(d.stratify_step),
            group_batch_size: self.group_batch_size.unwrap_or(d.group_batch_size),
            max_group_size: self.max_group_size.unwrap_or(d.max_group_size),
            cache_structs: self.cache_structs.unwrap_or(d.cache_structs),
            duplicate_first: self.duplicate_first.unwrap_or(d.duplicate_first),
            make_vector_types: self.make_vector_types.unwrap_or(d.make_vector_types),
            data_root: self.data_root.unwrap_or(d.data_root),
            recmolcache: self.recmolcache,
            ligmolcache: self.ligmolcache,
            num_labels: self.num_labels,
            default_batch_size: self.default_batch_size.unwrap_or(d.default_batch_size),
            iteration_scheme: self.iteration_scheme.unwrap_or(d.iteration_scheme),
            seed: self.seed,
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = ExampleProviderSettings::default();
        assert_eq!(s.stratify_pos, 1);
        assert!(s.stratify_abs);
        assert!(s.cache_structs);
        assert_eq!(s.default_batch_size, 1);
        assert!(!s.is_grouped());
        assert!(!s.is_value_stratified());
        assert_eq!(ExampleProviderSettings::builder().build().unwrap(), s);
    }

    #[test]
    fn builder_rejects_invalid_values() {
        assert!(matches!(
            ExampleProviderSettings::builder().default_batch_size(0).build(),
            Err(ConfigError::InvalidParameter { name: "default_batch_size", .. })
        ));
        assert!(matches!(
            ExampleProviderSettings::builder().stratify_range(0.0, 10.0, 0.0).build(),
            Err(ConfigError::InvalidParameter { name: "stratify_step", .. })
        ));
        let s = ExampleProviderSettings::builder()
            .stratify_range(0.0, 10.0, 2.5)
            .shuffle(true)
            .seed(3)
            .build()
            .unwrap();
        assert!(s.is_value_stratified());
        assert_eq!(s.seed, Some(3));
    }

    #[test]
    fn iteration_scheme_parses_names() {
        assert_eq!("small_epoch".parse::<IterationScheme>(), Ok(IterationScheme::SmallEpoch));
        assert_eq!("Large-Epoch".parse::<IterationScheme>(), Ok(IterationScheme::LargeEpoch));
        assert!("sometimes".parse::<IterationScheme>().is_err());
        assert_eq!(IterationScheme::Continuous.to_string(), "continuous");
    }
}
