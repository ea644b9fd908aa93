//! Configuration types for the generator, the supervisor and the launcher

use crate::channel::ChannelNames;

/// Configuration for a generator process
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Seed for the coloring RNG (None = seeded from the OS)
    pub seed: Option<u64>,
    /// Stop after emitting this many candidates (None = until terminated)
    pub limit: Option<u64>,
}

impl GeneratorConfig {
    pub fn with_seed_option(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_limit_option(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }
}

/// Configuration for the supervisor
#[derive(Debug, Clone, Default)]
pub struct SupervisorConfig {
    /// Stop after consuming this many candidates (None = until solved or
    /// interrupted)
    pub limit: Option<u64>,
}

impl SupervisorConfig {
    pub fn with_limit_option(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }
}

/// Configuration for `solve`: one supervisor plus spawned generators
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Number of generator processes to spawn
    pub generators: usize,
    /// Names of the shared objects
    pub names: ChannelNames,
    /// Base seed; generator `i` gets `seed + i`
    pub base_seed: Option<u64>,
    pub supervisor: SupervisorConfig,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            generators: num_cpus::get(),
            names: ChannelNames::default(),
            base_seed: None,
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl LaunchConfig {
    pub fn with_generators(mut self, generators: usize) -> Self {
        self.generators = generators.max(1);
        self
    }

    pub fn with_names(mut self, names: ChannelNames) -> Self {
        self.names = names;
        self
    }

    pub fn with_seed_option(mut self, seed: Option<u64>) -> Self {
        self.base_seed = seed;
        self
    }

    pub fn with_supervisor(mut self, supervisor: SupervisorConfig) -> Self {
        self.supervisor = supervisor;
        self
    }

    /// Seed for generator `index`, if a base seed was given.
    pub fn generator_seed(&self, index: usize) -> Option<u64> {
        self.base_seed.map(|s| s.wrapping_add(index as u64))
    }
}
