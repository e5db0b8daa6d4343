pub mod batch;
pub mod checks;
pub mod config_file;
pub mod reports;
pub mod seeds;

pub use batch::{BatchOptions, RunOutcome, run_batch};
pub use config_file::{ConfigBundle, load_bundle};
pub use seeds::{DEFAULT_SEED, SeedInfo, resolve_seed_inputs};
