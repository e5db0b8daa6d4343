use anyhow::{Result, bail};
use rtpsim_engine::seed::fresh_seed;
use serde::Serialize;
use std::collections::HashSet;

/// Seed used when neither the command line nor the config names one.
pub const DEFAULT_SEED: u64 = 1337;

/// Seed metadata carried through a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedInfo {
    pub seed: u64,
    /// Drawn from entropy rather than given on the command line.
    pub generated: bool,
}

impl SeedInfo {
    #[must_use]
    pub const fn from_numeric(seed: u64) -> Self {
        Self {
            seed,
            generated: false,
        }
    }

    #[must_use]
    pub fn random() -> Self {
        Self {
            seed: fresh_seed(),
            generated: true,
        }
    }
}

/// Resolve a list of CLI seed arguments into seeds.
///
/// Supports literal integers (negative values use their magnitude) and the
/// keyword `random`, which draws a fresh seed from OS entropy. Duplicates
/// are dropped. An empty list falls back to `fallback`.
pub fn resolve_seed_inputs(tokens: &[String], fallback: u64) -> Result<Vec<SeedInfo>> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        let info = if token.eq_ignore_ascii_case("random") {
            SeedInfo::random()
        } else if let Ok(value) = token.parse::<i64>() {
            SeedInfo::from_numeric(value.unsigned_abs())
        } else if let Ok(value) = token.parse::<u64>() {
            SeedInfo::from_numeric(value)
        } else {
            bail!("Unrecognized seed token: {token}");
        };

        if seen.insert(info.seed) {
            resolved.push(info);
        }
    }

    if resolved.is_empty() {
        resolved.push(SeedInfo::from_numeric(fallback));
    }

    Ok(resolved)
}
