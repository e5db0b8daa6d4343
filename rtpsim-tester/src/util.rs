use anyhow::{Context, Result};
use rtpsim_engine::SummaryView;
use twox_hash::XxHash64;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Stable fingerprint of a summary's JSON encoding.
pub fn fingerprint(summary: &SummaryView) -> Result<u64> {
    let bytes = serde_json::to_vec(summary).context("serializing summary for fingerprint")?;
    Ok(XxHash64::oneshot(0, &bytes))
}
