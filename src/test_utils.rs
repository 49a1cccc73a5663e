use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const FIXTURE_NAMES: &[&str] = &[
    "20140214_packets.vbus",
    "20140215_packets.vbus",
    "20140216_packets.vbus",
];

/// Deterministic per-file content; sizes differ so file boundaries never line up with read buffers.
pub fn fixture_content(name: &str) -> Vec<u8> {
    let seed = name.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    let len = 40_000 + (seed % 7_919) as usize;
    (0..len)
        .map(|i| (seed.wrapping_add(i as u32).wrapping_mul(2_654_435_761) >> 24) as u8)
        .collect()
}

/// A temp dir with the three date-coded fixtures plus files the lister must ignore.
pub fn fixture_dir() -> Result<TempDir> {
    let dir = tempfile::Builder::new().prefix("flr-").tempdir()?;
    for name in FIXTURE_NAMES {
        std::fs::write(dir.path().join(name), fixture_content(name))?;
    }
    std::fs::write(dir.path().join("README.txt"), b"not a recording")?;
    std::fs::write(dir.path().join("2014021_short.vbus"), b"too short")?;
    std::fs::create_dir(dir.path().join("20140217_subdir"))?;
    Ok(dir)
}

pub fn fixture_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

/// Byte concatenation of the named fixtures, in the given order.
pub fn expected_concat(names: &[&str]) -> Vec<u8> {
    names.iter().flat_map(|n| fixture_content(n)).collect()
}
