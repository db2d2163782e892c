// src/config/institutions.rs
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DigestError;

pub const ENV_INSTITUTIONS_PATH: &str = "DIGEST_INSTITUTIONS_PATH";

/// Research groups whose papers are pushed to the top of the digest.
pub const DEFAULT_INSTITUTIONS: &[&str] = &[
    // North America
    "MIT",
    "Massachusetts Institute of Technology",
    "CMU",
    "Carnegie Mellon University",
    "Stanford",
    "Stanford University",
    "UC Berkeley",
    "University of California, Berkeley",
    "Caltech",
    "California Institute of Technology",
    "University of Pennsylvania",
    "UPenn",
    "GRASP",
    // Europe
    "ETH Zurich",
    "ETH Zürich",
    "University of Zurich",
    "UZH",
    "TUM",
    "Technical University of Munich",
    "Imperial College London",
    // Asia
    "Tsinghua",
    "清华大学",
    "HKUST",
    "Hong Kong University of Science and Technology",
    "NUS",
    "National University of Singapore",
    "Zhejiang University",
    "浙江大学",
    "BUAA",
    "北京航空航天大学",
    "Beihang University",
    "SJTU",
    "Shanghai Jiao Tong University",
    "上海交通大学",
];

pub fn default_institutions() -> Vec<String> {
    DEFAULT_INSTITUTIONS.iter().map(|s| s.to_string()).collect()
}

/// Files probed, in order, when no path is given through the environment.
const LOCAL_FILES: [&str; 2] = ["config/institutions.toml", "config/institutions.json"];

#[derive(serde::Deserialize)]
struct InstitutionsFile {
    institutions: Vec<String>,
}

/// Read an allow-list file: a JSON array for `.json`, otherwise a TOML table
/// with an `institutions` array.
pub fn load_institutions_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading institutions from {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let items = if is_json {
        serde_json::from_str::<Vec<String>>(&content)
            .with_context(|| format!("{} is not a JSON string array", path.display()))?
    } else {
        toml::from_str::<InstitutionsFile>(&content)
            .with_context(|| format!("{} has no `institutions` array", path.display()))?
            .institutions
    };
    Ok(clean_list(items))
}

/// `$DIGEST_INSTITUTIONS_PATH` must exist when set. Otherwise the first local
/// file found wins, and the built-in list is the last resort.
pub fn load_institutions_default() -> Result<Vec<String>> {
    if let Ok(p) = env::var(ENV_INSTITUTIONS_PATH) {
        let path = PathBuf::from(p);
        if !path.exists() {
            return Err(DigestError::Config(format!(
                "{ENV_INSTITUTIONS_PATH} points to non-existent path {}",
                path.display()
            ))
            .into());
        }
        return load_institutions_from(&path);
    }
    match LOCAL_FILES.iter().map(Path::new).find(|p| p.exists()) {
        Some(path) => load_institutions_from(path),
        None => Ok(default_institutions()),
    }
}

/// Trim, drop blanks, drop duplicates; first occurrence wins.
pub fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
