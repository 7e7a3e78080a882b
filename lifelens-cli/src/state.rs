use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use lifelens_core::UserProfile;

pub fn lifelens_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".lifelens"))
}

pub fn ensure_lifelens_home() -> Result<PathBuf> {
    let dir = lifelens_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn profile_path() -> Result<PathBuf> {
    Ok(ensure_lifelens_home()?.join("profile.json"))
}

/// User-level profile fallback, used when the data directory carries none.
pub fn read_profile() -> Result<UserProfile> {
    let p = profile_path()?;
    if !p.exists() {
        return Ok(UserProfile::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(serde_json::from_str(&s)?)
}
