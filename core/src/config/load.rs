use std::path::Path;

use super::types::EngineConfig;

/// Loads engine configuration with the usual priority:
/// `FLOWEXEC_CONFIG` env path (highest), then `./flowexec.toml`, then
/// built-in defaults.
pub fn load_default() -> anyhow::Result<EngineConfig> {
    if let Some(path) = std::env::var_os("FLOWEXEC_CONFIG") {
        return load_from(Path::new(&path));
    }

    let local = Path::new("flowexec.toml");
    if local.exists() {
        return load_from(local);
    }

    Ok(EngineConfig::default())
}

pub fn load_from(path: &Path) -> anyhow::Result<EngineConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;
    let cfg = toml::from_str::<EngineConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_from_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pool]\nio_limit = 7").unwrap();
        let cfg = load_from(file.path()).unwrap();
        assert_eq!(cfg.pool.io_limit, 7);
    }

    #[test]
    fn load_from_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pool = \"nope\"").unwrap();
        assert!(load_from(file.path()).is_err());
    }
}
