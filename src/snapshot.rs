use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::world::{World, WorldSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub written_at: String,
    #[serde(flatten)]
    pub state: WorldSnapshot,
}

/// Writes `<output_dir>/<scenario>/cycle_NNNNNN.json` every `interval`
/// cycles. An interval of 0 disables writing.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    output_dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(output_dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            interval,
        }
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn should_write(&self, cycle: u64) -> bool {
        self.interval != 0 && cycle % self.interval == 0
    }

    pub fn maybe_write(&self, scenario: &str, world: &World) -> Result<Option<PathBuf>> {
        if !self.should_write(world.cycle()) {
            return Ok(None);
        }
        self.write(scenario, world).map(Some)
    }

    pub fn write(&self, scenario: &str, world: &World) -> Result<PathBuf> {
        let dir = self.output_dir.join(scenario);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        let path = dir.join(format!("cycle_{:06}.json", world.cycle()));
        let file = SnapshotFile {
            written_at: chrono::Utc::now().to_rfc3339(),
            state: world.snapshot(scenario),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        tracing::debug!(path = %path.display(), "snapshot written");
        Ok(path)
    }
}

pub fn read_snapshot(path: impl AsRef<Path>) -> Result<SnapshotFile> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn zero_interval_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path(), 0);
        let world = World::new(catalog::initial_regions(), 100);
        assert!(writer.maybe_write("calm", &world).unwrap().is_none());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path(), 1);
        let world = World::new(catalog::initial_regions(), 100);
        let path = writer.maybe_write("calm", &world).unwrap().unwrap();
        assert!(path.ends_with("calm/cycle_000001.json"));
        let file = read_snapshot(&path).unwrap();
        assert_eq!(file.state.cycle, 1);
        assert_eq!(file.state.regions.len(), 3);
        assert!(chrono::DateTime::parse_from_rfc3339(&file.written_at).is_ok());
    }
}
