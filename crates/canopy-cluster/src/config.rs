//! Group configuration files and their on-disk layout.

use std::fs;
use std::path::{Path, PathBuf};

use canopy_types::GroupId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClusterError, Result};

/// Resolves the per-group directory layout under a configuration home.
///
/// Group `N` lives in a zero-padded `gNN` directory; the cluster-wide
/// topology file sits beside the group directories.
#[derive(Debug, Clone)]
pub struct GroupDirs {
    home: PathBuf,
}

impl GroupDirs {
    /// Creates the layout rooted at `home`.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Returns the configuration home.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Returns the directory holding one group's configuration.
    pub fn group_dir(&self, group: GroupId) -> PathBuf {
        self.home.join(format!("g{:02}", group.as_u64()))
    }

    /// Returns the path of one group's configuration file.
    pub fn config_path(&self, group: GroupId) -> PathBuf {
        self.group_dir(group).join("group.toml")
    }

    /// Returns the cluster-wide topology file path.
    pub fn topology_path(&self) -> PathBuf {
        self.home.join("topology.json")
    }
}

/// One group's engine-connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// The group this configuration describes.
    pub group_id: GroupId,

    /// Number of replicas in the group.
    pub replica_count: u32,

    /// Number of Byzantine faults the group tolerates.
    pub fault_tolerance: u32,

    /// One address per replica, in replica-id order.
    pub addresses: Vec<String>,
}

impl GroupConfig {
    /// Builds the configuration scaffolding starts groups from: four
    /// replicas tolerating one fault, on consecutive local ports.
    pub fn scaffolded(group: GroupId, base_port: u16) -> Self {
        let replica_count: u32 = 4;
        let addresses = (0..replica_count)
            .map(|replica| format!("127.0.0.1:{}", base_port + replica as u16))
            .collect();

        Self {
            group_id: group,
            replica_count,
            fault_tolerance: 1,
            addresses,
        }
    }

    /// The minimum number of forwarded copies that prove a sending group
    /// agreed on a request: `replica_count - fault_tolerance`.
    pub fn min_receive_count(&self) -> u32 {
        self.replica_count.saturating_sub(self.fault_tolerance)
    }

    /// Checks the arithmetic the receive threshold relies on.
    pub fn validate(&self) -> Result<()> {
        if self.fault_tolerance >= self.replica_count {
            return Err(ClusterError::InvalidThreshold {
                group: self.group_id,
                replica_count: self.replica_count,
                fault_tolerance: self.fault_tolerance,
            });
        }
        if self.addresses.len() != self.replica_count as usize {
            return Err(ClusterError::AddressMismatch {
                group: self.group_id,
                replica_count: self.replica_count,
                addresses: self.addresses.len(),
            });
        }
        Ok(())
    }

    /// Loads and validates one group's configuration.
    pub fn load(dirs: &GroupDirs, group: GroupId) -> Result<Self> {
        let path = dirs.config_path(group);
        if !path.exists() {
            return Err(ClusterError::MissingGroup { group, path });
        }

        let content = fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;

        debug!(group = %group, path = %path.display(), "loaded group configuration");
        Ok(config)
    }

    /// Saves this configuration into its group directory, creating the
    /// directory if needed.
    pub fn save(&self, dirs: &GroupDirs) -> Result<()> {
        let dir = dirs.group_dir(self.group_id);
        fs::create_dir_all(&dir)?;

        let content = toml::to_string_pretty(self)?;
        fs::write(dirs.config_path(self.group_id), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(group: u64) -> GroupConfig {
        GroupConfig::scaffolded(GroupId::new(group), 10000)
    }

    #[test]
    fn group_dirs_follow_the_zero_padded_convention() {
        let dirs = GroupDirs::new("/tmp/canopy");

        assert!(dirs.group_dir(GroupId::new(3)).ends_with("g03"));
        assert!(dirs.group_dir(GroupId::new(12)).ends_with("g12"));
        assert!(dirs.config_path(GroupId::new(0)).ends_with("g00/group.toml"));
        assert!(dirs.topology_path().ends_with("topology.json"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let dirs = GroupDirs::new(temp.path());
        let config = sample(2);

        config.save(&dirs).unwrap();
        let loaded = GroupConfig::load(&dirs, GroupId::new(2)).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_groups_are_reported_with_their_path() {
        let temp = TempDir::new().unwrap();
        let dirs = GroupDirs::new(temp.path());

        let err = GroupConfig::load(&dirs, GroupId::new(5)).unwrap_err();
        assert!(matches!(err, ClusterError::MissingGroup { group, .. } if group == GroupId::new(5)));
    }

    #[test]
    fn the_receive_threshold_subtracts_tolerated_faults() {
        let config = sample(0);
        assert_eq!(config.replica_count, 4);
        assert_eq!(config.fault_tolerance, 1);
        assert_eq!(config.min_receive_count(), 3);
    }

    #[test]
    fn degenerate_fault_tolerance_is_rejected() {
        let mut config = sample(0);
        config.fault_tolerance = config.replica_count;

        assert!(matches!(
            config.validate(),
            Err(ClusterError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn address_lists_must_cover_every_replica() {
        let mut config = sample(0);
        config.addresses.pop();

        assert!(matches!(
            config.validate(),
            Err(ClusterError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn loading_rejects_invalid_configs() {
        let temp = TempDir::new().unwrap();
        let dirs = GroupDirs::new(temp.path());
        let mut config = sample(1);
        config.fault_tolerance = 9;
        config.save(&dirs).unwrap();

        assert!(matches!(
            GroupConfig::load(&dirs, GroupId::new(1)),
            Err(ClusterError::InvalidThreshold { .. })
        ));
    }
}
