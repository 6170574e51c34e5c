use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A folder on one machine that should be exported and mounted across the fleet.
///
/// Unique by `(machine_name, folder_path)`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ShareDefinition {
    /// machine that owns and exports the folder
    pub machine_name: String,
    /// absolute folder path on the owning machine
    pub folder_path: String,
    /// `host:path` other machines mount from
    pub source: String,
    /// local mount point on every machine
    pub target: String,
}

impl ShareDefinition {
    /// Builds the definition for `point`, exported from `owner_addr`.
    ///
    /// The mount target is `<mount_root>/shared/<machine>_<folder name>`.
    pub fn derive(point: &SharePoint, owner_addr: &str, mount_root: &Path) -> Self {
        let folder = normalize_folder(&point.folder_path);
        let target = mount_root.join("shared").join(format!(
            "{}_{}",
            point.machine_name,
            folder_name(folder)
        ));
        ShareDefinition {
            machine_name: point.machine_name.clone(),
            folder_path: folder.to_string(),
            source: format!("{owner_addr}:{folder}"),
            target: target.to_string_lossy().into_owned(),
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.machine_name, &self.folder_path)
    }

    pub fn mount_spec(&self) -> MountSpec {
        MountSpec {
            source: self.source.clone(),
            target: self.target.clone(),
        }
    }
}

/// `path` without surrounding whitespace or trailing slashes; `/` stays `/`.
pub fn normalize_folder(path: &str) -> &str {
    let path = path.trim();
    match path.trim_end_matches('/') {
        "" if path.starts_with('/') => "/",
        trimmed => trimmed,
    }
}

/// Last component of `path`, ignoring trailing slashes.
pub fn folder_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// What an operator asks for: share `folder_path` living on `machine_name`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SharePoint {
    pub machine_name: String,
    pub folder_path: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub source: String,
    pub target: String,
}

impl fmt::Display for MountSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub machine_name: String,
    pub address: String,
}

/// Remote action attempted by a sync pass.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// reading the owner's shares from the store
    ReadShares,
    CreateExport,
    Mount,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub machine_name: String,
    pub action: SyncAction,
    pub share: String,
    pub error: String,
}

/// Outcome of a reconcile pass over the desired state.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// owners whose exports were pushed
    pub synced: Vec<String>,
    /// owners with shares that could not be synced: no live connection, or
    /// their shares could not be read
    pub unreachable: Vec<String>,
    pub failures: Vec<CallFailure>,
}

impl SyncReport {
    pub fn merge(&mut self, other: SyncReport) {
        for name in other.synced {
            if !self.synced.contains(&name) {
                self.synced.push(name);
            }
        }
        for name in other.unreachable {
            if !self.unreachable.contains(&name) {
                self.unreachable.push(name);
            }
        }
        self.failures.extend(other.failures);
    }
}
