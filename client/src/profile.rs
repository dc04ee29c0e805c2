use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use lastcall_common::order::Customer;

use crate::error::ProfileError;

/// The signed-in user, as cached on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    /// The order recipient: this user with their saved contact details.
    pub fn customer(&self) -> Customer {
        Customer {
            id: self.id,
            name: self.name.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
        }
    }
}

/// Whole-object persistence of the [`UserProfile`] as a JSON file.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/lastcall/user.json`.
    pub fn default_location() -> Result<Self, ProfileError> {
        let data = dirs::data_dir().ok_or(ProfileError::NoDataDir)?;
        Ok(Self::at(data.join("lastcall").join("user.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored profile, or `None` if nothing has been saved.
    pub fn load(&self) -> Result<Option<UserProfile>, ProfileError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    pub fn save(&self, profile: &UserProfile) -> Result<(), ProfileError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(profile)?;
        std::fs::write(&self.path, data)?;
        info!("Saved profile to {}", self.path.display());
        Ok(())
    }

    /// Forget the stored profile. Clearing an absent profile is not an error.
    pub fn clear(&self) -> Result<(), ProfileError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
