//! Self-asserted device identity kept on the client.
//!
//! Nothing here is authenticated: any client may claim any device id.

use std::fs;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::FartMapError;

pub const MIN_DISPLAY_NAME_CHARS: usize = 3;

const ADJECTIVES: [&str; 10] = [
    "Windy",
    "Cheeky",
    "Silent",
    "Smelly",
    "Explosive",
    "Thunderous",
    "Tiny",
    "Bubbly",
    "Wet",
    "Stealthy",
];

const NOUNS: [&str; 10] = [
    "Farter",
    "Tooter",
    "GasMaster",
    "WindWizard",
    "CheekChampion",
    "CloudMaker",
    "ButtBard",
    "StinkMage",
    "BlastBeast",
    "BumBard",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalIdentity {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub display_name: String,
}

impl LocalIdentity {
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            device_id: random_device_id(rng),
            display_name: random_display_name(rng),
        }
    }

    /// Replace the display name. Names shorter than
    /// [`MIN_DISPLAY_NAME_CHARS`] after trimming are refused and the current
    /// name is kept.
    pub fn rename(&mut self, name: &str) -> Result<(), FartMapError> {
        let name = name.trim();
        if name.chars().count() < MIN_DISPLAY_NAME_CHARS {
            return Err(FartMapError::Validation(format!(
                "display name must be at least {MIN_DISPLAY_NAME_CHARS} characters"
            )));
        }
        self.display_name = name.to_string();
        Ok(())
    }

    /// Read the identity at `path`, creating or repairing it on first use.
    /// Each missing field is generated independently, so a saved name
    /// survives a lost device id and vice versa.
    pub fn load_or_create(path: &Path) -> Result<Self, FartMapError> {
        Self::load_or_create_with(path, &mut rand::rng())
    }

    pub fn load_or_create_with<R: Rng + ?Sized>(
        path: &Path,
        rng: &mut R,
    ) -> Result<Self, FartMapError> {
        let mut identity = if path.exists() {
            serde_json::from_str::<LocalIdentity>(&fs::read_to_string(path)?)?
        } else {
            LocalIdentity {
                device_id: String::new(),
                display_name: String::new(),
            }
        };

        let mut changed = false;
        if identity.device_id.trim().is_empty() {
            identity.device_id = random_device_id(rng);
            changed = true;
        }
        if identity.display_name.trim().is_empty() {
            identity.display_name = random_display_name(rng);
            changed = true;
        }
        if changed {
            identity.save(path)?;
            info!(device_id = %identity.device_id, "Created local identity");
        }
        Ok(identity)
    }

    pub fn save(&self, path: &Path) -> Result<(), FartMapError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn random_device_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let bytes: [u8; 16] = rng.random();
    uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
}

fn random_display_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    let number = rng.random_range(0..100u32);
    format!("{adjective}{noun}{number}")
}
