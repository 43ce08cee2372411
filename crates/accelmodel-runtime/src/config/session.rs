use derive_more::Display;

/// Session defaults.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SessionConfig {
    /// Accelerator profile used when the caller doesn't pick one.
    #[serde(default)]
    pub profile: ProfileKind,
}

/// The hardware families that can be modeled.
#[derive(
    Default, Clone, Copy, Debug, Display, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum ProfileKind {
    /// Systolic-array accelerator with a software-managed scratchpad.
    #[default]
    #[display("tpu")]
    #[serde(rename = "tpu")]
    Tpu,

    /// Tensor-core accelerator with a hardware-managed L2 cache.
    #[display("gpu")]
    #[serde(rename = "gpu")]
    Gpu,
}

impl ProfileKind {
    /// Parse a profile name, returns `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tpu" | "tpu-v5e" => Some(ProfileKind::Tpu),
            "gpu" | "h100" => Some(ProfileKind::Gpu),
            _ => None,
        }
    }
}
