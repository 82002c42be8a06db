//! Load settings shared by the library facade and the command line
use serde::{Deserialize, Serialize};

use crate::format::MeshFormat;
use crate::normals::DEFAULT_TOLERANCE;

/// When [`crate::load_mesh`] replaces the normals read from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalPolicy {
    /// Regenerate OBJ normals whose count does not match the vertex count.
    #[default]
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for NormalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(NormalPolicy::Auto),
            "always" => Ok(NormalPolicy::Always),
            "never" => Ok(NormalPolicy::Never),
            other => Err(format!(
                "unknown normal policy {other:?} (expected auto, always or never)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Explicit input format; detected from the path when unset.
    pub format: Option<MeshFormat>,
    pub normals: NormalPolicy,
    /// Smoothing tolerance as the cosine of the largest merged angle.
    pub tolerance: f32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: None,
            normals: NormalPolicy::Auto,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_str() {
        assert_eq!("always".parse::<NormalPolicy>(), Ok(NormalPolicy::Always));
        assert!("sometimes".parse::<NormalPolicy>().is_err());
    }

    #[test]
    fn test_defaults() {
        let options = LoadOptions::default();
        assert_eq!(options.format, None);
        assert_eq!(options.normals, NormalPolicy::Auto);
        assert_eq!(options.tolerance, DEFAULT_TOLERANCE);
    }
}
