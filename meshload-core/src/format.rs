//! Mesh format selection from an explicit token, the path suffix, or file contents
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MeshError, MeshResult};

/// Longest first line inspected when sniffing an `.stl` file.
const SNIFF_LINE_LIMIT: u64 = 256;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshFormat {
    #[serde(rename = "obj")]
    Obj,
    #[serde(rename = "sla")]
    StlAscii,
    #[serde(rename = "slb")]
    StlBinary,
}

impl MeshFormat {
    /// Short token accepted on the command line and in config files.
    pub fn token(&self) -> &'static str {
        match self {
            MeshFormat::Obj => "obj",
            MeshFormat::StlAscii => "sla",
            MeshFormat::StlBinary => "slb",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MeshFormat::Obj => "Wavefront OBJ",
            MeshFormat::StlAscii => "STL (ASCII)",
            MeshFormat::StlBinary => "STL (binary)",
        }
    }

    /// Format implied by an unambiguous suffix. `.stl` is not resolved here.
    pub fn from_suffix(path: &Path) -> Option<Self> {
        const SUFFIXES: &[(&str, MeshFormat)] = &[
            (".obj", MeshFormat::Obj),
            (".wfo", MeshFormat::Obj),
            (".sla", MeshFormat::StlAscii),
            (".stla", MeshFormat::StlAscii),
            (".slb", MeshFormat::StlBinary),
            (".stlb", MeshFormat::StlBinary),
        ];
        let name = path.to_string_lossy();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| {
                name.ends_with(suffix) || name.ends_with(suffix.to_uppercase().as_str())
            })
            .map(|&(_, format)| format)
    }
}

impl FromStr for MeshFormat {
    type Err = MeshError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "obj" => Ok(MeshFormat::Obj),
            "sla" => Ok(MeshFormat::StlAscii),
            "slb" => Ok(MeshFormat::StlBinary),
            other => Err(MeshError::InvalidArgument(format!(
                "unknown format token {other:?} (expected obj, sla or slb)"
            ))),
        }
    }
}

impl std::fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn has_stl_suffix(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(".stl") || name.ends_with(".STL")
}

/// Decide whether an `.stl` file is ASCII by looking for `solid` in its
/// first line. A file that ends within its first line counts as binary.
pub fn is_stl_ascii(path: &Path) -> MeshResult<bool> {
    let file = File::open(path).map_err(|e| MeshError::io(path, e))?;
    let mut reader = BufReader::new(file);

    let mut line = Vec::new();
    (&mut reader)
        .take(SNIFF_LINE_LIMIT)
        .read_until(b'\n', &mut line)
        .map_err(|e| MeshError::io(path, e))?;

    // skip the rest of the line terminator
    loop {
        let next = reader
            .fill_buf()
            .map_err(|e| MeshError::io(path, e))?
            .first()
            .copied();
        match next {
            Some(b'\r' | b'\n') => reader.consume(1),
            Some(_) => break,
            None => return Ok(false),
        }
    }

    Ok(line.windows(5).any(|w| w == b"solid"))
}

/// Select the format for `path`.
///
/// An explicit, non-empty `token` wins. Otherwise the suffix decides, and
/// `.stl` files are sniffed for the `solid` keyword.
pub fn detect_format(path: &Path, token: Option<&str>) -> MeshResult<MeshFormat> {
    if path.as_os_str().is_empty() {
        return Err(MeshError::InvalidArgument("empty path".to_string()));
    }

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        return token.parse();
    }

    if let Some(format) = MeshFormat::from_suffix(path) {
        debug!("Format {:?} from suffix of {:?}", format, path);
        return Ok(format);
    }

    if has_stl_suffix(path) {
        let format = if is_stl_ascii(path)? {
            MeshFormat::StlAscii
        } else {
            MeshFormat::StlBinary
        };
        debug!("Format {:?} sniffed from contents of {:?}", format, path);
        return Ok(format);
    }

    Err(MeshError::FormatError(format!(
        "cannot determine mesh format of {}",
        path.display()
    )))
}
