//! Format dispatch and the one-call loading entry point
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::MeshResult;
use crate::format::{detect_format, MeshFormat};
use crate::normals::NormalMode;
use crate::obj;
use crate::options::{LoadOptions, NormalPolicy};
use crate::stl;
use crate::store::MeshStore;

impl MeshStore {
    /// Read `path` into this store and refresh the bounding box.
    ///
    /// `format` is an optional `obj`/`sla`/`slb` token; without one the
    /// format is detected from the path. A failed load leaves the store
    /// partially filled.
    pub fn load(&mut self, path: impl AsRef<Path>, format: Option<&str>) -> MeshResult<MeshFormat> {
        let path = path.as_ref();
        let format = detect_format(path, format)?;
        debug!("Loading {:?} as {}", path, format);

        match format {
            MeshFormat::Obj => obj::load_obj(self, path)?,
            MeshFormat::StlAscii => stl::load_ascii_stl(self, path)?,
            MeshFormat::StlBinary => stl::load_binary_stl(self, path)?,
        }

        let bbox = self.compute_bounding_box();
        info!(
            "Loaded {:?} ({}): {} triangles, {} normals, bbox {:?} to {:?}",
            path,
            format,
            self.triangle_count(),
            self.normal_count(),
            bbox.min.coords.as_slice(),
            bbox.max.coords.as_slice()
        );
        Ok(format)
    }
}

fn needs_normals(store: &MeshStore, format: MeshFormat, policy: NormalPolicy) -> bool {
    match policy {
        NormalPolicy::Never => false,
        NormalPolicy::Always => true,
        NormalPolicy::Auto => {
            format == MeshFormat::Obj && store.normal_count() != store.vertex_count()
        }
    }
}

/// Load a mesh into a new store and apply the normal policy of `options`.
pub fn load_mesh(
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> MeshResult<(MeshStore, MeshFormat)> {
    let mut store = MeshStore::new();
    let format = store.load(path, options.format.map(|f| f.token()))?;

    if needs_normals(&store, format, options.normals) {
        if store.is_empty() {
            warn!("No triangles loaded, skipping normal generation");
        } else {
            store.generate_normals(NormalMode::PerVertex, options.tolerance)?;
        }
    }

    Ok((store, format))
}
