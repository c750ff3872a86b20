//! Container adapter
//!
//! Thin surface over the binary container library: load, iterate records,
//! rewrite a texture record in place, serialize. The patch pass only talks to
//! [`AssetContainer`], so other backends can be dropped in behind it.
//!
//! # Example
//!
//! ```ignore
//! use texpatch_lib::container::{load_container, AssetContainer};
//!
//! let bundle = load_container(Path::new("card.bundle"))?;
//! for (index, record) in bundle.records() {
//!     println!("{}: class {}", index, record.class_id.0);
//! }
//! ```

mod bundle;
pub mod error;
mod texture;
mod types;

pub use bundle::{RecordBundle, BUNDLE_SIGNATURE, BUNDLE_VERSION};
pub use error::ContainerError;
pub use texture::TextureHeader;
pub use types::{ClassId, Record, TextureFormat, TextureUpdate};

use std::path::Path;

/// Operations the patch pass needs from a loaded container
pub trait AssetContainer {
    /// Number of records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record at `index` in container order
    fn record(&self, index: usize) -> Option<&Record>;

    /// Lazy pass over the current records; every call starts from the first one
    fn records(&self) -> Records<'_, Self>
    where
        Self: Sized,
    {
        Records {
            container: self,
            next: 0,
        }
    }

    /// Rewrite the texture record at `index`; position and identity are kept
    fn replace_texture(
        &mut self,
        index: usize,
        update: TextureUpdate,
    ) -> Result<(), ContainerError>;

    /// Emit the whole container
    fn serialize(&self) -> Result<Vec<u8>, ContainerError>;
}

/// Iterator returned by [`AssetContainer::records`]
pub struct Records<'a, C> {
    container: &'a C,
    next: usize,
}

impl<'a, C: AssetContainer> Iterator for Records<'a, C> {
    type Item = (usize, &'a Record);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next;
        let record = self.container.record(index)?;
        self.next += 1;
        Some((index, record))
    }
}

/// Load a container from disk
pub fn load_container(path: &Path) -> Result<RecordBundle, ContainerError> {
    tracing::info!("Loading container: {:?}", path);
    let bundle = RecordBundle::load(path)?;
    tracing::info!("Loaded {} records", bundle.len());
    Ok(bundle)
}
