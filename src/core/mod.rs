pub mod error;
pub mod terrain;
pub mod types;

pub use error::{Result, StoreError};
pub use terrain::TerrainMap;
pub use types::{
    ObjectFlags, ParcelData, ParcelFlags, REGION_SIZE, RegionInfo, SceneObjectGroup,
    SceneObjectPart,
};
