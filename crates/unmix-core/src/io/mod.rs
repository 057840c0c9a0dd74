pub mod acquisition;
pub mod manifest;
pub mod raw;
pub mod tiff;

use crate::error::Result;
use crate::spectral::BandStack;

pub use acquisition::AcquisitionInfo;

/// Supplies band stacks plane by plane, with the acquisition metadata.
pub trait ImageSource {
    fn info(&self) -> &AcquisitionInfo;

    fn read_plane(&self, plane: usize) -> Result<BandStack>;
}
