#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3};
use unmix_core::io::AcquisitionInfo;
use unmix_core::spectral::{BandStack, ReferenceMatrix};

/// Identity reference: channel `c` responds only in band `c`.
pub fn make_identity_reference(n: usize) -> ReferenceMatrix {
    ReferenceMatrix::unlabeled(Array2::eye(n)).unwrap()
}

/// Gaussian emission profiles with peaks spread evenly across the bands.
///
/// Channels are labelled `dye0`, `dye1`, ...
pub fn make_reference(bands: usize, channels: usize) -> ReferenceMatrix {
    let data = Array2::from_shape_fn((bands, channels), |(b, c)| {
        let center = (c as f64 + 0.5) * bands as f64 / channels as f64;
        let d = (b as f64 + 0.5 - center) / 1.5;
        (-0.5 * d * d).exp()
    });
    let labels = (0..channels).map(|c| format!("dye{c}")).collect();
    ReferenceMatrix::new(data, labels).unwrap()
}

/// Band stack where pixel `(x, y)` is the mixture `A · weights(x, y)`.
pub fn make_mixture_stack(
    reference: &ReferenceMatrix,
    width: usize,
    height: usize,
    weights: impl Fn(usize, usize, usize) -> f64,
) -> BandStack {
    let a = reference.data();
    let data = Array3::from_shape_fn((reference.bands(), width, height), |(b, x, y)| {
        (0..reference.channels())
            .map(|c| a[[b, c]] * weights(x, y, c))
            .sum::<f64>() as f32
    });
    BandStack::new(data, 16)
}

/// Non-negative weights that vary smoothly over the image.
pub fn smooth_weights(x: usize, y: usize, c: usize) -> f64 {
    ((x * 7 + y * 3 + c * 11) % 17) as f64 * 10.0 + 5.0
}

/// Stack whose every sample is distinct: `band * 10000 + x * 100 + y`.
pub fn make_unique_stack(bands: usize, width: usize, height: usize) -> BandStack {
    let data = Array3::from_shape_fn((bands, width, height), |(b, x, y)| {
        (b * 10000 + x * 100 + y) as f32
    });
    BandStack::new(data, 16)
}

/// Write a reference CSV with a leading band column.
pub fn write_reference_csv(path: &Path, reference: &ReferenceMatrix) {
    let mut text = String::from("band");
    for label in reference.labels() {
        text.push(',');
        text.push_str(label);
    }
    text.push('\n');
    for (b, row) in reference.data().rows().into_iter().enumerate() {
        text.push_str(&b.to_string());
        for v in row {
            text.push_str(&format!(",{v}"));
        }
        text.push('\n');
    }
    std::fs::write(path, text).unwrap();
}

/// Write a 16-bit raw stack (planes of `[band, x, y]` arrays) plus its
/// `.toml` sidecar. Returns the data file path.
pub fn write_raw_stack(
    dir: &Path,
    name: &str,
    planes: &[Array3<u16>],
    lasers: Vec<u32>,
) -> PathBuf {
    let (bands, width, height) = planes[0].dim();
    let mut bytes = Vec::new();
    for plane in planes {
        for b in 0..bands {
            for y in 0..height {
                for x in 0..width {
                    bytes.extend_from_slice(&plane[[b, x, y]].to_le_bytes());
                }
            }
        }
    }
    let path = dir.join(format!("{name}.raw"));
    std::fs::write(&path, bytes).unwrap();

    let info = AcquisitionInfo {
        bands,
        width,
        height,
        planes: planes.len(),
        bit_depth: 16,
        lasers,
        scale: None,
    };
    info.save(&AcquisitionInfo::sidecar_path(&path)).unwrap();
    path
}

/// `(bands, width, height)` u16 plane with distinct per-band values.
pub fn make_raw_plane(bands: usize, width: usize, height: usize, offset: u16) -> Array3<u16> {
    Array3::from_shape_fn((bands, width, height), |(b, x, y)| {
        offset + (b * 1000 + x * 10 + y) as u16
    })
}
