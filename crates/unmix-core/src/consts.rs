/// Default number of pixels handed to a worker as one task.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Side length of the spatial median kernel applied before unmixing.
pub const MEDIAN_KERNEL_SIZE: usize = 3;

/// Multiplier on the channel count giving the default NNLS iteration cap.
pub const NNLS_MAX_ITER_FACTOR: usize = 3;

/// Scale factor on machine epsilon for the NNLS dual-feasibility tolerance.
pub const NNLS_TOLERANCE_FACTOR: f64 = 10.0;

/// Minimum pivot, relative to the largest Gram diagonal entry, accepted by
/// the passive-set Cholesky factorisation.
pub const CHOLESKY_RELATIVE_PIVOT: f64 = 1e-12;

/// Micrometres per centimetre, for pixels-per-cm resolution in output manifests.
pub const MICRONS_PER_CM: f64 = 10_000.0;

/// Suffix appended to the input stem for all output files.
pub const OUTPUT_SUFFIX: &str = "-unmixed";

/// Header names treated as a band label column in reference CSV files.
pub const BAND_LABEL_HEADERS: [&str; 3] = ["band", "wavelength", "lambda"];
