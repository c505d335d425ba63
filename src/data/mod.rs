/// Data layer: core types, loading, filtering, scaling and output files.
///
/// Architecture:
/// ```text
///  <short>.card  +  raw spectrum files
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse manifest → ObjectInfo + SpectrumSet (rest frame)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  scale    │  reference-band means → ScaleFactors
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  boxcar smoothing, window selection, SNR
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  normalized spectra, SNR log     params: parameter history
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod params;
pub mod scale;
pub mod writer;
