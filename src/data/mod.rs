/// Data layer: the canonical table and the transforms over it.
///
/// Architecture:
/// ```text
///  .arw / .asc / .csv
///        │
///        ▼
///   ┌───────────┐
///   │  parsers   │  vendor file + resolved metadata → RawRecords
///   └───────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ assemble   │  concatenate in file-list order, volume = time × flow
///   └───────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ normalize  │  per (sample, channel): rescale signal to [0, 1]
///   └───────────┘
///        │
///        ▼
///   ┌───────────┐
///   │  reduce    │  per (sample, channel, kind): uniform-stride subsample
///   └───────────┘
/// ```
pub mod assemble;
pub mod model;
pub mod normalize;
pub mod reduce;
