//! Release versioning and publishing
//!
//! # Invariants
//!
//! 1. **Versions come from commit subjects only**
//!    - The newest `<prefix> v<M>.<m>` / `<prefix> version <M>.<m>` subject is the prior release
//!    - No prior release means the next one is 1.1
//!
//! 2. **One version per run**
//!    - Per-group runs bump once for all groups, not once per group
//!
//! 3. **Artifacts are committed as literal bytes**
//!    - The publish guard is the only code that mutates the index or working-tree attributes
//!    - An LFS pointer stub never reaches a commit

pub mod appboot;
pub mod guard;
pub mod version;
