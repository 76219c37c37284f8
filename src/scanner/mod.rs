//! The streaming license scanner.
//!
//! Files are read through an overlapping block window ([`window`]),
//! each block is normalized ([`normalize`]) on demand, and the rule
//! tables run staged checks over it ([`evaluator`]), deferring to
//! special-case validators ([`validators`]) where a regex hit alone
//! cannot decide.

pub mod evaluator;
pub mod normalize;
pub mod validators;
pub mod window;

pub use evaluator::{BlockOutcome, FileContext, FileLicenseState, LicenseEvaluator};
pub use normalize::{clean_block, strip_punctuation};
pub use validators::ValidatorVerdict;
pub use window::{BlockReader, ScanBlock, DEFAULT_BLOCK_SIZE, JS_BLOCK_SIZE};
