//! Compile-time support for runtime layout re-randomization.
//!
//! Two module passes are provided. `lower-intrinsics` replaces compiler
//! intrinsics with ordinary external libcalls so later code generation
//! cannot reintroduce hidden constant-pool references. `stabilize` rewrites
//! a module so that a small runtime can relocate its code, stack frames,
//! heap allocations, and globals at any moment during execution: heap
//! allocator calls are rewired to runtime replacements, every call site is
//! bracketed with a random stack pad, every function reaches globals only
//! through a per-function relocation table, and a single synthesized module
//! constructor registers all of it with the runtime.
//!
//! The passes only prepare the module; randomization itself happens in the
//! runtime library, which also supplies the `main` that eventually invokes
//! the renamed `stabilizer_main`.

pub mod code;
pub mod config;
pub mod ctor;
pub mod diagnostics;
pub mod float_extract;
pub mod heap;
pub mod libcalls;
pub mod lower_intrinsics;
pub mod pipeline;
pub mod stack;
pub mod stabilize;

pub use code::{randomize_code, FuncRegistration, SENTINEL_ALIGN, SENTINEL_PREFIX};
pub use config::StabilizerConfig;
pub use ctor::{MODULE_CTOR, RENAMED_MAIN};
pub use diagnostics::{Diagnostic, Location, Severity};
pub use lower_intrinsics::{run_lower_intrinsics, LowerIntrinsicsReport};
pub use pipeline::{run_pass, PassId, PassReport};
pub use stabilize::{run_stabilize, StabilizeReport};
