//! Shared DTOs (schemas-as-code) for the cmorfix workspace.
//!
//! # Design constraints
//! - Cubes and reports are serialized to disk.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod cube;
pub mod key;
pub mod report;
pub mod stage;

pub use cube::{Coord, Cube, CubeError};
pub use key::{ALL_VARS, HandlerKey, normalize};
pub use stage::Stage;

/// Schema identifiers.
pub mod schema {
    pub const CMORFIX_CUBE_V1: &str = "cmorfix.cube.v1";
    pub const CMORFIX_REPORT_V1: &str = "cmorfix.report.v1";
}
