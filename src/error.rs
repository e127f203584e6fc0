use thiserror::Error;

use crate::model::EModelState;

/// Structural failures. These abort only the requested operation and leave
/// the model untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BspError {
    #[error("operation requires a built BSP tree, but the model is {state:?}")]
    TreeRequired { state: EModelState },
    #[error("operation edits the polygon list and cannot run while the BSP tree is valid")]
    PolysOnlyRequired,
    #[error("unknown poly flag: {0}")]
    UnknownPolyFlag(String),
    #[error("unknown CSG operation: {0}")]
    UnknownCsgOperation(String),
}

/// Recoverable geometry problems hit during a build or CSG operation. The
/// offending polygon or fragment is dropped and the operation carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EBuildErrorKind {
    #[error("polygon collapsed to fewer than three distinct points when added to the BSP")]
    InfinitesimalPolygon,
    #[error("polygon has a zero-area normal")]
    ZeroAreaNormal,
    #[error("polygon has fewer than three vertices")]
    TooFewVertices,
    #[error("encountered out-of-place coplanar while filtering")]
    OutOfPlaceCoplanar,
    #[error("split produced a sliver fragment")]
    DegenerateFragment,
}

/// Outcome of a build, CSG or validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub errors: Vec<EBuildErrorKind>,
    pub dropped_fragment_count: u32,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&mut self, kind: EBuildErrorKind) {
        log::warn!("{}", kind);
        self.errors.push(kind);
    }

    /// Record a fragment that was thrown away because it degenerated.
    pub fn drop_fragment(&mut self, kind: EBuildErrorKind) {
        self.dropped_fragment_count += 1;
        self.push_error(kind);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.dropped_fragment_count == 0
    }

    pub fn merge(&mut self, other: BuildReport) {
        self.errors.extend(other.errors);
        self.dropped_fragment_count += other.dropped_fragment_count;
    }
}
