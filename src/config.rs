use serde::{Deserialize, Serialize};

/// Balance used by full geometry rebuilds.
pub const DEFAULT_BALANCE: u8 = 15;
/// Portal bias used by full geometry rebuilds and brush trees.
pub const DEFAULT_PORTAL_BIAS: u8 = 70;
/// Balance used when repartitioning the structural world after CSG.
pub const REPARTITION_BALANCE: u8 = 12;
/// Portal bias used for the throwaway tree built from a CSG operand.
pub const BRUSH_PORTAL_BIAS: u8 = 70;

/// How hard the splitter selector searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EBspOptimization {
    /// Take the first candidate.
    Lame,
    /// Score a sample of about twenty candidates.
    Good,
    /// Score every candidate.
    Optimal,
}

/// Tuning knobs for building and combining, as set from the rebuild dialog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    pub quality: EBspOptimization,
    /// 0 minimizes splits, 100 balances the tree.
    pub balance: u8,
    /// 0 ignores portals, 100 lets portals cut everything.
    pub portal_bias: u8,
    /// Skip merging, refresh and bounds after CSG (interactive edits).
    pub fast_mode: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            quality: EBspOptimization::Optimal,
            balance: DEFAULT_BALANCE,
            portal_bias: DEFAULT_PORTAL_BIAS,
            fast_mode: false,
        }
    }
}

impl BuildOptions {
    pub fn new(quality: EBspOptimization, balance: u8, portal_bias: u8) -> Self {
        BuildOptions { quality, balance, portal_bias, fast_mode: false }
    }

    /// Options for the temporary tree built from a CSG operand, which only
    /// needs cutting planes.
    pub fn lame() -> Self {
        BuildOptions::new(EBspOptimization::Lame, 0, BRUSH_PORTAL_BIAS)
    }

    /// Options for quick rebuilds while the user is dragging things around.
    pub fn interactive() -> Self {
        BuildOptions { quality: EBspOptimization::Lame, fast_mode: true, ..Default::default() }
    }

    pub fn with_quality(self, quality: EBspOptimization) -> Self {
        BuildOptions { quality, ..self }
    }

    /// Clamp percentages into 0..=100.
    pub fn sanitized(self) -> Self {
        BuildOptions {
            balance: self.balance.min(100),
            portal_bias: self.portal_bias.min(100),
            ..self
        }
    }
}
