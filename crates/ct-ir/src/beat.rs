//! Beat grid types.

use serde::{Deserialize, Serialize};

use crate::time::SessionTimeMs;

/// How the boundary after a macrobeat is drawn. A solid boundary closes a measure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryStyle {
    Solid,
    Anacrusis,
    /// Unknown styles read as dashed.
    #[default]
    #[serde(other)]
    Dashed,
}

/// One microbeat of the grid with absolute timing.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedBeat {
    /// Dense index, 0-based, in time order
    pub index: usize,
    pub time_ms: SessionTimeMs,
    /// First microbeat of its macrobeat
    pub is_macrobeat: bool,
    /// First microbeat of a measure
    pub is_measure_start: bool,
    /// Microbeats in the enclosing macrobeat (2 or 3 in practice)
    pub grouping: u32,
    /// Boundary style of the enclosing macrobeat
    pub boundary_style: BoundaryStyle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_styles_parse_with_dashed_fallback() {
        let styles: Vec<BoundaryStyle> =
            serde_json::from_str(r#"["solid", "anacrusis", "dashed", "dotted"]"#).unwrap();
        assert_eq!(
            styles,
            vec![
                BoundaryStyle::Solid,
                BoundaryStyle::Anacrusis,
                BoundaryStyle::Dashed,
                BoundaryStyle::Dashed,
            ]
        );
        assert_eq!(BoundaryStyle::default(), BoundaryStyle::Dashed);
    }
}
