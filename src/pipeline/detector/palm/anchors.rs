//! SSD anchor grid for the 192x192 MediaPipe palm detector.
//!
//! The model regresses box centers relative to a fixed anchor layout:
//! a 24x24 grid with 2 anchors per cell (stride 8) followed by three
//! 12x12 layers with 2 anchors per cell each (stride 16). All anchors
//! share the same center within a cell, so only (cx, cy) is stored.

use std::sync::LazyLock;

pub const NUM_ANCHORS: usize = 2016;

pub static ANCHORS: LazyLock<Vec<[f32; 2]>> = LazyLock::new(build_anchors);

fn build_anchors() -> Vec<[f32; 2]> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    // (grid size, anchors per cell) per feature map layer
    for (grid, per_cell) in [(24usize, 2usize), (12, 6)] {
        for y in 0..grid {
            for x in 0..grid {
                let cx = (x as f32 + 0.5) / grid as f32;
                let cy = (y as f32 + 0.5) / grid as f32;
                for _ in 0..per_cell {
                    anchors.push([cx, cy]);
                }
            }
        }
    }
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_count_matches_model_output() {
        assert_eq!(ANCHORS.len(), NUM_ANCHORS);
    }

    #[test]
    fn anchors_are_cell_centers_in_unit_space() {
        // First cell of the 24x24 layer.
        assert!((ANCHORS[0][0] - 0.5 / 24.0).abs() < 1e-6);
        assert!((ANCHORS[0][1] - 0.5 / 24.0).abs() < 1e-6);
        // Both anchors of a cell share a center.
        assert_eq!(ANCHORS[0], ANCHORS[1]);

        // First cell of the 12x12 layers sits right after the 24x24 block.
        let offset = 24 * 24 * 2;
        assert!((ANCHORS[offset][0] - 0.5 / 12.0).abs() < 1e-6);

        for anchor in ANCHORS.iter() {
            assert!(anchor[0] > 0.0 && anchor[0] < 1.0);
            assert!(anchor[1] > 0.0 && anchor[1] < 1.0);
        }
    }
}
