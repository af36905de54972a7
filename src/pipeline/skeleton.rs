//! Hand skeleton overlay drawn straight into the RGBA frame buffer.

/// Bone list in MediaPipe landmark numbering: thumb, index, middle, ring,
/// pinky chains from the wrist plus the knuckle bridge.
pub const CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (5, 9),
    (9, 13),
    (13, 17),
];

const SKELETON_LINE_THICKNESS: i32 = 5;

const BONE_COLOR: [u8; 4] = [0, 255, 0, 255];
const JOINT_COLOR: [u8; 4] = [255, 0, 0, 255];

pub fn draw_skeleton(buffer: &mut [u8], width: u32, height: u32, points: &[(f32, f32)]) {
    if points.len() < 2 {
        return;
    }

    for &(a, b) in CONNECTIONS {
        if let (Some(pa), Some(pb)) = (points.get(a), points.get(b)) {
            draw_line(
                buffer,
                width,
                height,
                pa,
                pb,
                BONE_COLOR,
                SKELETON_LINE_THICKNESS,
            );
        }
    }

    let joint_radius = (SKELETON_LINE_THICKNESS / 2).max(2) + 2;
    for &(x, y) in points {
        draw_circle(
            buffer,
            width,
            height,
            (x as i32, y as i32),
            joint_radius,
            JOINT_COLOR,
        );
    }
}

fn draw_line(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    p0: &(f32, f32),
    p1: &(f32, f32),
    color: [u8; 4],
    thickness: i32,
) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        put_pixel_safe(buffer, width, height, x0, y0, color);
        if radius > 0 {
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if ox == 0 && oy == 0 {
                        continue;
                    }
                    if ox.abs() + oy.abs() <= radius {
                        put_pixel_safe(buffer, width, height, x0 + ox, y0 + oy, color);
                    }
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    center: (i32, i32),
    radius: i32,
    color: [u8; 4],
) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(buffer, width, height, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(buffer: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= width || uy >= height {
        return;
    }
    let idx = ((uy * width + ux) as usize) * 4;
    if idx + 3 < buffer.len() {
        buffer[idx..idx + 4].copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_points_do_not_panic() {
        let mut buffer = vec![0u8; 16 * 16 * 4];
        let points = vec![(-50.0, -50.0); 21];
        draw_skeleton(&mut buffer, 16, 16, &points);
    }

    #[test]
    fn joints_are_painted() {
        let mut buffer = vec![0u8; 64 * 64 * 4];
        let points = vec![(32.0, 32.0); 21];
        draw_skeleton(&mut buffer, 64, 64, &points);

        let idx = ((32 * 64 + 32) as usize) * 4;
        assert_eq!(&buffer[idx..idx + 4], &JOINT_COLOR);
    }

    #[test]
    fn single_point_draws_nothing() {
        let mut buffer = vec![0u8; 8 * 8 * 4];
        draw_skeleton(&mut buffer, 8, 8, &[(4.0, 4.0)]);
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn connections_stay_within_landmark_range() {
        for &(a, b) in CONNECTIONS {
            assert!(a < 21 && b < 21);
        }
    }
}
