/// Appends the triangles of a convex polygon to `out`.
///
/// The polygon's `count` vertices start at `start`. Every triangle has its first two indices
/// swapped, which flips the games' winding into the scene's. Polygons with more than four
/// vertices are cut as an alternating fan, so no triangle gets too thin.
pub fn triangulate(start: u32, count: usize, out: &mut Vec<u32>) {
    match count {
        0..=2 => {}
        3 => out.extend([start + 1, start, start + 2]),
        4 => out.extend([start + 1, start, start + 3, start + 2, start + 1, start + 3]),
        _ => {
            let (mut a, mut b, mut c) = (0, 1, count as u32 - 1);
            for triangle in 0..count - 2 {
                out.extend([start + b, start + a, start + c]);
                if triangle % 2 == 0 {
                    a = b;
                    b += 1;
                } else {
                    a = c;
                    c -= 1;
                }
            }
        }
    }
}
