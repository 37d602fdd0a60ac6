//! Landmark connection tables of the 478-point face mesh.
//!
//! Indices follow the face landmarker's model order: 0-467 are mesh points,
//! 468-472 the right iris (center first), 473-477 the left iris. "Left" and
//! "right" are from the subject's point of view.

use image::Rgb;

use super::DrawingSpec;

/// A line segment between two landmark indices.
pub type Connection = (usize, usize);

/// Number of mesh landmarks (iris points excluded).
pub const MESH_LANDMARK_COUNT: usize = 468;

pub const LIPS: &[Connection] = &[
    (61, 146), (146, 91), (91, 181), (181, 84), (84, 17),
    (17, 314), (314, 405), (405, 321), (321, 375), (375, 291),
    (61, 185), (185, 40), (40, 39), (39, 37), (37, 0),
    (0, 267), (267, 269), (269, 270), (270, 409), (409, 291),
    (78, 95), (95, 88), (88, 178), (178, 87), (87, 14),
    (14, 317), (317, 402), (402, 318), (318, 324), (324, 308),
    (78, 191), (191, 80), (80, 81), (81, 82), (82, 13),
    (13, 312), (312, 311), (311, 310), (310, 415), (415, 308),
];

pub const LEFT_EYE: &[Connection] = &[
    (263, 249), (249, 390), (390, 373), (373, 374), (374, 380),
    (380, 381), (381, 382), (382, 362), (263, 466), (466, 388),
    (388, 387), (387, 386), (386, 385), (385, 384), (384, 398),
    (398, 362),
];

pub const LEFT_EYEBROW: &[Connection] = &[
    (276, 283), (283, 282), (282, 295), (295, 285), (300, 293),
    (293, 334), (334, 296), (296, 336),
];

pub const RIGHT_EYE: &[Connection] = &[
    (33, 7), (7, 163), (163, 144), (144, 145), (145, 153),
    (153, 154), (154, 155), (155, 133), (33, 246), (246, 161),
    (161, 160), (160, 159), (159, 158), (158, 157), (157, 173),
    (173, 133),
];

pub const RIGHT_EYEBROW: &[Connection] = &[
    (46, 53), (53, 52), (52, 65), (65, 55), (70, 63),
    (63, 105), (105, 66), (66, 107),
];

pub const FACE_OVAL: &[Connection] = &[
    (10, 338), (338, 297), (297, 332), (332, 284), (284, 251),
    (251, 389), (389, 356), (356, 454), (454, 323), (323, 361),
    (361, 288), (288, 397), (397, 365), (365, 379), (379, 378),
    (378, 400), (400, 377), (377, 152), (152, 148), (148, 176),
    (176, 149), (149, 150), (150, 136), (136, 172), (172, 58),
    (58, 132), (132, 93), (93, 234), (234, 127), (127, 162),
    (162, 21), (21, 54), (54, 103), (103, 67), (67, 109),
    (109, 10),
];

pub const LEFT_IRIS: &[Connection] = &[(474, 475), (475, 476), (476, 477), (477, 474)];

pub const RIGHT_IRIS: &[Connection] = &[(469, 470), (470, 471), (471, 472), (472, 469)];

const WHITE: Rgb<u8> = Rgb([224, 224, 224]);
const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
const GREEN: Rgb<u8> = Rgb([48, 255, 48]);
const RED: Rgb<u8> = Rgb([255, 48, 48]);

const THICKNESS_TESSELATION: u32 = 1;
const THICKNESS_CONTOURS: u32 = 2;

/// Style of the background mesh.
pub const TESSELATION_SPEC: DrawingSpec = DrawingSpec::new(GRAY, THICKNESS_TESSELATION);

/// A set of connections drawn with one style.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionGroup {
    pub name: &'static str,
    pub connections: &'static [Connection],
    pub spec: DrawingSpec,
}

/// Contour outlines, in draw order.
pub const CONTOUR_GROUPS: &[ConnectionGroup] = &[
    ConnectionGroup {
        name: "lips",
        connections: LIPS,
        spec: DrawingSpec::new(WHITE, THICKNESS_CONTOURS),
    },
    ConnectionGroup {
        name: "left_eye",
        connections: LEFT_EYE,
        spec: DrawingSpec::new(GREEN, THICKNESS_CONTOURS),
    },
    ConnectionGroup {
        name: "left_eyebrow",
        connections: LEFT_EYEBROW,
        spec: DrawingSpec::new(GREEN, THICKNESS_CONTOURS),
    },
    ConnectionGroup {
        name: "right_eye",
        connections: RIGHT_EYE,
        spec: DrawingSpec::new(RED, THICKNESS_CONTOURS),
    },
    ConnectionGroup {
        name: "right_eyebrow",
        connections: RIGHT_EYEBROW,
        spec: DrawingSpec::new(RED, THICKNESS_CONTOURS),
    },
    ConnectionGroup {
        name: "face_oval",
        connections: FACE_OVAL,
        spec: DrawingSpec::new(WHITE, THICKNESS_CONTOURS),
    },
];

/// Iris rings, in draw order.
pub const IRIS_GROUPS: &[ConnectionGroup] = &[
    ConnectionGroup {
        name: "left_iris",
        connections: LEFT_IRIS,
        spec: DrawingSpec::new(GREEN, THICKNESS_CONTOURS),
    },
    ConnectionGroup {
        name: "right_iris",
        connections: RIGHT_IRIS,
        spec: DrawingSpec::new(RED, THICKNESS_CONTOURS),
    },
];

/// Whether an undirected pair belongs to the contour or iris tables.
pub fn is_outline_connection(a: usize, b: usize) -> bool {
    CONTOUR_GROUPS
        .iter()
        .chain(IRIS_GROUPS.iter())
        .flat_map(|g| g.connections.iter())
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn normalized(groups: &[ConnectionGroup]) -> HashSet<(usize, usize)> {
        groups
            .iter()
            .flat_map(|g| g.connections.iter())
            .map(|&(a, b)| (a.min(b), a.max(b)))
            .collect()
    }

    #[test]
    fn test_table_sizes() {
        assert_eq!(LIPS.len(), 40);
        assert_eq!(LEFT_EYE.len(), 16);
        assert_eq!(RIGHT_EYE.len(), 16);
        assert_eq!(LEFT_EYEBROW.len(), 8);
        assert_eq!(RIGHT_EYEBROW.len(), 8);
        assert_eq!(FACE_OVAL.len(), 36);
    }

    #[test]
    fn test_contours_and_irises_are_disjoint() {
        let contours = normalized(CONTOUR_GROUPS);
        let irises = normalized(IRIS_GROUPS);
        assert!(contours.is_disjoint(&irises));
    }

    #[test]
    fn test_index_ranges() {
        for &(a, b) in CONTOUR_GROUPS.iter().flat_map(|g| g.connections.iter()) {
            assert!(a < MESH_LANDMARK_COUNT && b < MESH_LANDMARK_COUNT);
        }
        for &(a, b) in IRIS_GROUPS.iter().flat_map(|g| g.connections.iter()) {
            assert!(a >= MESH_LANDMARK_COUNT && b >= MESH_LANDMARK_COUNT);
            assert!(a < 478 && b < 478);
        }
    }

    #[test]
    fn test_face_oval_is_closed() {
        assert_eq!(FACE_OVAL.first().unwrap().0, FACE_OVAL.last().unwrap().1);
    }

    #[test]
    fn test_outline_lookup_is_undirected() {
        assert!(is_outline_connection(146, 61));
        assert!(is_outline_connection(474, 475));
        assert!(!is_outline_connection(1, 2));
    }
}
