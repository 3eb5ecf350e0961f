use serde::{Deserialize, Serialize};

/// Euclidean distance under which two dlib face descriptors are considered
/// the same person.
pub const DEFAULT_MATCH_DISTANCE: f32 = 0.6;

/// Axis-aligned face bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width.max(0)) * i64::from(self.height.max(0))
    }

    /// True if the box lies entirely inside a `width` × `height` image.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width >= 0
            && self.height >= 0
            && i64::from(self.right()) <= i64::from(width)
            && i64::from(self.bottom()) <= i64::from(height)
    }
}

/// A single facial landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Face embedding vector (128-dimensional for the dlib ResNet model).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Both non-empty and of the same dimensionality.
    pub fn is_comparable(&self, other: &Embedding) -> bool {
        !self.is_empty() && self.len() == other.len()
    }

    /// Compute Euclidean distance between two embeddings.
    ///
    /// Only meaningful when [`is_comparable`](Self::is_comparable) holds.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Same-person test: distance strictly below `max_distance`.
    ///
    /// Embeddings of different dimensionality never match.
    pub fn matches(&self, other: &Embedding, max_distance: f32) -> bool {
        self.is_comparable(other) && self.euclidean_distance(other) < max_distance
    }
}

/// One detected face: its box plus whatever the native query produced for it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceDescriptor {
    pub rect: Rect,
    /// Landmarks in model order (68 points for the standard dlib predictor).
    pub landmarks: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Embedding>,
}

impl FaceDescriptor {
    pub fn new(rect: Rect) -> Self {
        Self { rect, landmarks: Vec::new(), embedding: None }
    }

    /// Euclidean distance between the two embeddings.
    ///
    /// `None` if either face lacks an embedding or the two are not
    /// comparable (empty, or of different dimensionality).
    pub fn distance_to(&self, other: &FaceDescriptor) -> Option<f32> {
        match (&self.embedding, &other.embedding) {
            (Some(a), Some(b)) if a.is_comparable(b) => Some(a.euclidean_distance(b)),
            _ => None,
        }
    }

    /// Same-person test on the embeddings. False whenever
    /// [`distance_to`](Self::distance_to) is `None`.
    pub fn matches(&self, other: &FaceDescriptor, max_distance: f32) -> bool {
        match (&self.embedding, &other.embedding) {
            (Some(a), Some(b)) => a.matches(b, max_distance),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10, 20, 30, 40);
        assert_eq!(r.right(), 40);
        assert_eq!(r.bottom(), 60);
        assert_eq!(r.area(), 1200);
    }

    #[test]
    fn test_rect_within_bounds() {
        assert!(Rect::new(0, 0, 100, 100).is_within(100, 100));
        assert!(Rect::new(10, 10, 20, 20).is_within(100, 100));
        assert!(!Rect::new(90, 0, 20, 20).is_within(100, 100));
        assert!(!Rect::new(-1, 0, 20, 20).is_within(100, 100));
        assert!(!Rect::new(0, 0, -5, 20).is_within(100, 100));
    }

    #[test]
    fn test_rect_area_negative_size() {
        assert_eq!(Rect::new(0, 0, -4, 10).area(), 0);
    }

    #[test]
    fn test_euclidean_distance() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_matches_threshold() {
        let a = Embedding::new(vec![0.1, 0.2, 0.3]);
        let b = Embedding::new(vec![0.1, 0.2, 0.5]);
        assert!(a.matches(&b, DEFAULT_MATCH_DISTANCE));
        assert!(!a.matches(&b, 0.1));
    }

    #[test]
    fn test_matches_dimension_mismatch() {
        let a = Embedding::new(vec![0.1, 0.2]);
        let b = Embedding::new(vec![0.1, 0.2, 0.0]);
        assert!(!a.matches(&b, DEFAULT_MATCH_DISTANCE));
        assert!(!Embedding::default().matches(&Embedding::default(), 1.0));
    }

    #[test]
    fn test_descriptor_distance_requires_embeddings() {
        let mut a = FaceDescriptor::new(Rect::default());
        let b = FaceDescriptor::new(Rect::default());
        assert_eq!(a.distance_to(&b), None);

        a.embedding = Some(Embedding::new(vec![1.0]));
        let mut c = b.clone();
        c.embedding = Some(Embedding::new(vec![0.0]));
        assert_eq!(a.distance_to(&c), Some(1.0));
        assert!(!a.matches(&b, DEFAULT_MATCH_DISTANCE));
    }

    #[test]
    fn test_descriptor_distance_rejects_mismatched_dimensions() {
        let mut a = FaceDescriptor::new(Rect::default());
        let mut b = FaceDescriptor::new(Rect::default());
        a.embedding = Some(Embedding::new(vec![0.1, 0.2]));
        b.embedding = Some(Embedding::new(vec![0.1, 0.2, 9.0]));
        assert_eq!(a.distance_to(&b), None);
        assert!(!a.matches(&b, DEFAULT_MATCH_DISTANCE));
    }

    #[test]
    fn test_descriptor_distance_rejects_empty_embeddings() {
        let mut a = FaceDescriptor::new(Rect::default());
        a.embedding = Some(Embedding::default());
        let b = a.clone();
        assert_eq!(a.distance_to(&b), None);
        assert!(!a.matches(&b, f32::MAX));
    }

    #[test]
    fn test_descriptor_json_omits_missing_embedding() {
        let mut face = FaceDescriptor::new(Rect::new(1, 2, 3, 4));
        face.landmarks.push(Point::new(5, 6));
        let json = serde_json::to_value(&face).unwrap();
        assert!(json.get("embedding").is_none());
        assert_eq!(json["landmarks"][0]["x"], 5);
        assert_eq!(json["rect"]["height"], 4);
    }
}
