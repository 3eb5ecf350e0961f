//! C ABI of the native library and decoding of its output lists.
//!
//! Every output list is allocated by the library and must be returned to it
//! through the matching `*_free` entry point after decoding.

use jdlib_core::{Embedding, FaceDescriptor, Point, Rect};
use libc::c_char;

pub const SYM_DETECTOR_CREATE: &[u8] = b"jdlib_face_detector_create\0";
pub const SYM_SHAPE_PREDICTOR_CREATE: &[u8] = b"jdlib_shape_predictor_create\0";
pub const SYM_EMBEDDING_CREATE: &[u8] = b"jdlib_face_embedding_create\0";
pub const SYM_HANDLE_RELEASE: &[u8] = b"jdlib_handle_release\0";
pub const SYM_FACE_DETECT: &[u8] = b"jdlib_face_detect\0";
pub const SYM_FACIAL_LANDMARKS: &[u8] = b"jdlib_facial_landmarks\0";
pub const SYM_FACIAL_LANDMARKS_WHOLE_IMAGE: &[u8] = b"jdlib_facial_landmarks_whole_image\0";
pub const SYM_FACE_EMBEDDINGS: &[u8] = b"jdlib_face_embeddings\0";
pub const SYM_RECT_LIST_FREE: &[u8] = b"jdlib_rect_list_free\0";
pub const SYM_FACE_LIST_FREE: &[u8] = b"jdlib_face_list_free\0";

/// Mirror of `jdlib_rect`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RawRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Mirror of `jdlib_point`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPoint {
    pub x: i32,
    pub y: i32,
}

/// Mirror of `jdlib_rect_list`.
#[repr(C)]
#[derive(Debug)]
pub struct RawRectList {
    pub items: *const RawRect,
    pub len: usize,
}

/// Mirror of `jdlib_face`. `points` / `embedding` may be null when the
/// query does not produce them.
#[repr(C)]
#[derive(Debug)]
pub struct RawFace {
    pub rect: RawRect,
    pub points: *const RawPoint,
    pub num_points: usize,
    pub embedding: *const f32,
    pub embedding_len: usize,
}

/// Mirror of `jdlib_face_list`.
#[repr(C)]
#[derive(Debug)]
pub struct RawFaceList {
    pub items: *const RawFace,
    pub len: usize,
}

pub type DetectorCreateFn = unsafe extern "C" fn() -> i64;
pub type ModelCreateFn = unsafe extern "C" fn(model_path: *const c_char) -> i64;
pub type HandleReleaseFn = unsafe extern "C" fn(handle: i64);
pub type FaceDetectFn =
    unsafe extern "C" fn(detector: i64, pixels: *const u8, h: i32, w: i32) -> *mut RawRectList;
pub type LandmarksFn = unsafe extern "C" fn(
    shape_predictor: i64,
    detector: i64,
    pixels: *const u8,
    h: i32,
    w: i32,
) -> *mut RawFaceList;
pub type EmbeddingsFn = unsafe extern "C" fn(
    embedder: i64,
    shape_predictor: i64,
    detector: i64,
    pixels: *const u8,
    h: i32,
    w: i32,
) -> *mut RawFaceList;
pub type RectListFreeFn = unsafe extern "C" fn(list: *mut RawRectList);
pub type FaceListFreeFn = unsafe extern "C" fn(list: *mut RawFaceList);

impl From<RawRect> for Rect {
    fn from(r: RawRect) -> Self {
        Rect::new(r.x, r.y, r.width, r.height)
    }
}

impl From<RawPoint> for Point {
    fn from(p: RawPoint) -> Self {
        Point::new(p.x, p.y)
    }
}

/// View `len` items at `ptr`, treating a null pointer as empty.
///
/// # Safety
///
/// If non-null, `ptr` must point to `len` initialized `T`s that stay alive
/// and unmodified for `'a`.
unsafe fn raw_slice<'a, T>(ptr: *const T, len: usize, what: &str) -> &'a [T] {
    if ptr.is_null() {
        if len != 0 {
            tracing::warn!(what, len, "native list has null items with non-zero length");
        }
        return &[];
    }
    // SAFETY: non-null and sized per the caller's contract.
    unsafe { std::slice::from_raw_parts(ptr, len) }
}

/// Copy a native rectangle list into owned values. `None` for a null list.
///
/// # Safety
///
/// `list` must be null or point to a valid `jdlib_rect_list` whose items
/// outlive this call.
pub unsafe fn decode_rect_list(list: *const RawRectList) -> Option<Vec<Rect>> {
    // SAFETY: caller guarantees `list` is null or valid.
    let list = unsafe { list.as_ref() }?;
    // SAFETY: items/len come from a valid list.
    let items = unsafe { raw_slice(list.items, list.len, "rects") };
    Some(items.iter().copied().map(Rect::from).collect())
}

/// Copy a native face list into owned descriptors. `None` for a null list.
///
/// # Safety
///
/// `list` must be null or point to a valid `jdlib_face_list`; every face's
/// `points` and `embedding` must be null or valid for their stated lengths.
pub unsafe fn decode_face_list(list: *const RawFaceList) -> Option<Vec<FaceDescriptor>> {
    // SAFETY: caller guarantees `list` is null or valid.
    let list = unsafe { list.as_ref() }?;
    // SAFETY: items/len come from a valid list.
    let faces = unsafe { raw_slice(list.items, list.len, "faces") };
    Some(
        faces
            .iter()
            // SAFETY: each face comes from the valid list and carries its contract.
            .map(|face| unsafe { decode_face(face) })
            .collect(),
    )
}

/// # Safety
///
/// See [`decode_face_list`].
unsafe fn decode_face(face: &RawFace) -> FaceDescriptor {
    // SAFETY: forwarded from decode_face_list's contract.
    let points = unsafe { raw_slice(face.points, face.num_points, "landmarks") };
    let embedding = if face.embedding.is_null() {
        None
    } else {
        // SAFETY: non-null embedding is valid for embedding_len floats.
        let values = unsafe { raw_slice(face.embedding, face.embedding_len, "embedding") };
        Some(Embedding::new(values.to_vec()))
    };

    FaceDescriptor {
        rect: face.rect.into(),
        landmarks: points.iter().copied().map(Point::from).collect(),
        embedding,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    fn raw_rect(x: i32, y: i32, w: i32, h: i32) -> RawRect {
        RawRect { x, y, width: w, height: h }
    }

    #[test]
    fn test_decode_null_rect_list() {
        assert_eq!(unsafe { decode_rect_list(ptr::null()) }, None);
    }

    #[test]
    fn test_decode_empty_rect_list() {
        let list = RawRectList { items: ptr::null(), len: 0 };
        assert_eq!(unsafe { decode_rect_list(&list) }, Some(vec![]));
    }

    #[test]
    fn test_decode_null_items_with_length() {
        let list = RawRectList { items: ptr::null(), len: 3 };
        assert_eq!(unsafe { decode_rect_list(&list) }, Some(vec![]));
    }

    #[test]
    fn test_decode_rects() {
        let rects = [raw_rect(1, 2, 3, 4), raw_rect(10, 20, 30, 40)];
        let list = RawRectList { items: rects.as_ptr(), len: rects.len() };
        let decoded = unsafe { decode_rect_list(&list) }.unwrap();
        assert_eq!(decoded, vec![Rect::new(1, 2, 3, 4), Rect::new(10, 20, 30, 40)]);
    }

    #[test]
    fn test_decode_null_face_list() {
        assert_eq!(unsafe { decode_face_list(ptr::null()) }, None);
    }

    #[test]
    fn test_decode_face_with_landmarks_only() {
        let points = [RawPoint { x: 5, y: 6 }, RawPoint { x: 7, y: 8 }];
        let faces = [RawFace {
            rect: raw_rect(0, 0, 50, 60),
            points: points.as_ptr(),
            num_points: points.len(),
            embedding: ptr::null(),
            embedding_len: 0,
        }];
        let list = RawFaceList { items: faces.as_ptr(), len: faces.len() };

        let decoded = unsafe { decode_face_list(&list) }.unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].rect, Rect::new(0, 0, 50, 60));
        assert_eq!(decoded[0].landmarks, vec![Point::new(5, 6), Point::new(7, 8)]);
        assert_eq!(decoded[0].embedding, None);
    }

    #[test]
    fn test_decode_face_with_embedding() {
        let values: Vec<f32> = (0..128).map(|i| i as f32 / 128.0).collect();
        let faces = [
            RawFace {
                rect: raw_rect(1, 1, 10, 10),
                points: ptr::null(),
                num_points: 0,
                embedding: values.as_ptr(),
                embedding_len: values.len(),
            },
            RawFace {
                rect: raw_rect(20, 20, 10, 10),
                points: ptr::null(),
                num_points: 0,
                embedding: values.as_ptr(),
                embedding_len: 4,
            },
        ];
        let list = RawFaceList { items: faces.as_ptr(), len: faces.len() };

        let decoded = unsafe { decode_face_list(&list) }.unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].landmarks.is_empty());
        assert_eq!(decoded[0].embedding.as_ref().unwrap().values, values);
        assert_eq!(decoded[1].embedding.as_ref().unwrap().len(), 4);
        assert_eq!(decoded[1].rect.x, 20);
    }

    #[test]
    fn test_struct_layouts() {
        assert_eq!(std::mem::size_of::<RawRect>(), 16);
        assert_eq!(std::mem::size_of::<RawPoint>(), 8);
        assert_eq!(
            std::mem::size_of::<RawRectList>(),
            2 * std::mem::size_of::<usize>()
        );
    }
}
