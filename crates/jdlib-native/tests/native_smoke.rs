//! Runs against a real Jdlib build. Ignored by default; run with
//!
//! ```text
//! JDLIB_TEST_LIBRARY=/path/to/libJdlib.so \
//! JDLIB_TEST_LANDMARK_MODEL=/path/to/shape_predictor_68_face_landmarks.dat \
//! JDLIB_TEST_FACE_IMAGE=/path/to/one_face.jpg \
//! cargo test -p jdlib-native -- --ignored
//! ```

use image::{DynamicImage, RgbImage};
use jdlib_native::{wrap, NativeLibrary};

fn env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| panic!("{key} must be set for native smoke tests"))
}

#[test]
#[ignore]
fn test_blank_image_has_no_faces() {
    let library = NativeLibrary::open(env("JDLIB_TEST_LIBRARY")).unwrap();
    let mut jdlib = wrap(library, &env("JDLIB_TEST_LANDMARK_MODEL"), None);

    let blank = DynamicImage::ImageRgb8(RgbImage::new(320, 240));
    assert!(jdlib.detect_faces(&blank).unwrap().is_empty());
    assert!(jdlib.landmarks_per_face(&blank).unwrap().is_empty());
}

#[test]
#[ignore]
fn test_single_face_image() {
    let library = NativeLibrary::open(env("JDLIB_TEST_LIBRARY")).unwrap();
    let mut jdlib = wrap(library, &env("JDLIB_TEST_LANDMARK_MODEL"), None);

    let img = image::open(env("JDLIB_TEST_FACE_IMAGE")).unwrap();
    let rects = jdlib.detect_faces(&img).unwrap();
    assert_eq!(rects.len(), 1);
    assert!(rects[0].is_within(img.width(), img.height()));

    let faces = jdlib.landmarks_per_face(&img).unwrap();
    assert_eq!(faces.len(), 1);
    assert!(!faces[0].landmarks.is_empty());
}
