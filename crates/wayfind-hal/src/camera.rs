//! Camera frames and the marker decode primitive.

/// A raw image frame delivered by the AR camera.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw pixel data (e.g. RGBA32 or greyscale).
    pub data: Vec<u8>,
}

/// Turns a camera frame into the identity string encoded in a visible
/// marker, if any.
///
/// The payload encoding is the decoder's business; the core only sees the
/// decoded text.
pub trait MarkerDecoder: Send {
    /// Decode the marker visible in `frame`, returning its raw payload.
    fn decode(&mut self, frame: &CameraFrame) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysLibrary;

    impl MarkerDecoder for AlwaysLibrary {
        fn decode(&mut self, frame: &CameraFrame) -> Option<String> {
            (!frame.data.is_empty()).then(|| "Library".to_string())
        }
    }

    #[test]
    fn decoder_sees_frame_contents() {
        let mut decoder = AlwaysLibrary;
        let empty = CameraFrame {
            width: 0,
            height: 0,
            data: Vec::new(),
        };
        let full = CameraFrame {
            width: 2,
            height: 2,
            data: vec![0u8; 16],
        };
        assert_eq!(decoder.decode(&empty), None);
        assert_eq!(decoder.decode(&full).as_deref(), Some("Library"));
    }
}
