#![no_main]

//! Fuzz target for the GIF decoder.
//!
//! Feeds arbitrary streams through the decoder under each bounds policy,
//! either as raw bytes or appended to a valid header so the block parser
//! and LZW decoder are reached quickly.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use transcode_gif::{BoundsPolicy, CommentPolicy, DecoderConfig, GifDecoder};

#[derive(Arbitrary, Debug)]
struct GifInput {
    data: Vec<u8>,
    mode: InputMode,
    clip: bool,
    keep_all_comments: bool,
}

#[derive(Arbitrary, Debug)]
enum InputMode {
    /// Decode the bytes as a complete stream
    Raw,
    /// Prefix a 16x16 header with a 4-entry global table
    WithHeader,
}

fuzz_target!(|input: GifInput| {
    // Limit input size
    if input.data.len() > 1024 * 1024 {
        return;
    }

    let data = match input.mode {
        InputMode::Raw => input.data,
        InputMode::WithHeader => {
            let mut data = b"GIF89a\x10\x00\x10\x00\x81\x00\x00".to_vec();
            data.extend_from_slice(&[0, 0, 0, 255, 255, 255, 255, 0, 0, 0, 255, 0]);
            data.extend_from_slice(&input.data);
            data
        }
    };

    let config = DecoderConfig::new()
        .out_of_bounds(if input.clip { BoundsPolicy::Clip } else { BoundsPolicy::Reject })
        .comment_policy(if input.keep_all_comments {
            CommentPolicy::All
        } else {
            CommentPolicy::FirstOnly
        })
        .max_canvas_pixels(Some(1 << 22));

    if let Ok(mut decoder) = GifDecoder::with_config(data.as_slice(), config) {
        let (width, height) = (decoder.screen().width, decoder.screen().height);
        while let Ok(Some(frame)) = decoder.next_frame() {
            assert_eq!(frame.pixels.len(), width as usize * height as usize);
            let _ = frame.to_rgba();
        }
        // Fused after the trailer or an error
        assert!(matches!(decoder.next_frame(), Ok(None)));
        let _ = decoder.info().comment();
    }
});
