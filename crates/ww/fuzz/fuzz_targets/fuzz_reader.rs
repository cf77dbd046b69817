#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use ww::PlayMode;
use ww::de::Reader;

fuzz_target!(|data: &[u8]| {
    if let Ok(reader) = Reader::new(Cursor::new(data), PlayMode::Hold) {
        let mut reader = reader.with_chunk_frames(3);
        for _ in 0..reader.frame_count().min(64) + 1 {
            let frame = reader.next_frame();
            assert_eq!(frame.len(), reader.frame_size());
        }
    }
});
