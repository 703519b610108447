#![no_main]

use libfuzzer_sys::fuzz_target;

use domain::packet::builder::{BuildStatus, FeatureVectorBuilder, extract_features};
use domain::packet::entity::Chunk;

// Fuzz the chunk-level frame builder with arbitrary bytes and framing.
//
// Layout:
//   [0]    = chunk width selector, width = (b % 16 + 1) * 4
//   [1]    = selector (0=whole frame, 1=fuzzed framing flags)
//   rest   = frame bytes; in mode 1 every chunk steals one byte whose
//            low two bits become start/end-of-frame
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let width = ((data[0] as usize) % 16 + 1) * 4;
    let selector = data[1] % 2;
    let payload = &data[2..];

    match selector {
        // Sub-target 0: one well-framed frame through both entry points
        0 => {
            let whole = extract_features(payload, width);

            let Ok(mut builder) = FeatureVectorBuilder::new(width) else {
                return;
            };
            let mut streamed = None;
            for chunk in Chunk::segment(payload, width) {
                match builder.push(&chunk) {
                    BuildStatus::Complete(fv) => streamed = Some(Ok(fv)),
                    BuildStatus::Discard(err) => streamed = Some(Err(err)),
                    BuildStatus::Pending | BuildStatus::Skipped => {}
                }
            }
            if let Some(streamed) = streamed {
                assert_eq!(streamed.is_ok(), whole.is_ok());
            }
        }
        // Sub-target 1: arbitrary framing, including orphans and missing EOFs
        _ => {
            let Ok(mut builder) = FeatureVectorBuilder::new(width) else {
                return;
            };
            let mut cursor = 0;
            while cursor < payload.len() {
                let flags = payload[cursor];
                cursor += 1;
                let end = (cursor + width).min(payload.len());
                let chunk = Chunk::new(payload[cursor..end].to_vec(), flags & 1 != 0, flags & 2 != 0);
                cursor = end;

                let _ = builder.push(&chunk);
            }
            let _ = builder.abandoned_frames();
            builder.reset();
            assert!(!builder.in_frame());
        }
    }
});
