#![no_main]

use libfuzzer_sys::fuzz_target;
use parted::{Event, Multipart};

fuzz_target!(|data: &[u8]| {
    let dir = std::env::temp_dir().join("parted-fuzz");
    let _ = std::fs::create_dir_all(&dir);

    // The first byte picks the chunk size so splits land everywhere.
    let (chunk_size, body) = match data.split_first() {
        Some((first, rest)) => (*first as usize + 1, rest),
        None => (1, data),
    };

    let mut multipart = Multipart::new("X-BOUNDARY")
        .expect("valid boundary")
        .storage(parted::DiskStorage::new(&dir));

    for chunk in body.chunks(chunk_size) {
        if !multipart.write(chunk) {
            break;
        }
    }
    multipart.end(None);

    let mut terminal = 0;
    while let Some(event) = multipart.next_event() {
        match event {
            Event::Part(part) => {
                if let Some(path) = part.path() {
                    let _ = std::fs::remove_file(path);
                }
            }
            Event::Error(_) | Event::End => terminal += 1,
            Event::Header { .. } => {}
        }
    }
    assert!(terminal <= 1);
});
