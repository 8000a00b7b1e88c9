//! Gate behavior observed through the public handle: reader overlap,
//! writer exclusion, disjoint grants, seek exclusion.

use std::fs;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::time::{Duration, Instant};

use zc_file::ZcFile;

fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("zc_file_conc_test_{}_{}", name, std::process::id()));
    p
}

fn filled_file(path: &PathBuf, len: usize) -> ZcFile {
    let _ = fs::remove_file(path);
    let file = ZcFile::open(path).expect("open");
    let mut view = file.write_start(len).expect("write_start");
    for (i, byte) in view.iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }
    view.commit().expect("commit");
    file.seek(SeekFrom::Start(0)).expect("rewind");
    file
}

#[test]
fn readers_run_concurrently() {
    let path = tmp_path("readers_run_concurrently");
    let file = filled_file(&path, 64);
    let barrier = Barrier::new(2);

    // Both threads must hold a read view at the same time to pass the
    // barrier; serialized readers would deadlock here.
    std::thread::scope(|s| {
        for _ in 0..2 {
            s.spawn(|| {
                let view = file.read_start(16);
                assert_eq!(view.len(), 16);
                barrier.wait();
                drop(view);
            });
        }
    });

    file.close().expect("close");
    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn writer_waits_for_active_readers() {
    let path = tmp_path("writer_waits_for_active_readers");
    let file = filled_file(&path, 64);
    let barrier = Barrier::new(2);
    let released = AtomicBool::new(false);
    const HOLD: Duration = Duration::from_millis(100);

    std::thread::scope(|s| {
        s.spawn(|| {
            let view = file.read_start(8);
            barrier.wait();
            std::thread::sleep(HOLD);
            released.store(true, Ordering::SeqCst);
            drop(view);
        });
        s.spawn(|| {
            barrier.wait();
            let start = Instant::now();
            let view = file.write_start(8).expect("write_start");
            assert!(
                released.load(Ordering::SeqCst),
                "writer was admitted while a reader held the gate"
            );
            assert!(
                start.elapsed() >= HOLD - Duration::from_millis(10),
                "writer did not actually wait for the reader"
            );
            drop(view);
        });
    });

    file.close().expect("close");
    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn seek_waits_for_active_readers() {
    let path = tmp_path("seek_waits_for_active_readers");
    let file = filled_file(&path, 64);
    let barrier = Barrier::new(2);
    let released = AtomicBool::new(false);

    std::thread::scope(|s| {
        s.spawn(|| {
            let view = file.read_start(8);
            barrier.wait();
            std::thread::sleep(Duration::from_millis(100));
            released.store(true, Ordering::SeqCst);
            drop(view);
        });
        s.spawn(|| {
            barrier.wait();
            file.seek(SeekFrom::Start(0)).expect("seek");
            assert!(
                released.load(Ordering::SeqCst),
                "seek was admitted while a reader held the gate"
            );
        });
    });

    file.close().expect("close");
    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn racing_readers_get_disjoint_slices() {
    const LEN: usize = 1000;
    const CHUNK: usize = 7;

    let path = tmp_path("racing_readers_get_disjoint_slices");
    let file = filled_file(&path, LEN);

    // Each thread drains grants until end-of-file, recording what it was
    // given. The cursor advances at grant time, so the union of all
    // grants must tile [0, LEN) exactly, with the right bytes in each.
    let mut grants: Vec<(u64, usize)> = Vec::new();
    std::thread::scope(|s| {
        let mut handles = Vec::new();
        for _ in 0..4 {
            handles.push(s.spawn(|| {
                let mut seen = Vec::new();
                loop {
                    let view = file.read_start(CHUNK);
                    if view.is_empty() {
                        break;
                    }
                    for (i, &byte) in view.iter().enumerate() {
                        let pos = view.offset() as usize + i;
                        assert_eq!(byte, (pos % 251) as u8, "wrong byte at {pos}");
                    }
                    seen.push((view.offset(), view.len()));
                }
                seen
            }));
        }
        for handle in handles {
            grants.extend(handle.join().expect("reader thread"));
        }
    });

    grants.sort_unstable();
    let mut expected = 0u64;
    for (offset, len) in grants {
        assert_eq!(offset, expected, "grants overlap or leave a hole");
        expected += len as u64;
    }
    assert_eq!(expected, LEN as u64);

    file.close().expect("close");
    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn reader_waits_for_active_writer() {
    let path = tmp_path("reader_waits_for_active_writer");
    let file = filled_file(&path, 64);
    let barrier = Barrier::new(2);
    let released = AtomicBool::new(false);

    std::thread::scope(|s| {
        s.spawn(|| {
            let view = file.write_start(8).expect("write_start");
            barrier.wait();
            std::thread::sleep(Duration::from_millis(100));
            released.store(true, Ordering::SeqCst);
            drop(view);
        });
        s.spawn(|| {
            barrier.wait();
            let view = file.read_start(8);
            assert!(
                released.load(Ordering::SeqCst),
                "reader was admitted while a writer held the gate"
            );
            drop(view);
        });
    });

    file.close().expect("close");
    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn concurrent_growth_keeps_earlier_bytes() {
    let path = tmp_path("concurrent_growth_keeps_earlier_bytes");
    let _ = fs::remove_file(&path);
    let file = ZcFile::open(&path).expect("open");

    // Writers from several threads append in whatever order the gate
    // admits them; every grant is disjoint and the file grows to the sum.
    std::thread::scope(|s| {
        let file = &file;
        for worker in 0..4u8 {
            s.spawn(move || {
                for _ in 0..8 {
                    let mut view = file.write_start(16).expect("write_start");
                    view.fill(worker + 1);
                    view.commit().expect("commit");
                }
            });
        }
    });

    assert_eq!(file.len(), 4 * 8 * 16);
    file.seek(SeekFrom::Start(0)).expect("rewind");
    loop {
        let view = file.read_start(16);
        if view.is_empty() {
            break;
        }
        assert_eq!(view.len(), 16);
        let tag = view[0];
        assert!((1..=4).contains(&tag));
        assert!(view.iter().all(|&b| b == tag), "torn write grant");
    }

    file.close().expect("close");
    fs::remove_file(&path).expect("cleanup");
}
