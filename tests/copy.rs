//! Whole-file copy fidelity tests.

use std::fs;

use tempfile::tempdir;
use zc_file::{copy_whole_file, utils::page_size, ZcFileError};

#[test]
fn copies_an_empty_file() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("empty_src");
    let dst = dir.path().join("empty_dst");
    fs::write(&src, b"").expect("write src");

    let copied = copy_whole_file(&src, &dst).expect("copy");
    assert_eq!(copied, 0);
    assert_eq!(fs::read(&dst).expect("read dst"), b"");
}

#[test]
fn copies_a_small_file() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("small_src");
    let dst = dir.path().join("small_dst");
    fs::write(&src, b"a small payload").expect("write src");

    let copied = copy_whole_file(&src, &dst).expect("copy");
    assert_eq!(copied, 15);
    assert_eq!(
        fs::read(&dst).expect("read dst"),
        fs::read(&src).expect("read src")
    );
}

#[test]
fn copies_a_multi_page_file() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("pages_src");
    let dst = dir.path().join("pages_dst");

    let len = 2 * page_size() + 37;
    let payload: Vec<u8> = (0..len).map(|i| (i % 241) as u8).collect();
    fs::write(&src, &payload).expect("write src");

    let copied = copy_whole_file(&src, &dst).expect("copy");
    assert_eq!(copied, len as u64);
    assert_eq!(fs::read(&dst).expect("read dst"), payload);
}

#[test]
fn destination_is_sized_down_to_the_source() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("short_src");
    let dst = dir.path().join("long_dst");
    fs::write(&src, b"short").expect("write src");
    fs::write(&dst, vec![0xFF; 4096]).expect("write dst");

    copy_whole_file(&src, &dst).expect("copy");
    assert_eq!(fs::read(&dst).expect("read dst"), b"short");
}

#[test]
fn missing_source_is_reported() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("does_not_exist");
    let dst = dir.path().join("dst");

    let err = copy_whole_file(&src, &dst).expect_err("must fail");
    assert!(matches!(
        err,
        ZcFileError::Copy { step: "open source", .. }
    ));
    assert!(!dst.exists(), "failed copy created the destination");
}

#[cfg(feature = "async")]
mod aio {
    use super::*;
    use zc_file::copy::aio;

    #[tokio::test]
    async fn async_copy_matches_sync_copy() {
        let dir = tempdir().expect("tempdir");
        let src = dir.path().join("aio_src");
        let dst = dir.path().join("aio_dst");
        fs::write(&src, b"async payload").expect("write src");

        let copied = aio::copy_whole_file(&src, &dst).await.expect("copy");
        assert_eq!(copied, 13);
        assert_eq!(fs::read(&dst).expect("read dst"), b"async payload");
    }
}
