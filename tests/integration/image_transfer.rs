//! Key image transfer through a mock-backed session.

use std::collections::BTreeSet;
use std::io;

use hiddeck::device::VariantDescriptor;
use hiddeck::error::DeckError;
use hiddeck::image_ops::{encode_jpeg, fit_to_key, solid};
use image::{DynamicImage, Rgb, RgbImage};

use crate::common::mock_session;

#[test]
fn original_key_image_goes_out_as_two_pages() {
    let (session, mock) = mock_session(VariantDescriptor::ORIGINAL);

    session.set_image(0, &solid(72, Rgb([255, 0, 0]))).unwrap();

    let writes = mock.writes();
    assert_eq!(writes.len(), 2);
    for (i, report) in writes.iter().enumerate() {
        assert_eq!(report.len(), 7819);
        assert_eq!(report[2], i as u8 + 1, "one-based page number");
        assert_eq!(report[4], u8::from(i == 1), "last-page flag");
        // Logical key 0 sits at device key 4 on the mirrored layout.
        assert_eq!(report[5], 5);
    }
    assert_eq!(&writes[0][16..18], b"BM");
}

#[test]
fn fill_color_sends_bgr_pixels() {
    let (session, mock) = mock_session(VariantDescriptor::ORIGINAL);

    session.fill_color(7, Rgb([10, 20, 30])).unwrap();

    let first = &mock.writes()[0];
    let pixels = &first[16 + 54..16 + 60];
    assert_eq!(pixels, &[30, 20, 10, 30, 20, 10]);
}

#[test]
fn oversized_file_is_resized_and_paged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("icon.png");
    RgbImage::from_pixel(144, 144, Rgb([0, 128, 255])).save(&path).unwrap();

    let variant = VariantDescriptor::MINI;
    let (session, mock) = mock_session(variant.clone());
    session.set_image_from_file(2, &path).unwrap();

    let px = variant.pixels as usize;
    let expected_pages = (px * px * 3 + 54).div_ceil(variant.image_page_payload());
    let writes = mock.writes();
    assert_eq!(writes.len(), expected_pages);
    assert_eq!(writes[0][2], 0, "zero-based page number");
    assert_eq!(writes[expected_pages - 1][2] as usize, expected_pages - 1);
    assert_eq!(writes[expected_pages - 1][4], 1);
    assert!(writes[..expected_pages - 1].iter().all(|r| r[4] == 0));
}

#[test]
fn clear_covers_one_index_past_the_grid() {
    let variant = VariantDescriptor::XL;
    let (session, mock) = mock_session(variant.clone());

    session.clear().unwrap();

    let last_pages: Vec<_> = mock.writes().into_iter().filter(|r| r[3] == 1).collect();
    assert_eq!(last_pages.len(), usize::from(variant.grid_keys()) + 1);
    let keys: BTreeSet<u8> = last_pages.iter().map(|r| r[2]).collect();
    assert_eq!(keys, (0..=32).collect());
}

#[test]
fn concurrent_transfers_never_interleave() {
    let (session, mock) = mock_session(VariantDescriptor::ORIGINAL);
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(72, 72, Rgb([9, 9, 9])));

    std::thread::scope(|s| {
        for key in 0..4u8 {
            let session = &session;
            let img = &img;
            s.spawn(move || session.set_image(key, img).unwrap());
        }
    });

    let writes = mock.writes();
    assert_eq!(writes.len(), 8);
    for pair in writes.chunks(2) {
        assert_eq!(pair[0][2], 1);
        assert_eq!(pair[1][2], 2);
        assert_eq!(pair[0][5], pair[1][5], "pages of one image stay together");
    }
    let keys: BTreeSet<u8> = writes.iter().map(|r| r[5]).collect();
    assert_eq!(keys.len(), 4);
}

#[test]
fn missing_file_puts_nothing_on_the_wire() {
    let (session, mock) = mock_session(VariantDescriptor::XL);

    let err = session
        .set_image_from_file(0, std::path::Path::new("/nonexistent/icon.png"))
        .unwrap_err();

    assert!(matches!(err, DeckError::ImageNotFound { .. }));
    mock.assert_no_operations();
}

#[test]
fn write_failure_mid_transfer_is_reported() {
    let (session, mock) = mock_session(VariantDescriptor::ORIGINAL);
    mock.fail_writes_after(1);

    let err = session.fill_color(0, Rgb([1, 2, 3])).unwrap_err();

    assert!(matches!(err, DeckError::Io { op: "write", .. }), "{err:?}");
    assert_eq!(mock.writes().len(), 1);
}

#[test]
fn injected_error_kind_is_preserved() {
    let (session, mock) = mock_session(VariantDescriptor::XL);
    mock.inject_write_error(io::ErrorKind::TimedOut);

    match session.fill_color(0, Rgb([0, 0, 0])).unwrap_err() {
        DeckError::Io { source, .. } => assert_eq!(source.kind(), io::ErrorKind::TimedOut),
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn closed_session_rejects_transfers() {
    let (session, mock) = mock_session(VariantDescriptor::NEO);
    session.close();

    let err = session.fill_color(0, Rgb([0, 0, 0])).unwrap_err();

    assert!(matches!(err, DeckError::NotOpen { .. }));
    mock.assert_no_operations();
}

#[test]
fn reassembled_jpeg_pages_match_the_encoder_output() {
    let variant = VariantDescriptor::XL;
    let (session, mock) = mock_session(variant.clone());
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(120, 90, |x, y| {
        Rgb([(x * 2) as u8, (y * 2) as u8, ((x ^ y) & 0xff) as u8])
    }));

    session.set_image(5, &img).unwrap();

    let mut payload = Vec::new();
    let writes = mock.writes();
    for (page, report) in writes.iter().enumerate() {
        assert_eq!(report.len(), variant.image_report_size);
        assert_eq!(report[2], 5);
        assert_eq!(usize::from(u16::from_le_bytes([report[6], report[7]])), page);
        assert_eq!(report[3], u8::from(page == writes.len() - 1));
        let len = usize::from(u16::from_le_bytes([report[4], report[5]]));
        payload.extend_from_slice(&report[8..8 + len]);
    }

    let expected = encode_jpeg(&variant.orient(&fit_to_key(&img, variant.pixels))).unwrap();
    assert!(writes.len() > 1, "gradient should span several pages");
    assert_eq!(payload, expected);
    assert_eq!(&payload[..2], &[0xff, 0xd8]);
}

#[test]
fn keys_past_the_grid_do_not_overflow() {
    let (session, mock) = mock_session(VariantDescriptor::ORIGINAL);

    session.fill_color(255, Rgb([0, 0, 0])).unwrap();

    let writes = mock.writes();
    assert_eq!(writes.len(), 2);
    // 255 mirrors to device key 3 after wrapping; the header is one-based.
    assert!(writes.iter().all(|r| r[5] == 4));
}
