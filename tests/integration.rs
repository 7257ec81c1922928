//! Integration tests for fdelta.

use std::io::Cursor;

use fdelta::{
    DeltaError, DeltaOp, DeltaReader, SeekOrigin, analyze, apply, apply_stream, checksum, create,
    encode_int, output_size,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn roundtrip(origin: &[u8], target: &[u8]) -> Vec<u8> {
    let delta = create(origin, target);
    let recovered = apply(origin, &delta).unwrap();
    assert_eq!(recovered, target);
    delta
}

fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.random()).collect()
}

#[test]
fn test_basic_create_apply() {
    roundtrip(b"Hello, World!", b"Hello, Rust!");
}

#[test]
fn test_identical_data() {
    let data = b"Identical data on both sides";
    let delta = roundtrip(data, data);

    let ops: Vec<_> = DeltaReader::new(&delta).unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(
        ops,
        vec![
            DeltaOp::Copy {
                len: data.len(),
                offset: 0
            },
            DeltaOp::Checksum(checksum(data)),
        ]
    );
}

#[test]
fn test_completely_different() {
    roundtrip(
        b"AAAAAAAAAAAAAAAAAAAAAAAAAAAA",
        b"BBBBBBBBBBBBBBBBBBBBBBBBBBBB",
    );
}

#[test]
fn test_empty_target() {
    let delta = roundtrip(b"Some origin data here", b"");
    assert_eq!(delta, b"0\n0;");
}

#[test]
fn test_empty_origin() {
    roundtrip(b"", b"Some new data here");
}

#[test]
fn test_both_empty() {
    let delta = roundtrip(b"", b"");
    assert_eq!(delta, b"0\n0;");
}

#[test]
fn test_single_substitution_layout() {
    let delta = roundtrip(b"abcdefgh", b"abcXefgh");

    let mut expected = b"8\n3@0,1:X4@4,".to_vec();
    expected.extend_from_slice(&encode_int(u64::from(checksum(b"abcXefgh"))));
    expected.push(b';');
    assert_eq!(delta, expected);
}

#[test]
fn test_large_data() {
    let mut origin = vec![0u8; 100_000];
    let mut target = vec![0u8; 100_000];

    for i in 0..origin.len() {
        origin[i] = (i % 256) as u8;
        target[i] = (i % 256) as u8;
    }

    for i in (0..target.len()).step_by(488) {
        target[i] = target[i].wrapping_add(1);
    }

    let delta = roundtrip(&origin, &target);
    assert!(delta.len() < target.len());

    println!("Target size: {} bytes", target.len());
    println!("Delta size: {} bytes", delta.len());
    println!(
        "Compression ratio: {:.2}x",
        target.len() as f64 / delta.len() as f64
    );
}

#[test]
fn test_text_similarity() {
    let origin = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
                  Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. \
                  Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris.";

    let target = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
                  Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. \
                  Ut enim ad maxim veniam, quis nostrud exercitation ullamco laboris.";

    let delta = roundtrip(origin.as_bytes(), target.as_bytes());
    assert!(delta.len() < target.len());
}

#[test]
fn test_prefix_only() {
    roundtrip(
        b"Hello, World! This is a test.",
        b"Hello, World! This is different.",
    );
}

#[test]
fn test_suffix_only() {
    roundtrip(
        b"Start is different. Common ending.",
        b"Beginning differs. Common ending.",
    );
}

#[test]
fn test_middle_insertion() {
    roundtrip(b"The quick fox jumps.", b"The quick brown fox jumps.");
}

#[test]
fn test_middle_deletion() {
    roundtrip(b"The quick brown fox jumps.", b"The quick fox jumps.");
}

#[test]
fn test_repeated_pattern() {
    roundtrip(b"ABCABCABCABCABCABCABCABC", b"ABCABCABCXYZABCABCABCABC");
}

#[test]
fn test_binary_data() {
    let origin: Vec<u8> = (0..=255).cycle().take(1000).collect();
    let mut target = origin.clone();

    target[100] = 99;
    target[500] = 88;
    target[900] = 77;

    roundtrip(&origin, &target);
}

#[test]
fn test_block_moves() {
    let a = random_bytes(1, 4096);
    let b = random_bytes(2, 4096);
    let c = random_bytes(3, 4096);

    let origin = [a.as_slice(), b.as_slice(), c.as_slice()].concat();
    let target = [c.as_slice(), a.as_slice(), b.as_slice()].concat();

    let delta = roundtrip(&origin, &target);
    let stats = analyze(&delta).unwrap();
    assert!(stats.copied >= target.len() - 64);
    assert!(delta.len() < 200);
}

#[test]
fn test_unrelated_random_data() {
    let origin = random_bytes(10, 8192);
    let target = random_bytes(11, 8192);

    let delta = roundtrip(&origin, &target);
    let stats = analyze(&delta).unwrap();
    assert_eq!(stats.inserted, target.len());
    assert_eq!(stats.copy_ops, 0);
}

#[test]
fn test_fossil_delta_applies() {
    // Hand-assembled delta in the Fossil layout, checksum included.
    let origin = b"The quick brown fox";
    let delta = b"I\n4@0,4:slowA@9,3F7MTh;";

    assert_eq!(checksum(b"The slow brown fox"), 0xCF1D_676C);
    assert_eq!(apply(origin, delta).unwrap(), b"The slow brown fox");
}

#[test]
fn test_trailing_bytes_are_ignored() {
    let mut delta = create(b"origin", b"target");
    delta.extend_from_slice(b"\ntrailing garbage");
    assert_eq!(apply(b"origin", &delta).unwrap(), b"target");
}

#[test]
fn test_checksum_sensitivity() {
    let origin = random_bytes(20, 2048);
    let mut target = origin.clone();
    target[1000] ^= 0x55;

    let delta = create(&origin, &target);
    let sum = checksum(&target);
    let mut tail = encode_int(u64::from(sum));
    tail.push(b';');
    assert!(delta.ends_with(&tail));
    let body = &delta[..delta.len() - tail.len()];

    for bit in 0..32 {
        let mut corrupted = body.to_vec();
        corrupted.extend_from_slice(&encode_int(u64::from(sum ^ (1 << bit))));
        corrupted.push(b';');

        let err = apply(&origin, &corrupted).unwrap_err();
        assert!(
            matches!(err, DeltaError::ChecksumMismatch { actual, .. } if actual == sum),
            "bit {}: {:?}",
            bit,
            err
        );
        assert!(err.is_origin_mismatch());
    }
}

#[test]
fn test_truncated_delta_is_rejected() {
    let origin = random_bytes(30, 1024);
    let mut target = origin.clone();
    target.extend_from_slice(b"tail");

    let delta = create(&origin, &target);
    for cut in 0..delta.len() {
        let err = apply(&origin, &delta[..cut]).unwrap_err();
        assert!(err.is_corrupt_delta() || err.is_origin_mismatch(), "cut {}: {:?}", cut, err);
    }

    let err = apply(&origin, &delta[..delta.len() - 1]).unwrap_err();
    assert!(matches!(
        err,
        DeltaError::UnknownOperator { operator: None, .. }
    ));
}

#[test]
fn test_wrong_origin() {
    let origin = random_bytes(40, 1000);
    let mut target = origin.clone();
    target[10] = target[10].wrapping_add(1);
    let delta = create(&origin, &target);

    // Shorter origin: copies run past its end
    let err = apply(&origin[..100], &delta).unwrap_err();
    assert!(matches!(err, DeltaError::OutOfBounds(_)));

    // Same length, different content: only the checksum notices
    let mut other = origin.clone();
    other[500] ^= 0xFF;
    let err = apply(&other, &delta).unwrap_err();
    assert!(matches!(err, DeltaError::ChecksumMismatch { .. }));
}

#[test]
fn test_malformed_inputs() {
    assert!(matches!(
        apply(b"", b"").unwrap_err(),
        DeltaError::MalformedHeader(_)
    ));
    assert!(matches!(
        apply(b"", b"5").unwrap_err(),
        DeltaError::MalformedHeader(_)
    ));
    assert!(matches!(
        apply(b"", b"3\n3!abc0;").unwrap_err(),
        DeltaError::UnknownOperator {
            operator: Some(b'!'),
            ..
        }
    ));
    assert!(matches!(
        apply(b"abc", b"3\n@0,0;").unwrap_err(),
        DeltaError::InvalidInteger { .. }
    ));
    assert!(matches!(
        apply(b"", b"9\n9:abc").unwrap_err(),
        DeltaError::UnknownOperator { operator: None, .. }
    ));
}

#[test]
fn test_output_size_and_analyze() {
    let origin = random_bytes(50, 5000);
    let mut target = origin[1000..4000].to_vec();
    target.extend_from_slice(b"some inserted text");
    target.extend_from_slice(&origin[..500]);

    let delta = create(&origin, &target);
    assert_eq!(output_size(&delta).unwrap(), target.len());

    let stats = analyze(&delta).unwrap();
    assert_eq!(stats.target_len, target.len());
    assert_eq!(stats.copied + stats.inserted, target.len());
    assert!(stats.copy_ops >= 2);
}

#[test]
fn test_stream_matches_in_memory() {
    let origin = random_bytes(60, 20_000);
    let mut target = origin.clone();
    target.splice(5000..5100, b"replacement".iter().copied());

    let delta = create(&origin, &target);
    let mut source = SeekOrigin::new(Cursor::new(origin.clone()));
    let mut out = Vec::new();
    apply_stream(&mut source, &delta, &mut out).unwrap();
    assert_eq!(out, apply(&origin, &delta).unwrap());

    // Same error kinds on a corrupt delta
    let truncated = &delta[..delta.len() - 1];
    let mut source = SeekOrigin::new(Cursor::new(origin.clone()));
    let stream_err = apply_stream(&mut source, truncated, &mut Vec::new()).unwrap_err();
    let memory_err = apply(&origin, truncated).unwrap_err();
    assert_eq!(
        std::mem::discriminant(&stream_err),
        std::mem::discriminant(&memory_err)
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_roundtrip_arbitrary(
        origin in proptest::collection::vec(any::<u8>(), 0..2048),
        target in proptest::collection::vec(any::<u8>(), 0..2048),
    ) {
        let delta = create(&origin, &target);
        prop_assert_eq!(apply(&origin, &delta).unwrap(), target);
    }

    #[test]
    fn prop_roundtrip_edited(
        origin in proptest::collection::vec(any::<u8>(), 64..4096),
        edits in proptest::collection::vec((any::<prop::sample::Index>(), any::<u8>()), 0..16),
    ) {
        let mut target = origin.clone();
        for (at, byte) in edits {
            target[at.index(origin.len())] = byte;
        }

        let delta = create(&origin, &target);
        prop_assert_eq!(output_size(&delta).unwrap(), target.len());
        prop_assert_eq!(apply(&origin, &delta).unwrap(), target);
    }
}
