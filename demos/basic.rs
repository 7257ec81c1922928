//! Basic usage example for fdelta.

use fdelta::{DeltaError, analyze, apply, create};

fn main() {
    // Example 1: Simple text modification
    println!("=== Example 1: Simple Text Modification ===");
    let origin = b"The quick brown fox jumps over the lazy dog";
    let target = b"The quick brown cat jumps over the lazy dog";

    let delta = create(origin, target);
    println!("Origin: {:?}", String::from_utf8_lossy(origin));
    println!("Target: {:?}", String::from_utf8_lossy(target));
    println!("Delta:  {:?}", String::from_utf8_lossy(&delta));
    println!(
        "Delta size: {} bytes ({:.1}% of target)",
        delta.len(),
        delta.len() as f64 / target.len() as f64 * 100.0
    );

    match apply(origin, &delta) {
        Ok(recovered) => {
            assert_eq!(recovered, target);
            println!("✓ Successfully applied and verified!");
        }
        Err(e) => eprintln!("Apply error: {}", e),
    }

    println!();

    // Example 2: Large data with small changes
    println!("=== Example 2: Large Data with Small Changes ===");
    let size = 100_000;
    let origin: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
    let mut target = origin.clone();

    // Make small modifications (every 500th byte)
    for i in (0..size).step_by(500) {
        target[i] = target[i].wrapping_add(1);
    }

    let delta = create(&origin, &target);
    println!("Target size: {} KB", size / 1024);
    println!("Delta size: {} bytes", delta.len());
    println!(
        "Compression ratio: {:.2}x",
        size as f64 / delta.len() as f64
    );

    if let Ok(stats) = analyze(&delta) {
        println!(
            "Copied {} bytes in {} ops, inserted {} bytes in {} ops",
            stats.copied, stats.copy_ops, stats.inserted, stats.insert_ops
        );
    }

    match apply(&origin, &delta) {
        Ok(recovered) => {
            assert_eq!(recovered, target);
            println!("✓ Successfully applied and verified!");
        }
        Err(e) => eprintln!("Apply error: {}", e),
    }

    println!();

    // Example 3: Applying to the wrong origin
    println!("=== Example 3: Wrong Origin ===");
    let version1 = b"# Project Documentation\n\
                     ## Overview\n\
                     This is the initial version of our project.\n\
                     It contains basic information.\n";

    let version2 = b"# Project Documentation\n\
                     ## Overview\n\
                     This is version 2 of our project.\n\
                     It contains updated information and new features.\n\
                     ## New Section\n\
                     Additional content here.\n";

    let delta = create(version1, version2);
    let mut edited = version1.to_vec();
    edited[2] = b'p';

    match apply(&edited, &delta) {
        Ok(_) => println!("Unexpectedly applied to an edited origin"),
        Err(e @ DeltaError::ChecksumMismatch { .. }) => {
            println!("✓ Rejected edited origin: {}", e);
        }
        Err(e) => println!("Rejected edited origin with: {}", e),
    }

    println!();
    println!("=== All Examples Completed ===");
}
