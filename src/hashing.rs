//! Content hashing and digest aggregation.
//!
//! The content hasher produces a [`Digest`] from a file's byte contents
//! *and* its path string, so identical bytes at two different locations do
//! not collide (build meaning can depend on location, e.g. a namespace
//! derived from the path). The aggregator combines a set of digests into one
//! digest, independent of input order and of duplicate occurrences.

use std::fs::File;
use std::path::Path;

use blake3::Hasher;
use memmap2::Mmap;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::digest::{Digest, HashAlgorithm};
use crate::error::{DriftError, Result};

/// Computes the digest of a single file from its path and contents.
///
/// The path's raw OS bytes are hashed exactly as given (callers pass
/// absolute paths), followed by a NUL separator and then every byte of the
/// file, so even paths differing only in non-UTF-8 bytes stay distinct.
/// Files are memory-mapped and hashed with BLAKE3's rayon-parallel update.
/// Symbolic links and directories are rejected.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the path is a symlink or a
/// directory, or memory mapping fails. An unreadable file must fail the
/// whole computation; skipping it would yield a falsely-stable fingerprint.
pub fn hash_file(algorithm: HashAlgorithm, path: &Path) -> Result<Digest> {
    let metadata = std::fs::symlink_metadata(path).map_err(|source| DriftError::IoError {
        path: path.to_path_buf(),
        source,
    })?;

    if metadata.is_symlink() {
        return Err(DriftError::InvalidFileType {
            path: path.to_path_buf(),
            message: "Symbolic links are not supported".to_string(),
        });
    }

    if metadata.is_dir() {
        return Err(DriftError::InvalidFileType {
            path: path.to_path_buf(),
            message: "Directories are not supported".to_string(),
        });
    }

    let mut hasher = Hasher::new();
    hasher.update(path.as_os_str().as_encoded_bytes());
    hasher.update(b"\0");

    // Empty files contribute only their path; no point memory mapping them.
    if metadata.len() > 0 {
        let file = File::open(path).map_err(|source| DriftError::IoError {
            path: path.to_path_buf(),
            source,
        })?;

        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| DriftError::IoError {
            path: path.to_path_buf(),
            source,
        })?;

        hasher.update_rayon(&mmap);
    }

    Ok(finalize(algorithm, hasher))
}

/// Computes the digests of every regular file at or beneath `path`.
///
/// A file path yields exactly one digest; a directory is walked recursively
/// and each regular file beneath it is hashed individually. Enumeration
/// order is irrelevant because callers aggregate the results
/// order-independently. Symbolic links are not followed and do not
/// contribute digests.
///
/// # Errors
///
/// Any unreadable entry fails the whole walk with the offending path.
pub fn hash_tree(algorithm: HashAlgorithm, path: &Path) -> Result<Vec<Digest>> {
    let metadata = std::fs::symlink_metadata(path).map_err(|source| DriftError::IoError {
        path: path.to_path_buf(),
        source,
    })?;

    if metadata.is_file() {
        return Ok(vec![hash_file(algorithm, path)?]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(|err| {
            let entry_path = err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| path.to_path_buf());
            DriftError::IoError {
                path: entry_path,
                source: err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            }
        })?;

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    // Hashing across files is safe to parallelize: aggregation downstream is
    // order-independent, so completion order does not matter.
    files
        .par_iter()
        .map(|file| hash_file(algorithm, file))
        .collect()
}

/// Combines one or more digests into a single digest.
///
/// The input is treated as a set of distinct digests: the result is
/// identical regardless of input order and regardless of duplicate
/// occurrences. A single distinct digest is returned unchanged, which keeps
/// the common single-dependency case cheap and stable.
///
/// # Errors
///
/// Returns [`DriftError::EmptyAggregate`] for zero inputs; callers must
/// guarantee at least one digest (categories with no content use
/// [`Digest::empty`]).
pub fn aggregate(algorithm: HashAlgorithm, digests: &[Digest]) -> Result<Digest> {
    if digests.is_empty() {
        return Err(DriftError::EmptyAggregate);
    }

    let mut encoded: Vec<String> = digests.iter().map(Digest::encoded).collect();
    encoded.sort();
    encoded.dedup();

    if encoded.len() == 1 {
        // Single-element identity; also covers N copies of one digest.
        return Ok(digests[0].clone());
    }

    let mut hasher = Hasher::new();
    for item in &encoded {
        hasher.update(item.as_bytes());
        hasher.update(b"\n");
    }

    Ok(finalize(algorithm, hasher))
}

fn finalize(algorithm: HashAlgorithm, hasher: Hasher) -> Digest {
    match algorithm {
        HashAlgorithm::Blake3 => {
            Digest::from_hex(algorithm, hasher.finalize().to_hex().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use proptest::prelude::*;
    use tempfile::TempDir;

    use super::*;

    const ALGO: HashAlgorithm = HashAlgorithm::Blake3;

    #[test]
    fn test_hash_file_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("test.txt");
        fs::write(&test_file, "hello world").unwrap();

        let first = hash_file(ALGO, &test_file).unwrap();
        let second = hash_file(ALGO, &test_file).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_hash_file_depends_on_path() {
        let temp_dir = TempDir::new().unwrap();
        let file_a = temp_dir.path().join("a.txt");
        let file_b = temp_dir.path().join("b.txt");
        fs::write(&file_a, "identical bytes").unwrap();
        fs::write(&file_b, "identical bytes").unwrap();

        assert_ne!(
            hash_file(ALGO, &file_a).unwrap(),
            hash_file(ALGO, &file_b).unwrap()
        );
    }

    #[test]
    fn test_hash_file_depends_on_content() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("test.txt");

        fs::write(&test_file, "before").unwrap();
        let before = hash_file(ALGO, &test_file).unwrap();

        fs::write(&test_file, "after").unwrap();
        let after = hash_file(ALGO, &test_file).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn test_hash_nonexistent_file() {
        let result = hash_file(ALGO, Path::new("/nonexistent/file"));
        assert!(matches!(result, Err(DriftError::IoError { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_hash_file_distinguishes_non_utf8_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        // Two names that differ only in an invalid UTF-8 byte; a lossy
        // string conversion would map both to the replacement character.
        let file_a = temp_dir.path().join(OsStr::from_bytes(b"data-\xff.bin"));
        let file_b = temp_dir.path().join(OsStr::from_bytes(b"data-\xfe.bin"));
        fs::write(&file_a, "identical bytes").unwrap();
        fs::write(&file_b, "identical bytes").unwrap();

        assert_ne!(
            hash_file(ALGO, &file_a).unwrap(),
            hash_file(ALGO, &file_b).unwrap()
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_hash_symlink_rejected() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target.txt");
        let link = temp_dir.path().join("link.txt");

        fs::write(&target, "content").unwrap();
        symlink(&target, &link).unwrap();

        let result = hash_file(ALGO, &link);
        assert!(matches!(result, Err(DriftError::InvalidFileType { .. })));
    }

    #[test]
    fn test_hash_tree_enumerates_nested_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("nested/deeper")).unwrap();
        fs::write(temp_dir.path().join("top.txt"), "top").unwrap();
        fs::write(temp_dir.path().join("nested/mid.txt"), "mid").unwrap();
        fs::write(temp_dir.path().join("nested/deeper/leaf.txt"), "leaf").unwrap();

        let digests = hash_tree(ALGO, temp_dir.path()).unwrap();
        assert_eq!(digests.len(), 3);
    }

    #[test]
    fn test_hash_tree_of_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("only.txt");
        fs::write(&test_file, "only").unwrap();

        let digests = hash_tree(ALGO, &test_file).unwrap();
        assert_eq!(digests, vec![hash_file(ALGO, &test_file).unwrap()]);
    }

    #[test]
    fn test_aggregate_single_element_identity() {
        let digest = Digest::of_bytes(ALGO, b"solo");
        assert_eq!(aggregate(ALGO, &[digest.clone()]).unwrap(), digest);
    }

    #[test]
    fn test_aggregate_rejects_empty_input() {
        assert!(matches!(
            aggregate(ALGO, &[]),
            Err(DriftError::EmptyAggregate)
        ));
    }

    #[test]
    fn test_aggregate_duplicates_collapse() {
        let a = Digest::of_bytes(ALGO, b"a");
        let b = Digest::of_bytes(ALGO, b"b");

        let with_dup = aggregate(ALGO, &[a.clone(), a.clone(), b.clone()]).unwrap();
        let without_dup = aggregate(ALGO, &[a.clone(), b]).unwrap();
        assert_eq!(with_dup, without_dup);

        // N copies of one digest reduce to the identity case.
        assert_eq!(aggregate(ALGO, &[a.clone(), a.clone()]).unwrap(), a);
    }

    #[test]
    fn test_aggregate_differs_from_inputs() {
        let a = Digest::of_bytes(ALGO, b"a");
        let b = Digest::of_bytes(ALGO, b"b");
        let combined = aggregate(ALGO, &[a.clone(), b.clone()]).unwrap();
        assert_ne!(combined, a);
        assert_ne!(combined, b);
    }

    proptest! {
        #[test]
        fn prop_aggregate_is_order_independent(inputs in prop::collection::vec(any::<Vec<u8>>(), 1..8)) {
            let digests: Vec<Digest> = inputs.iter().map(|bytes| Digest::of_bytes(ALGO, bytes)).collect();
            let mut reversed = digests.clone();
            reversed.reverse();
            prop_assert_eq!(
                aggregate(ALGO, &digests).unwrap(),
                aggregate(ALGO, &reversed).unwrap()
            );
        }

        #[test]
        fn prop_aggregate_sensitive_to_membership(seed in any::<Vec<u8>>()) {
            let a = Digest::of_bytes(ALGO, &seed);
            let b = Digest::of_bytes(ALGO, b"fixed-extra-member");
            prop_assume!(a != b);
            let alone = aggregate(ALGO, std::slice::from_ref(&a)).unwrap();
            let with_b = aggregate(ALGO, &[a, b]).unwrap();
            prop_assert_ne!(alone, with_b);
        }
    }
}
