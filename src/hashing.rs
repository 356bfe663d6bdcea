// Demo file hashing: pick the `.dem` files out of a folder and compute a
// SHA-256 digest of each file's bytes.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Extension (compared case-insensitively) identifying a demo file.
pub const DEMO_EXTENSION: &str = "dem";

const CHUNK_SIZE: usize = 8192;

/// A demo file and the hex digest of its contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DemoHash {
    pub path: PathBuf,
    pub digest: String,
}

pub fn is_demo_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(DEMO_EXTENSION))
        .unwrap_or(false)
}

/// Stream a file through SHA-256 in fixed-size chunks and return the
/// lowercase hex digest.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Demo files directly inside `dir`, sorted by file name.
pub fn list_demo_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list directory {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() && is_demo_file(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Hash every demo file in `dir`. `on_file` is called after each file so
/// callers can drive a progress bar.
pub fn hash_demo_folder_with<F>(dir: &Path, mut on_file: F) -> Result<Vec<DemoHash>>
where
    F: FnMut(&Path, usize, usize),
{
    let files = list_demo_files(dir)?;
    let total = files.len();
    let mut hashes = Vec::with_capacity(total);
    for (i, path) in files.into_iter().enumerate() {
        let digest = hash_file(&path)?;
        log::debug!("{} -> {}", path.display(), digest);
        on_file(&path, i + 1, total);
        hashes.push(DemoHash { path, digest });
    }
    Ok(hashes)
}

pub fn hash_demo_folder(dir: &Path) -> Result<Vec<DemoHash>> {
    hash_demo_folder_with(dir, |_, _, _| {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn digest_is_lowercase_hex_sha256() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.dem");
        fs::write(&path, b"").unwrap();
        assert_eq!(
            hash_file(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn same_file_hashes_the_same_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dem");
        fs::write(&path, vec![7u8; CHUNK_SIZE * 3 + 17]).unwrap();
        assert_eq!(hash_file(&path).unwrap(), hash_file(&path).unwrap());
    }

    #[test]
    fn identical_contents_share_a_digest() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.dem");
        let b = dir.path().join("b.dem");
        fs::write(&a, b"HL2DEMO payload").unwrap();
        fs::write(&b, b"HL2DEMO payload").unwrap();
        assert_eq!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }

    #[test]
    fn one_byte_difference_changes_digest() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.dem");
        let b = dir.path().join("b.dem");
        let mut bytes = vec![0u8; 20_000];
        fs::write(&a, &bytes).unwrap();
        bytes[12_345] = 1;
        fs::write(&b, &bytes).unwrap();
        assert_ne!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }

    #[test]
    fn only_dem_files_are_hashed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.dem"), b"b").unwrap();
        fs::write(dir.path().join("a.dem"), b"a").unwrap();
        fs::write(dir.path().join("c.txt"), b"c").unwrap();
        fs::write(dir.path().join("D.DEM"), b"d").unwrap();
        fs::create_dir(dir.path().join("nested.dem")).unwrap();

        let hashes = hash_demo_folder(dir.path()).unwrap();
        let names: Vec<_> = hashes
            .iter()
            .map(|h| h.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["D.DEM", "a.dem", "b.dem"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = hash_demo_folder(&dir.path().join("gone")).unwrap_err();
        assert!(err.to_string().contains("Failed to list directory"));
    }
}
