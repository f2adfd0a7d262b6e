// Report file plumbing: atomic replace and content fingerprints

use std::io::Read;
use std::path::{Path, PathBuf};

/// Write `bytes` to `path` via a sibling temp file and a rename, so readers
/// never observe a half-written report.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), String> {
    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, bytes)
        .map_err(|e| format!("cannot write {}: {}", tmp_path.display(), e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        format!("failed to rename tmp to {}: {}", path.display(), e)
    })
}

/// `summary.txt` → `summary.txt.tmp`
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// blake3 hex digest of a file's bytes, streamed.
pub fn fingerprint(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
