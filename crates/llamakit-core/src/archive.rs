//! Tarball extraction for downloaded backend archives

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;
use tar::Archive;
use tracing::debug;

/// Unpack a `.tar.gz` archive into `output_dir`, creating it if missing.
pub fn decompress(archive_path: &Path, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let file = File::open(archive_path)?;
    let gz = GzDecoder::new(file);
    let mut archive = Archive::new(gz);

    archive.unpack(output_dir).map_err(|err| {
        Error::Archive(format!(
            "failed to extract {}: {err}",
            archive_path.display()
        ))
    })?;

    debug!(
        "Extracted {} into {}",
        archive_path.display(),
        output_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let gz = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(gz);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, *content).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap().flush().unwrap();
    }

    #[test]
    fn test_decompress_unpacks_into_output_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("backend.tar.gz");
        write_archive(&archive, &[("build/bin/llama-server", b"#!server")]);

        let out = tmp.path().join("out");
        decompress(&archive, &out).unwrap();

        assert!(out.join("build").join("bin").join("llama-server").exists());
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("broken.tar.gz");
        std::fs::write(&archive, b"not a tarball").unwrap();

        let result = decompress(&archive, &tmp.path().join("out"));
        assert!(matches!(result, Err(Error::Archive(_))));
    }
}
