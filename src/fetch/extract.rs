// src/fetch/extract.rs

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;

/// Extract a zip archive file into `dest`.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)
        .with_context(|| format!("opening archive at {:?}", archive))?;
    let mut zip = zip::ZipArchive::new(file).context("reading zip archive")?;
    zip.extract(dest).context("extracting zip archive")?;
    Ok(())
}

/// Extract a gzip-compressed tar archive file into `dest`.
pub fn extract_tgz(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)
        .with_context(|| format!("opening archive at {:?}", archive))?;
    untar_no_chown(GzDecoder::new(BufReader::new(file)), dest)
}

/// Unpack a tar stream into `dest` without attempting to change file
/// ownership or extended attributes. The process may be unprivileged, so
/// chown on extracted entries must never be attempted.
pub fn untar_no_chown(reader: impl Read, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_ownerships(false);
    archive.set_unpack_xattrs(false);
    archive.set_preserve_mtime(false);
    archive.set_overwrite(true);

    archive
        .unpack(dest)
        .with_context(|| format!("unpacking tar archive into {:?}", dest))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn tgz_archive_extracts_with_directory_structure() {
        let scratch = tempfile::tempdir().unwrap();
        let archive_path = scratch.path().join("pkg.tgz");

        {
            let file = File::create(&archive_path).unwrap();
            let encoder =
                flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);

            let contents = b"FROM scratch\n";
            let mut header = tar::Header::new_gnu();
            header.set_path("project/Dockerfile").unwrap();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, &contents[..]).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let dest = scratch.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        extract_tgz(&archive_path, &dest).unwrap();

        let extracted = std::fs::read_to_string(dest.join("project/Dockerfile")).unwrap();
        assert_eq!(extracted, "FROM scratch\n");
    }

    #[test]
    fn zip_archive_extracts() {
        let scratch = tempfile::tempdir().unwrap();
        let archive_path = scratch.path().join("pkg.zip");

        {
            let file = File::create(&archive_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("project/Dockerfile", options).unwrap();
            writer.write_all(b"FROM scratch\n").unwrap();
            writer.finish().unwrap();
        }

        let dest = scratch.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        extract_zip(&archive_path, &dest).unwrap();

        let extracted = std::fs::read_to_string(dest.join("project/Dockerfile")).unwrap();
        assert_eq!(extracted, "FROM scratch\n");
    }
}
