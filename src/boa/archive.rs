use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::AppError;

pub const TEX_FILE_NAME: &str = "book-of-abstracts.tex";

/// Zip archive holding the TeX source of the book.
pub fn tex_archive(tex_source: &str) -> Result<Vec<u8>, AppError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(TEX_FILE_NAME, options)?;
    zip.write_all(tex_source.as_bytes())?;
    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn archive_contains_the_tex_source() {
        let source = "\\documentclass{article}\n\\begin{document}Hi\\end{document}\n";
        let bytes = tex_archive(source).unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
        let mut file = archive.by_name(TEX_FILE_NAME).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, source);
    }
}
