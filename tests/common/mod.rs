use apkchannel::core::signing::pairs::{write_signing_block, IdValues};
use byteorder::{ByteOrder, LittleEndian};
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const FILES: &[(&str, &[u8])] = &[
    ("AndroidManifest.xml", b"<manifest package=\"app.example\"/>"),
    ("classes.dex", b"dex\n035\0 not really bytecode"),
    ("assets/config.json", b"{\"flavor\":\"release\"}"),
];

/// A ZIP archive with a signing block spliced in front of its central directory.
pub fn build_apk(comment: &str, entries: &IdValues) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, contents) in FILES {
        zip.start_file(*name, options).unwrap();
        zip.write_all(contents).unwrap();
    }
    zip.set_comment(comment);
    let mut bytes = zip.finish().unwrap().into_inner();

    let eocd = bytes.len() - 22 - comment.len();
    let cd_start = LittleEndian::read_u32(&bytes[eocd + 16..eocd + 20]) as usize;
    let mut block = vec![];
    write_signing_block(&mut block, entries).unwrap();
    bytes.splice(cd_start..cd_start, block.iter().copied());

    let eocd = eocd + block.len();
    LittleEndian::write_u32(&mut bytes[eocd + 16..eocd + 20], (cd_start + block.len()) as u32);
    bytes
}

/// A plain ZIP archive without a signing block.
pub fn build_zip() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, contents) in FILES {
        zip.start_file(*name, options).unwrap();
        zip.write_all(contents).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Opens `bytes` as a ZIP archive and checks every file is intact.
pub fn assert_zip_intact(bytes: Vec<u8>) {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), FILES.len());
    for (name, contents) in FILES {
        let mut file = archive.by_name(name).unwrap();
        let mut read = vec![];
        file.read_to_end(&mut read).unwrap();
        assert_eq!(&read, contents, "{}", name);
    }
}
