use binrw::binrw;

#[binrw]
#[brw(big, magic = b"COVCOMP\0")]
#[derive(Debug)]
pub struct ArchiveHeader {
    pub version: u8,
}

#[binrw]
#[brw(big)]
#[derive(Debug)]
pub struct ArchiveDirectoryHeader {
    pub part_num: u32,
}

#[binrw]
#[brw(big)]
#[derive(Debug, Clone)]
pub struct ArchiveDirectoryEntry {
    pub name_len: u16,

    #[br(count = name_len)]
    pub name: Vec<u8>,

    pub offset: u64,
    pub length: u64,
    pub checksum: u32,
}

#[binrw]
#[brw(big, magic = b"COVCDIR\0")]
#[derive(Debug)]
pub struct ArchiveTrailer {
    pub directory_offset: u64,
}

/// Size of [`ArchiveTrailer`] on disk: magic and directory offset.
pub const ARCHIVE_TRAILER_SIZE: i64 = 16;
