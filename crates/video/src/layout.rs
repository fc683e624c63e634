use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

use crate::error::VideoError;

pub const HEADER_LEN: u64 = 1024;
pub const FOOTER_LEN: u64 = 1024;
pub const MDAT_SCAN_LEN: u64 = 8192;
pub const PREVIEW_LEN: usize = 64;

const MAX_BOXES: usize = 4096;

/// One top-level ISO-BMFF box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopLevelBox {
    pub kind: [u8; 4],
    pub offset: u64,
    pub size: u64,
}

impl TopLevelBox {
    pub fn kind_str(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }
}

/// Where the `moov` index sits relative to the media data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoovPlacement {
    /// Index precedes the media data: fast-start layout.
    BeforeMdat,
    /// Index written after recording finished, as cameras do.
    AfterMdat,
    Missing,
}

#[derive(Debug, Clone)]
pub struct ContainerLayout {
    pub file_size: u64,
    /// Leading bytes of the file, at most [`PREVIEW_LEN`].
    pub preview: Vec<u8>,
    pub starts_with_size_box: bool,
    pub moov_in_header: bool,
    pub moov_in_footer: bool,
    pub mdat_in_first_chunk: bool,
    pub boxes: Vec<TopLevelBox>,
    /// The walk hit a box whose size does not fit the file.
    pub truncated: bool,
}

impl ContainerLayout {
    pub fn inspect(path: &Path) -> Result<Self, VideoError> {
        if !path.exists() {
            return Err(VideoError::NotFound(path.to_path_buf()));
        }
        let mut file = File::open(path)?;
        Ok(Self::from_reader(&mut file)?)
    }

    pub fn from_reader<R: Read + Seek>(reader: &mut R) -> io::Result<Self> {
        let file_size = reader.seek(SeekFrom::End(0))?;

        let header = read_range(reader, 0, HEADER_LEN)?;
        let footer = read_range(reader, file_size.saturating_sub(FOOTER_LEN), FOOTER_LEN)?;
        let first_chunk = read_range(reader, 0, MDAT_SCAN_LEN)?;
        let (boxes, truncated) = walk_boxes(reader, file_size)?;

        Ok(Self {
            file_size,
            preview: header[..header.len().min(PREVIEW_LEN)].to_vec(),
            starts_with_size_box: header.starts_with(&[0, 0, 0]),
            moov_in_header: contains(&header, b"moov"),
            moov_in_footer: contains(&footer, b"moov"),
            mdat_in_first_chunk: contains(&first_chunk, b"mdat"),
            boxes,
            truncated,
        })
    }

    pub fn preview_hex(&self) -> String {
        self.preview.iter().map(|byte| format!("{byte:02x}")).collect()
    }

    /// Preview as an escaped byte literal, e.g. `b'\x00\x00\x00\x18ftypmp42'`.
    pub fn preview_ascii(&self) -> String {
        format!("b'{}'", self.preview.escape_ascii())
    }

    pub fn moov_placement(&self) -> MoovPlacement {
        let position = |kind: &[u8; 4]| self.boxes.iter().position(|b| &b.kind == kind);
        match (position(b"moov"), position(b"mdat")) {
            (None, _) => MoovPlacement::Missing,
            (Some(moov), Some(mdat)) if moov > mdat => MoovPlacement::AfterMdat,
            (Some(_), _) => MoovPlacement::BeforeMdat,
        }
    }
}

/// Walks the top-level boxes from offset zero.
///
/// Returns the boxes found and whether the walk stopped on a malformed size.
pub fn walk_boxes<R: Read + Seek>(
    reader: &mut R,
    file_size: u64,
) -> io::Result<(Vec<TopLevelBox>, bool)> {
    let mut boxes = Vec::new();
    let mut offset = 0u64;
    while offset + 8 <= file_size && boxes.len() < MAX_BOXES {
        reader.seek(SeekFrom::Start(offset))?;
        let mut head = [0u8; 8];
        reader.read_exact(&mut head)?;
        let declared = u32::from_be_bytes([head[0], head[1], head[2], head[3]]) as u64;
        let kind = [head[4], head[5], head[6], head[7]];

        let (size, header_len) = match declared {
            0 => (file_size - offset, 8),
            1 => {
                if offset + 16 > file_size {
                    return Ok((boxes, true));
                }
                let mut large = [0u8; 8];
                reader.read_exact(&mut large)?;
                (u64::from_be_bytes(large), 16)
            }
            size => (size, 8),
        };
        if size < header_len || size > file_size - offset {
            return Ok((boxes, true));
        }
        boxes.push(TopLevelBox { kind, offset, size });
        offset += size;
    }
    // Trailing bytes too short for a box header.
    let truncated = offset < file_size && boxes.len() < MAX_BOXES;
    Ok((boxes, truncated))
}

fn read_range<R: Read + Seek>(reader: &mut R, start: u64, len: u64) -> io::Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(start))?;
    let mut buf = Vec::new();
    reader.take(len).read_to_end(&mut buf)?;
    Ok(buf)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
