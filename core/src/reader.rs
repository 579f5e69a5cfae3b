//! Memory-mapped pack reader
//!
//! [`PackReader::open`] maps the file read-only and validates every offset,
//! length and derived range against the mapped size before returning. After
//! that, accessors are O(1) and hand out zero-copy views; nothing is
//! re-checked on access.

use std::fs::File;
use std::ops::Range;
use std::path::Path;

use hostpack_common::{
    Aabb, CameraTableHeader, ColorSpace, FrameRecord, HPK_FORMAT, PackHeader, PixelFormat,
    SceneRecord,
};
use memmap2::Mmap;

use crate::error::{HostPackError, Result};
use crate::view::{CameraSoaView, ImageView, Roi};

/// Decoded and validated metadata of a pack, independent of where its bytes live
#[derive(Debug, Clone, PartialEq)]
pub struct PackIndex {
    pub header: PackHeader,
    pub scene: SceneRecord,
    pub cameras: CameraTableHeader,
    pub frames: Vec<FrameRecord>,
    pub pixel_format: PixelFormat,
    pub color_space: ColorSpace,
}

impl PackIndex {
    /// Decode and validate a complete pack image
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let len = bytes.len() as u64;
        let header = PackHeader::from_bytes(bytes).ok_or_else(|| {
            HostPackError::bad_pack(format!(
                "file is {len} bytes, shorter than the {}-byte header",
                PackHeader::SIZE
            ))
        })?;

        if !header.has_valid_magic() {
            return Err(HostPackError::bad_pack(format!(
                "bad magic {:02x?}",
                header.magic
            )));
        }
        if header.version == 0 || header.version > HPK_FORMAT.version {
            return Err(HostPackError::Unsupported(format!(
                "format version {} (this reader handles 1..={})",
                header.version, HPK_FORMAT.version
            )));
        }
        let pixel_format = PixelFormat::from_code(header.pixel_format).ok_or_else(|| {
            HostPackError::Unsupported(format!("pixel format code {}", header.pixel_format))
        })?;
        let color_space = ColorSpace::from_code(header.color_space).ok_or_else(|| {
            HostPackError::Unsupported(format!("color space code {}", header.color_space))
        })?;
        if cfg!(target_endian = "big") {
            return Err(HostPackError::Unsupported(
                "typed views require a little-endian host".into(),
            ));
        }

        if !header.offsets_monotonic() {
            return Err(HostPackError::bad_pack(format!(
                "section offsets out of order: scene={:#x} camera={:#x} frames={:#x} pixels={:#x} end={:#x} total={:#x}",
                header.scene_off,
                header.camera_off,
                header.frames_off,
                header.pixels_off,
                header.end_off,
                header.bytes_total
            )));
        }
        if header.bytes_total > len {
            return Err(HostPackError::bad_pack(format!(
                "header claims {} bytes, file has {len}",
                header.bytes_total
            )));
        }
        if header.scene_off < PackHeader::SIZE as u64 {
            return Err(HostPackError::bad_pack("scene section overlaps the header"));
        }

        let scene = SceneRecord::from_bytes(section(
            bytes,
            header.scene_off,
            SceneRecord::SIZE as u64,
            header.camera_off,
            "scene record",
        )?)
        .ok_or_else(|| HostPackError::bad_pack("truncated scene record"))?;

        let cameras = CameraTableHeader::from_bytes(section(
            bytes,
            header.camera_off,
            CameraTableHeader::SIZE as u64,
            header.frames_off,
            "camera table",
        )?)
        .ok_or_else(|| HostPackError::bad_pack("truncated camera table"))?;

        let columns_start = header.camera_off + CameraTableHeader::SIZE as u64;
        for column in cameras.column_spans() {
            let end = column.end(cameras.count).ok_or_else(|| {
                HostPackError::bad_pack(format!("{} column length overflows", column.name))
            })?;
            if column.offset < columns_start || end > header.bytes_total {
                return Err(HostPackError::bad_pack(format!(
                    "{} column {:#x}..{end:#x} outside the file",
                    column.name, column.offset
                )));
            }
            if column.offset % 4 != 0 {
                return Err(HostPackError::bad_pack(format!(
                    "{} column at {:#x} is not 4-byte aligned",
                    column.name, column.offset
                )));
            }
        }

        let count = cameras.count as usize;
        let table_len = (count as u64)
            .checked_mul(FrameRecord::SIZE as u64)
            .ok_or_else(|| HostPackError::bad_pack("frame table length overflows"))?;
        let table = section(
            bytes,
            header.frames_off,
            table_len,
            header.pixels_off,
            "frame table",
        )?;

        let mut frames = Vec::new();
        frames.try_reserve_exact(count)?;
        for (index, chunk) in table.chunks_exact(FrameRecord::SIZE).enumerate() {
            let frame = FrameRecord::from_bytes(chunk)
                .ok_or_else(|| HostPackError::bad_pack("truncated frame record"))?;
            check_frame(index, &frame, &header, &cameras, pixel_format)?;
            frames.push(frame);
        }

        Ok(Self {
            header,
            scene,
            cameras,
            frames,
            pixel_format,
            color_space,
        })
    }
}

/// `len` bytes at `offset`, which must end by `limit`
fn section<'a>(
    bytes: &'a [u8],
    offset: u64,
    len: u64,
    limit: u64,
    what: &str,
) -> Result<&'a [u8]> {
    let end = offset
        .checked_add(len)
        .filter(|&end| end <= limit)
        .ok_or_else(|| {
            HostPackError::bad_pack(format!(
                "{what} at {offset:#x} (+{len}) runs past {limit:#x}"
            ))
        })?;
    bytes
        .get(to_range(offset, end)?)
        .ok_or_else(|| HostPackError::bad_pack(format!("{what} outside the file")))
}

fn to_range(start: u64, end: u64) -> Result<Range<usize>> {
    let conv = |v: u64| {
        usize::try_from(v).map_err(|_| HostPackError::bad_pack("offset exceeds address space"))
    };
    Ok(conv(start)?..conv(end)?)
}

fn check_frame(
    index: usize,
    frame: &FrameRecord,
    header: &PackHeader,
    cameras: &CameraTableHeader,
    format: PixelFormat,
) -> Result<()> {
    let bad = |msg: String| Err(HostPackError::bad_pack(format!("frame {index}: {msg}")));

    if frame.width == 0 || frame.height == 0 {
        return bad(format!("empty {}x{} image", frame.width, frame.height));
    }
    if frame.pixel_stride != format.bytes_per_pixel() {
        return bad(format!(
            "pixel stride {} does not match {format}",
            frame.pixel_stride
        ));
    }
    if u64::from(frame.row_stride) < u64::from(frame.width) * u64::from(frame.pixel_stride) {
        return bad(format!(
            "row stride {} shorter than {} pixels",
            frame.row_stride, frame.width
        ));
    }
    if frame.camera_id >= cameras.count {
        return bad(format!(
            "camera id {} out of range ({} cameras)",
            frame.camera_id, cameras.count
        ));
    }
    if !frame.roi_in_bounds() {
        return bad(format!(
            "roi {},{},{},{} outside {}x{} image",
            frame.roi_x, frame.roi_y, frame.roi_w, frame.roi_h, frame.width, frame.height
        ));
    }
    let end = frame.pixel_off.checked_add(frame.pixel_bytes());
    if frame.pixel_off < header.pixels_off || end.is_none_or(|end| end > header.bytes_total) {
        return bad(format!(
            "pixels at {:#x} (+{}) outside the payload",
            frame.pixel_off,
            frame.pixel_bytes()
        ));
    }
    if format == PixelFormat::Rgba32F && (frame.pixel_off % 4 != 0 || frame.row_stride % 4 != 0) {
        return bad("float rows are not 4-byte aligned".into());
    }
    Ok(())
}

// ============================================================================
// Reader
// ============================================================================

/// An open, validated pack.
///
/// The mapping is released when the reader is closed or dropped. All views
/// borrow from the reader, so none can outlive it. Safe to share across
/// threads.
pub struct PackReader {
    map: Mmap,
    index: PackIndex,
}

impl std::fmt::Debug for PackReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackReader")
            .field("bytes", &self.map.len())
            .field("frames", &self.index.frames.len())
            .field("pixel_format", &self.index.pixel_format)
            .finish()
    }
}

impl PackReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(HostPackError::io_at(path))?;
        let len = file.metadata().map_err(HostPackError::io_at(path))?.len();
        if len < PackHeader::SIZE as u64 {
            return Err(HostPackError::bad_pack(format!(
                "{} is {len} bytes, shorter than the {}-byte header",
                path.display(),
                PackHeader::SIZE
            )));
        }

        // SAFETY: the pack is write-once; the mapping is read-only and every
        // range handed out below was validated against its length.
        let map = unsafe { Mmap::map(&file) }.map_err(HostPackError::io_at(path))?;
        let index = PackIndex::parse(&map)?;

        tracing::debug!(
            path = %path.display(),
            frames = index.frames.len(),
            bytes = index.header.bytes_total,
            "opened pack"
        );
        Ok(Self { map, index })
    }

    /// Unmap the pack
    pub fn close(self) {}

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    pub fn header(&self) -> &PackHeader {
        &self.index.header
    }

    pub fn frame_count(&self) -> usize {
        self.index.frames.len()
    }

    pub fn camera_count(&self) -> u32 {
        self.index.cameras.count
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.index.frames
    }

    pub fn frame(&self, i: usize) -> Option<&FrameRecord> {
        self.index.frames.get(i)
    }

    /// Camera id of frame `i` (0 when out of range)
    pub fn frame_camera_index(&self, i: usize) -> u32 {
        self.frame(i).map_or(0, |f| f.camera_id)
    }

    pub fn scene_aabb(&self) -> Aabb {
        self.index.scene.aabb
    }

    pub fn scene_color_space(&self) -> ColorSpace {
        self.index.color_space
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.index.pixel_format
    }

    pub fn version(&self) -> u32 {
        self.index.header.version
    }

    pub fn capabilities(&self) -> u64 {
        self.index.header.caps_bits
    }

    pub fn total_bytes(&self) -> u64 {
        self.index.header.bytes_total
    }

    /// Bytes `offset..offset + len` of the mapping, empty if out of range
    fn bytes(&self, offset: u64, len: u64) -> &[u8] {
        offset
            .checked_add(len)
            .and_then(|end| to_range(offset, end).ok())
            .and_then(|range| self.map.get(range))
            .unwrap_or(&[])
    }

    fn column<T: bytemuck::Pod>(&self, offset: u64, elem_size: u64) -> &[T] {
        let len = elem_size * u64::from(self.index.cameras.count);
        bytemuck::try_cast_slice(self.bytes(offset, len)).unwrap_or(&[])
    }

    /// Pixels of frame `i`; the all-zero view when `i` is out of range
    pub fn image_view(&self, i: usize) -> ImageView<'_> {
        let Some(frame) = self.frame(i) else {
            return ImageView::default();
        };
        ImageView {
            data: self.bytes(frame.pixel_off, frame.pixel_bytes()),
            width: frame.width,
            height: frame.height,
            row_stride: frame.row_stride,
            pixel_stride: frame.pixel_stride,
            format: Some(self.index.pixel_format),
            roi: Roi {
                x: frame.roi_x,
                y: frame.roi_y,
                w: frame.roi_w,
                h: frame.roi_h,
            },
        }
    }

    pub fn camera_soa(&self) -> CameraSoaView<'_> {
        let t = &self.index.cameras;
        CameraSoaView {
            count: t.count,
            fx: self.column(t.fx_off, 4),
            fy: self.column(t.fy_off, 4),
            cx: self.column(t.cx_off, 4),
            cy: self.column(t.cy_off, 4),
            pose: self.column(t.pose_off, hostpack_common::POSE_ELEM_SIZE),
            width: self.column(t.width_off, 4),
            height: self.column(t.height_off, 4),
            time: self.column(t.time_off, 4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Minimal valid single-frame pack (1x1 RGBA8, no block padding)
    fn tiny_pack() -> Vec<u8> {
        let scene_off = PackHeader::SIZE as u64;
        let camera_off = scene_off + SceneRecord::SIZE as u64;
        let table = CameraTableHeader::contiguous(camera_off, 1);
        let frames_off = table.time_off + 4;
        let pixels_off = frames_off + FrameRecord::SIZE as u64;
        let end = pixels_off + 4;

        let mut header = PackHeader::new(PixelFormat::Rgba8, ColorSpace::Linear);
        header.scene_off = scene_off;
        header.camera_off = camera_off;
        header.frames_off = frames_off;
        header.pixels_off = pixels_off;
        header.end_off = end;
        header.bytes_total = end;

        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&SceneRecord::new(Aabb::UNIT).to_bytes());
        bytes.extend_from_slice(&table.to_bytes());
        for v in [5.0f32, 6.0, 0.5, 0.5] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        for v in hostpack_common::Pose3x4::IDENTITY.to_array() {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        for v in [1u32, 1, 0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&FrameRecord::full_image(0, pixels_off, 1, 1, 4, 4).to_bytes());
        bytes.extend_from_slice(&[10, 20, 30, 255]);
        assert_eq!(bytes.len() as u64, end);
        bytes
    }

    fn patch_u32(bytes: &mut [u8], at: usize, v: u32) {
        bytes[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    #[test]
    fn test_parse_valid() {
        let index = PackIndex::parse(&tiny_pack()).unwrap();
        assert_eq!(index.frames.len(), 1);
        assert_eq!(index.cameras.count, 1);
        assert_eq!(index.scene.aabb, Aabb::UNIT);
        assert_eq!(index.pixel_format, PixelFormat::Rgba8);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = tiny_pack();
        bytes[0..4].copy_from_slice(b"NOPE");
        let err = PackIndex::parse(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadPack);
    }

    #[test]
    fn test_short_buffer() {
        assert_eq!(
            PackIndex::parse(&[0u8; 10]).unwrap_err().kind(),
            ErrorKind::BadPack
        );
    }

    #[test]
    fn test_truncated() {
        let bytes = tiny_pack();
        let err = PackIndex::parse(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadPack);
    }

    #[test]
    fn test_future_version_unsupported() {
        let mut bytes = tiny_pack();
        patch_u32(&mut bytes, 4, 3);
        assert_eq!(
            PackIndex::parse(&bytes).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn test_unknown_pixel_format() {
        let mut bytes = tiny_pack();
        patch_u32(&mut bytes, 0x40, 9);
        assert_eq!(
            PackIndex::parse(&bytes).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn test_camera_count_past_table() {
        let mut bytes = tiny_pack();
        // Camera count lives at the start of the camera table
        patch_u32(&mut bytes, PackHeader::SIZE + SceneRecord::SIZE, 1000);
        assert_eq!(
            PackIndex::parse(&bytes).unwrap_err().kind(),
            ErrorKind::BadPack
        );
    }

    #[test]
    fn test_frame_pixels_out_of_bounds() {
        let mut bytes = tiny_pack();
        let index = PackIndex::parse(&bytes).unwrap();
        // row_stride lives at +0x20 in the frame record
        patch_u32(&mut bytes, index.header.frames_off as usize + 0x20, 64);
        assert_eq!(
            PackIndex::parse(&bytes).unwrap_err().kind(),
            ErrorKind::BadPack
        );
    }

    #[test]
    fn test_frame_bad_camera_id() {
        let mut bytes = tiny_pack();
        let frames_off = PackIndex::parse(&bytes).unwrap().header.frames_off as usize;
        patch_u32(&mut bytes, frames_off, 1);
        assert_eq!(
            PackIndex::parse(&bytes).unwrap_err().kind(),
            ErrorKind::BadPack
        );
    }

    #[test]
    fn test_open_reads_views() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.hpk");
        std::fs::write(&path, tiny_pack()).unwrap();

        let reader = PackReader::open(&path).unwrap();
        assert_eq!(reader.frame_count(), 1);
        assert_eq!(reader.version(), 2);
        assert_eq!(reader.capabilities(), 0);

        let view = reader.image_view(0);
        assert_eq!(view.rgba8(0, 0), Some([10, 20, 30, 255]));
        assert_eq!(reader.image_view(1), ImageView::default());
        assert_eq!(reader.frame_camera_index(7), 0);

        let soa = reader.camera_soa();
        assert_eq!(soa.fx, &[5.0f32]);
        assert_eq!(soa.fy, &[6.0f32]);
        assert_eq!(soa.width, &[1u32]);
        assert_eq!(soa.time, &[0u32]);
        assert_eq!(soa.pose3x4(0), Some(hostpack_common::Pose3x4::IDENTITY));
        reader.close();
    }

    #[test]
    fn test_open_missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = PackReader::open(dir.path().join("missing.hpk")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
