//! Pack builder
//!
//! [`PackBuilder`] ingests the scene description, runs the decode stage and
//! then drives [`PackLayout`], the single-threaded writer state machine:
//!
//! ```text
//! Start ─reserve_header→ HeaderReserved ─write_scene→ SceneWritten
//!   ─write_camera_table→ CamerasWritten ─reserve_frame_table→ FrameTableReserved
//!   ─write_pixels→ PixelsWritten ─finish→ Finished
//! ```
//!
//! The header and frame table are reserved as zeroes and patched once the
//! pixel payload has been laid out.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use hostpack_common::{
    Aabb, Alignment, CameraTableHeader, ColorSpace, FrameRecord, PackHeader, PixelFormat,
    Pose3x4, RowEncoder, SceneRecord,
};

use crate::config::{BuildConfig, ValidatedConfig};
use crate::decode::{collect_decoded, decode_all};
use crate::decoder::{DecodedImage, ImageCrateDecoder, ImageDecoder};
use crate::error::{HostPackError, Result};
use crate::scene::{Intrinsics, SceneDescription, load_scene};
use crate::writer::{BlockWriter, Reservation};

/// Named step of the layout state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Start,
    HeaderReserved,
    SceneWritten,
    CamerasWritten,
    FrameTableReserved,
    PixelsWritten,
    Finished,
}

/// What a finished build produced
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub frame_count: usize,
    pub bytes_total: u64,
    pub scene_off: u64,
    pub camera_off: u64,
    pub frames_off: u64,
    pub pixels_off: u64,
    pub pixel_format: PixelFormat,
}

impl BuildSummary {
    fn from_header(header: &PackHeader, frame_count: usize, pixel_format: PixelFormat) -> Self {
        Self {
            frame_count,
            bytes_total: header.bytes_total,
            scene_off: header.scene_off,
            camera_off: header.camera_off,
            frames_off: header.frames_off,
            pixels_off: header.pixels_off,
            pixel_format,
        }
    }
}

// ============================================================================
// Layout state machine
// ============================================================================

/// Writes one pack, section by section, over a seekable stream
pub struct PackLayout<W: Write + Seek> {
    writer: BlockWriter<W>,
    phase: BuildPhase,
    format: PixelFormat,
    row_align: Alignment,
    block_align: Alignment,
    header: PackHeader,
    header_slot: Option<Reservation>,
    table_slot: Option<Reservation>,
    frames: Vec<FrameRecord>,
}

impl<W: Write + Seek> PackLayout<W> {
    pub fn new(out: W, format: PixelFormat, row_align: Alignment, block_align: Alignment) -> Self {
        Self {
            writer: BlockWriter::new(out),
            phase: BuildPhase::Start,
            format,
            row_align,
            block_align,
            header: PackHeader::new(format, ColorSpace::Linear),
            header_slot: None,
            table_slot: None,
            frames: Vec::new(),
        }
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    fn advance(&mut self, from: BuildPhase, to: BuildPhase) -> Result<()> {
        if self.phase != from {
            return Err(HostPackError::Internal(format!(
                "layout step for {to:?} called in phase {:?} (expected {from:?})",
                self.phase
            )));
        }
        self.phase = to;
        Ok(())
    }

    pub fn reserve_header(&mut self) -> Result<()> {
        self.advance(BuildPhase::Start, BuildPhase::HeaderReserved)?;
        self.header_slot = Some(self.writer.reserve(PackHeader::SIZE as u64)?);
        Ok(())
    }

    pub fn write_scene(&mut self, aabb: Aabb) -> Result<()> {
        self.advance(BuildPhase::HeaderReserved, BuildPhase::SceneWritten)?;
        self.header.scene_off = self.writer.pad_to(self.block_align)?;
        self.writer.write_record(&SceneRecord::new(aabb))?;
        Ok(())
    }

    /// Write the camera descriptor followed by its eight columns.
    ///
    /// Camera `i` takes its pose from `poses[i]` and its size from
    /// `images[i]`; intrinsics are shared.
    pub fn write_camera_table(
        &mut self,
        intrinsics: Intrinsics,
        poses: &[Pose3x4],
        images: &[DecodedImage],
    ) -> Result<()> {
        self.advance(BuildPhase::SceneWritten, BuildPhase::CamerasWritten)?;
        if poses.len() != images.len() {
            return Err(HostPackError::Internal(format!(
                "{} poses for {} images",
                poses.len(),
                images.len()
            )));
        }
        let count = frame_count_u32(images.len())?;

        let camera_off = self.writer.pad_to(self.block_align)?;
        self.header.camera_off = camera_off;
        let table = CameraTableHeader::contiguous(camera_off, count);
        self.writer.write_record(&table)?;

        let n = images.len();
        let w = &mut self.writer;
        w.write_f32_column(std::iter::repeat_n(intrinsics.fx, n))?;
        w.write_f32_column(std::iter::repeat_n(intrinsics.fy, n))?;
        w.write_f32_column(std::iter::repeat_n(intrinsics.cx, n))?;
        w.write_f32_column(std::iter::repeat_n(intrinsics.cy, n))?;
        w.write_f32_column(poses.iter().flat_map(Pose3x4::to_array))?;
        w.write_u32_column(images.iter().map(DecodedImage::width))?;
        w.write_u32_column(images.iter().map(DecodedImage::height))?;
        w.write_u32_column(0..count)?;

        tracing::debug!(camera_off, count, "wrote camera table");
        Ok(())
    }

    /// Write `count` zeroed frame records to be patched by [`Self::finish`]
    pub fn reserve_frame_table(&mut self, count: usize) -> Result<()> {
        self.advance(BuildPhase::CamerasWritten, BuildPhase::FrameTableReserved)?;
        self.frames.try_reserve_exact(count)?;
        self.header.frames_off = self.writer.pad_to(self.block_align)?;
        let len = (count as u64)
            .checked_mul(FrameRecord::SIZE as u64)
            .ok_or_else(|| HostPackError::Unsupported(format!("{count} frames")))?;
        self.table_slot = Some(self.writer.reserve(len)?);
        Ok(())
    }

    /// Encode every frame into the payload, one block-aligned frame after another
    pub fn write_pixels(&mut self, images: &[DecodedImage]) -> Result<()> {
        self.advance(BuildPhase::FrameTableReserved, BuildPhase::PixelsWritten)?;
        let reserved = self.table_slot.map_or(0, |r| r.len()) / FrameRecord::SIZE as u64;
        if reserved != images.len() as u64 {
            return Err(HostPackError::Internal(format!(
                "frame table holds {reserved} records, got {} images",
                images.len()
            )));
        }

        let encoder = RowEncoder::new(self.format);
        let pixel_stride = self.format.bytes_per_pixel();
        self.header.pixels_off = self.writer.pad_to(self.block_align)?;

        let mut row = Vec::new();
        for (index, image) in images.iter().enumerate() {
            let camera_id = frame_count_u32(index)?;
            let packed = u64::from(image.width()) * u64::from(pixel_stride);
            let row_stride = u32::try_from(self.row_align.round_up(packed)).map_err(|_| {
                HostPackError::Unsupported(format!(
                    "frame {index}: row of {} pixels is too wide",
                    image.width()
                ))
            })?;

            let pixel_off = self.writer.pad_to(self.block_align)?;
            let record = FrameRecord::full_image(
                camera_id,
                pixel_off,
                image.width(),
                image.height(),
                row_stride,
                pixel_stride,
            );

            row.clear();
            row.try_reserve_exact(row_stride as usize)?;
            row.resize(row_stride as usize, 0);
            for src in image.rows() {
                encoder
                    .encode(src, &mut row)
                    .map_err(|e| HostPackError::Internal(format!("frame {index}: {e}")))?;
                self.writer.write_bytes(&row)?;
            }
            self.writer.pad_to(self.block_align)?;

            tracing::debug!(
                index,
                pixel_off,
                width = image.width(),
                height = image.height(),
                row_stride,
                "wrote frame"
            );
            self.frames.push(record);
        }
        Ok(())
    }

    /// Patch the frame table and header, flush, and return the stream
    pub fn finish(mut self) -> Result<(W, PackHeader)> {
        self.advance(BuildPhase::PixelsWritten, BuildPhase::Finished)?;
        let (Some(header_slot), Some(table_slot)) = (self.header_slot, self.table_slot) else {
            return Err(HostPackError::Internal("missing reservations".into()));
        };

        let mut table = Vec::new();
        table.try_reserve_exact(table_slot.len() as usize)?;
        for frame in &self.frames {
            table.extend_from_slice(&frame.to_bytes());
        }
        self.writer.patch(table_slot, &table)?;

        let end = self.writer.position();
        self.header.end_off = end;
        self.header.bytes_total = end;
        self.writer.patch(header_slot, &self.header.to_bytes())?;

        let out = self.writer.into_inner()?;
        Ok((out, self.header))
    }
}

fn frame_count_u32(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| HostPackError::Unsupported(format!("{n} frames exceed u32")))
}

// ============================================================================
// Builder
// ============================================================================

/// Builds packs from a dataset directory.
///
/// The configuration is validated on construction, so a builder that exists
/// never touches the filesystem with a bad alignment.
pub struct PackBuilder<D: ImageDecoder = ImageCrateDecoder> {
    config: ValidatedConfig,
    decoder: D,
}

impl PackBuilder {
    pub fn new(config: &BuildConfig) -> Result<Self> {
        Ok(Self {
            config: config.validate()?,
            decoder: ImageCrateDecoder,
        })
    }
}

impl<D: ImageDecoder> PackBuilder<D> {
    /// Swap the image decoder
    pub fn with_decoder<E: ImageDecoder>(self, decoder: E) -> PackBuilder<E> {
        PackBuilder {
            config: self.config,
            decoder,
        }
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Ingest and decode the whole dataset.
    ///
    /// Every image is attempted; the first failure (by frame index) is
    /// reported only after all decodes finish.
    pub fn prepare(&self) -> Result<(SceneDescription, Vec<DecodedImage>)> {
        let scene = load_scene(&self.config.dataset_root, &self.config.metadata)?;
        if scene.is_empty() {
            return Err(HostPackError::BadConfig(format!(
                "{} lists no frames",
                scene.source.display()
            )));
        }

        let paths = scene.image_paths();
        let outcomes = decode_all(&self.decoder, &paths, self.config.threads)?;
        let images = collect_decoded(&paths, outcomes)?;
        Ok((scene, images))
    }

    /// Lay out an already decoded dataset into `out`
    pub fn write_pack<W: Write + Seek>(
        &self,
        scene: &SceneDescription,
        images: &[DecodedImage],
        out: W,
    ) -> Result<(W, BuildSummary)> {
        let first = images
            .first()
            .ok_or_else(|| HostPackError::BadConfig("no frames to pack".into()))?;
        let intrinsics = scene.intrinsics.resolve((first.width(), first.height()));
        let poses: Vec<Pose3x4> = scene.frames.iter().map(|f| f.pose).collect();

        let mut layout = PackLayout::new(
            out,
            self.config.pixel_format,
            self.config.row_align,
            self.config.block_align,
        );
        layout.reserve_header()?;
        layout.write_scene(self.config.aabb)?;
        layout.write_camera_table(intrinsics, &poses, images)?;
        layout.reserve_frame_table(images.len())?;
        layout.write_pixels(images)?;
        let (out, header) = layout.finish()?;

        Ok((
            out,
            BuildSummary::from_header(&header, images.len(), self.config.pixel_format),
        ))
    }

    /// Build the pack at `out_path`.
    ///
    /// The output file is only created once every image has decoded. An I/O
    /// failure after that leaves the partial file in place.
    pub fn build(&self, out_path: &Path) -> Result<BuildSummary> {
        let (scene, images) = self.prepare()?;

        let file = File::create(out_path).map_err(HostPackError::io_at(out_path))?;
        let (out, summary) = self.write_pack(&scene, &images, BufWriter::new(file))?;
        let file = out
            .into_inner()
            .map_err(|e| HostPackError::io_at(out_path)(e.into_error()))?;
        file.sync_all().map_err(HostPackError::io_at(out_path))?;

        tracing::info!(
            path = %out_path.display(),
            frames = summary.frame_count,
            bytes = summary.bytes_total,
            format = %summary.pixel_format,
            "pack written"
        );
        Ok(summary)
    }
}

/// Validate `config`, then build a pack at `out_path` with the default decoder
pub fn build_hostpack(config: &BuildConfig, out_path: &Path) -> Result<BuildSummary> {
    PackBuilder::new(config)?.build(out_path)
}
