//! Decodes nokhwa capture buffers straight into the RGBA [`Frame`]s the rest
//! of the app consumes.

use std::time::Instant;

use anyhow::{Result, anyhow, ensure};
use nokhwa::{Buffer, utils::FrameFormat};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

use crate::types::Frame;

/// Decode one captured buffer. The returned frame is timestamped at decode
/// time, which is what the detector throttle keys on.
pub fn decode_frame(buffer: &Buffer) -> Result<Frame> {
    let resolution = buffer.resolution();
    let (width, height) = (resolution.width_x, resolution.height_y);
    let data = buffer.buffer();

    // MJPEG carries its own dimensions, which win over what the driver
    // reported; every other format trusts the reported resolution.
    let (rgba, width, height) = match buffer.source_frame_format() {
        FrameFormat::MJPEG => decode_mjpeg(data)?,
        FrameFormat::NV12 => (decode_nv12(data, width, height)?, width, height),
        FrameFormat::YUYV => (decode_yuyv(data, width, height)?, width, height),
        FrameFormat::RAWRGB => (expand_rgb(data, width, height, [0, 1, 2])?, width, height),
        FrameFormat::RAWBGR => (expand_rgb(data, width, height, [2, 1, 0])?, width, height),
        FrameFormat::GRAY => (expand_gray(data, width, height)?, width, height),
    };

    Ok(Frame {
        rgba,
        width,
        height,
        timestamp: Instant::now(),
    })
}

fn decode_nv12(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_len = width as usize * height as usize;
    let uv_len = y_len / 2;
    ensure!(
        data.len() >= y_len + uv_len,
        "NV12 buffer too small: got {}, expected {}",
        data.len(),
        y_len + uv_len
    );

    let planes = YuvBiPlanarImage {
        y_plane: &data[..y_len],
        y_stride: width,
        uv_plane: &data[y_len..y_len + uv_len],
        uv_stride: width,
        width,
        height,
    };

    let mut rgba = vec![0u8; y_len * 4];
    yuv_nv12_to_rgba(
        &planes,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12→RGBA failed: {err:?}"))?;

    Ok(rgba)
}

fn decode_yuyv(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    ensure!(
        data.len() >= pixels * 2,
        "YUYV buffer too small: got {}, expected {}",
        data.len(),
        pixels * 2
    );

    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };

    let mut rgba = vec![0u8; pixels * 4];
    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422→RGBA failed: {err:?}"))?;

    Ok(rgba)
}

fn decode_mjpeg(data: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;
    let info = decoder
        .info()
        .ok_or_else(|| anyhow!("MJPEG stream carried no dimensions"))?;

    let (width, height) = (info.width as u32, info.height as u32);
    let expected = width as usize * height as usize * 4;
    ensure!(
        rgba.len() >= expected,
        "MJPEG decode produced too few bytes: got {}, expected {expected}",
        rgba.len()
    );

    Ok((rgba, width, height))
}

/// Expand 3-byte pixels to opaque RGBA, reading source channels in `order`
/// (identity for RGB input, reversed for BGR).
fn expand_rgb(data: &[u8], width: u32, height: u32, order: [usize; 3]) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    ensure!(
        data.len() >= pixels * 3,
        "RGB buffer too small: got {}, expected {}",
        data.len(),
        pixels * 3
    );

    let mut rgba = vec![255u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            dst[0] = src[order[0]];
            dst[1] = src[order[1]];
            dst[2] = src[order[2]];
        });

    Ok(rgba)
}

fn expand_gray(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    ensure!(
        data.len() >= pixels,
        "GRAY buffer too small: got {}, expected {pixels}",
        data.len()
    );

    let mut rgba = vec![255u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_iter().copied())
        .for_each(|(dst, value)| {
            dst[..3].fill(value);
        });

    Ok(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nokhwa::utils::Resolution;

    #[test]
    fn bgr_channels_are_swapped() {
        let buffer = Buffer::new(
            Resolution::new(2, 1),
            &[10, 20, 30, 40, 50, 60],
            FrameFormat::RAWBGR,
        );
        let frame = decode_frame(&buffer).unwrap();
        assert_eq!((frame.width, frame.height), (2, 1));
        assert_eq!(&frame.rgba, &[30, 20, 10, 255, 60, 50, 40, 255]);
    }

    #[test]
    fn rgb_passes_through_with_opaque_alpha() {
        let buffer = Buffer::new(Resolution::new(1, 1), &[7, 8, 9], FrameFormat::RAWRGB);
        let frame = decode_frame(&buffer).unwrap();
        assert_eq!(&frame.rgba, &[7, 8, 9, 255]);
    }

    #[test]
    fn gray_replicates_across_channels() {
        let buffer = Buffer::new(Resolution::new(2, 1), &[0, 200], FrameFormat::GRAY);
        let frame = decode_frame(&buffer).unwrap();
        assert_eq!(&frame.rgba, &[0, 0, 0, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn undersized_buffer_is_rejected() {
        let buffer = Buffer::new(Resolution::new(4, 4), &[0u8; 3], FrameFormat::YUYV);
        assert!(decode_frame(&buffer).is_err());
    }
}
