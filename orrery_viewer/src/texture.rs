use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::{Result, ensure};
use image::imageops::FilterType;
use log::warn;
use orrery_scene::TexturePoolView;
use walkdir::WalkDir;

/// Planet textures are resampled onto square layers of this size so the
/// whole pool uploads as a single texture array.
pub const POOL_LAYER_SIZE: u32 = 256;

/// Upper bound on pool slots; extra files in the texture directory are
/// ignored.
pub const POOL_CAP: usize = 9;

/// One pool slot in CPU memory. `loaded` is false when the slot carries a
/// procedural swatch instead of the real asset.
pub struct PlanetPixels {
    pub name: String,
    pub data: Vec<u8>,
    pub loaded: bool,
}

/// The shared planet texture pool. Loading never fails hard: decode errors
/// and a missing directory degrade to swatch slots, and the caller surfaces
/// a notice when nothing real loaded.
pub struct TexturePool {
    pub slots: Vec<PlanetPixels>,
}

impl TexturePool {
    pub fn load_from_dir(dir: &Path) -> Self {
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("png"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        paths.truncate(POOL_CAP);

        if paths.is_empty() {
            warn!(
                "no planet textures found under {}; using swatch pool",
                dir.display()
            );
            let slots = (0..POOL_CAP)
                .map(|slot| PlanetPixels {
                    name: format!("swatch-{slot}"),
                    data: swatch_pixels(slot),
                    loaded: false,
                })
                .collect();
            return Self { slots };
        }

        let slots = paths
            .iter()
            .enumerate()
            .map(|(slot, path)| {
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("slot-{slot}"));
                match image::open(path) {
                    Ok(decoded) => {
                        let layer = decoded
                            .resize_exact(POOL_LAYER_SIZE, POOL_LAYER_SIZE, FilterType::Triangle)
                            .to_rgba8();
                        PlanetPixels {
                            name,
                            data: layer.into_raw(),
                            loaded: true,
                        }
                    }
                    Err(err) => {
                        warn!(
                            "failed to decode planet texture {}: {err}; using swatch",
                            path.display()
                        );
                        PlanetPixels {
                            name,
                            data: swatch_pixels(slot),
                            loaded: false,
                        }
                    }
                }
            })
            .collect();
        Self { slots }
    }

    pub fn view(&self) -> TexturePoolView {
        TexturePoolView::new(self.slots.iter().map(|slot| slot.loaded).collect())
    }

    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.loaded).count()
    }

    /// True when not a single real texture decoded; the viewer shows a
    /// notice and planets wear swatches.
    pub fn is_fallback_only(&self) -> bool {
        self.loaded_count() == 0
    }
}

/// Deterministic banded fill standing in for a failed or missing texture.
/// Each slot gets its own palette so fallbacks stay tellable apart.
fn swatch_pixels(slot: usize) -> Vec<u8> {
    let mut data = vec![0u8; (POOL_LAYER_SIZE * POOL_LAYER_SIZE * 4) as usize];
    let seed = (slot as u8).wrapping_mul(41).wrapping_add(23);
    for (idx, pixel) in data.chunks_exact_mut(4).enumerate() {
        let x = idx as u32 % POOL_LAYER_SIZE;
        let y = idx as u32 / POOL_LAYER_SIZE;
        let band = (((x + y * 2) / 24) % 5) as u8;
        pixel[0] = seed.wrapping_add(band.wrapping_mul(31)) | 0x20;
        pixel[1] = seed.wrapping_mul(3).wrapping_add(band.wrapping_mul(17)) | 0x20;
        pixel[2] = seed.wrapping_mul(7).wrapping_add(band.wrapping_mul(11)) | 0x20;
        pixel[3] = 0xFF;
    }
    data
}

pub struct TextureUpload<'a> {
    data: Cow<'a, [u8]>,
    bytes_per_row: u32,
}

impl<'a> TextureUpload<'a> {
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.bytes_per_row
    }
}

/// Pads RGBA rows out to wgpu's copy alignment when needed; aligned data is
/// passed through without copying.
pub fn prepare_rgba_upload<'a>(width: u32, height: u32, data: &'a [u8]) -> Result<TextureUpload<'a>> {
    ensure!(width > 0 && height > 0, "texture has no dimensions");
    let row_bytes = 4usize * width as usize;
    let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    ensure!(
        data.len() >= row_bytes * height as usize,
        "texture buffer ({}) smaller than {}x{} RGBA ({})",
        data.len(),
        width,
        height,
        row_bytes * height as usize
    );

    if row_bytes % alignment == 0 && data.len() == row_bytes * height as usize {
        return Ok(TextureUpload {
            data: Cow::Borrowed(data),
            bytes_per_row: row_bytes as u32,
        });
    }

    let padded_row_bytes = row_bytes.div_ceil(alignment) * alignment;
    let mut buffer = vec![0u8; padded_row_bytes * height as usize];
    for row in 0..height as usize {
        let src_offset = row * row_bytes;
        let dst_offset = row * padded_row_bytes;
        buffer[dst_offset..dst_offset + row_bytes]
            .copy_from_slice(&data[src_offset..src_offset + row_bytes]);
    }

    Ok(TextureUpload {
        data: Cow::Owned(buffer),
        bytes_per_row: padded_row_bytes as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_png(path: &Path, shade: u8) {
        let pixels = image::RgbaImage::from_pixel(4, 4, image::Rgba([shade, 64, 128, 255]));
        pixels.save(path).expect("write test png");
    }

    #[test]
    fn aligned_rows_pass_through_unpadded() {
        let width = 64u32;
        let height = 2u32;
        let data = vec![0xABu8; (width * height * 4) as usize];
        let upload = prepare_rgba_upload(width, height, &data).expect("prepare upload");
        assert_eq!(upload.bytes_per_row(), width * 4);
        assert_eq!(upload.pixels().len(), data.len());
    }

    #[test]
    fn unaligned_rows_are_padded_to_the_copy_alignment() {
        let width = 33u32;
        let height = 3u32;
        let data: Vec<u8> = (0..(width * height * 4)).map(|v| v as u8).collect();
        let upload = prepare_rgba_upload(width, height, &data).expect("prepare upload");
        assert_eq!(
            upload.bytes_per_row() % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT,
            0
        );
        let row_bytes = (width * 4) as usize;
        let padded = upload.bytes_per_row() as usize;
        for row in 0..height as usize {
            let src = &data[row * row_bytes..(row + 1) * row_bytes];
            let dst = &upload.pixels()[row * padded..row * padded + row_bytes];
            assert_eq!(src, dst);
        }
    }

    #[test]
    fn undersized_buffers_are_rejected() {
        let data = vec![0u8; 8];
        assert!(prepare_rgba_upload(4, 4, &data).is_err());
    }

    #[test]
    fn pool_loads_pngs_in_name_order_and_resamples() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write_png(&dir.path().join("b_gas_giant.png"), 10);
        write_png(&dir.path().join("a_rocky.png"), 200);
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write decoy");

        let pool = TexturePool::load_from_dir(dir.path());
        assert_eq!(pool.slots.len(), 2);
        assert_eq!(pool.slots[0].name, "a_rocky");
        assert_eq!(pool.slots[1].name, "b_gas_giant");
        assert_eq!(pool.loaded_count(), 2);
        assert!(!pool.is_fallback_only());
        for slot in &pool.slots {
            assert_eq!(
                slot.data.len(),
                (POOL_LAYER_SIZE * POOL_LAYER_SIZE * 4) as usize
            );
        }
        assert!(pool.view().is_loaded(0) && pool.view().is_loaded(1));
    }

    #[test]
    fn corrupt_png_degrades_to_a_swatch_slot() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write_png(&dir.path().join("a_fine.png"), 10);
        fs::write(dir.path().join("b_broken.png"), b"not a png").expect("write garbage");

        let pool = TexturePool::load_from_dir(dir.path());
        assert_eq!(pool.slots.len(), 2);
        assert!(pool.slots[0].loaded);
        assert!(!pool.slots[1].loaded);
        // The swatch still fills a full layer so array uploads stay uniform.
        assert_eq!(
            pool.slots[1].data.len(),
            (POOL_LAYER_SIZE * POOL_LAYER_SIZE * 4) as usize
        );
        let view = pool.view();
        assert!(view.is_loaded(0));
        assert!(!view.is_loaded(1));
    }

    #[test]
    fn empty_directory_yields_a_full_swatch_pool() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let pool = TexturePool::load_from_dir(dir.path());
        assert_eq!(pool.slots.len(), POOL_CAP);
        assert!(pool.is_fallback_only());
        assert!(!pool.view().any_loaded());
    }

    #[test]
    fn swatches_differ_per_slot_and_are_deterministic() {
        assert_eq!(swatch_pixels(3), swatch_pixels(3));
        assert_ne!(swatch_pixels(0), swatch_pixels(1));
    }
}
