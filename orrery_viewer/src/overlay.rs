use std::collections::HashMap;
use std::mem;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use fontdue::{Font, FontSettings};
use log::{info, warn};

use crate::texture::prepare_rgba_upload;

const FONT_SIZE_PX: f32 = 18.0;

/// System faces probed when the configured font path is unusable.
const FALLBACK_FONT_PATHS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Monaco.ttf",
];

/// Rasterized overlay font with a per-character cache. Owned by the viewer
/// state; panels borrow it while composing their pixels.
pub struct OverlayFont {
    font: Font,
    layout: GlyphLayout,
    cache: HashMap<char, GlyphBitmap>,
}

impl OverlayFont {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("reading overlay font {}", path.display()))?;
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|err| anyhow!("parsing overlay font {}: {err}", path.display()))?;
        let layout = GlyphLayout::from_font(&font, FONT_SIZE_PX);
        Ok(Self {
            font,
            layout,
            cache: HashMap::new(),
        })
    }

    /// Tries the configured path first, then the known system faces. `None`
    /// disables the text panels; the scene itself keeps rendering.
    pub fn load_or_probe(path: &Path) -> Option<Self> {
        match Self::load(path) {
            Ok(font) => return Some(font),
            Err(err) => warn!("overlay font unavailable: {err:#}"),
        }
        for candidate in FALLBACK_FONT_PATHS {
            let candidate = Path::new(candidate);
            if let Ok(font) = Self::load(candidate) {
                info!("overlay font fallback: {}", candidate.display());
                return Some(font);
            }
        }
        warn!("no overlay font found; text panels disabled");
        None
    }

    pub fn layout(&self) -> GlyphLayout {
        self.layout
    }

    fn glyph(&mut self, ch: char) -> GlyphBitmap {
        if let Some(glyph) = self.cache.get(&ch) {
            return glyph.clone();
        }
        let glyph_index = self.font.lookup_glyph_index(ch);
        let resolved = if glyph_index == 0 && ch != '?' && ch != ' ' {
            // Unmapped characters render as the question mark.
            let fallback_index = self.font.lookup_glyph_index('?');
            self.rasterize(fallback_index)
        } else {
            self.rasterize(glyph_index)
        };
        self.cache.insert(ch, resolved.clone());
        resolved
    }

    fn rasterize(&self, glyph_index: u16) -> GlyphBitmap {
        let (metrics, bitmap) = self.font.rasterize_indexed(glyph_index, FONT_SIZE_PX);
        GlyphBitmap {
            width: metrics.width as u32,
            height: metrics.height as u32,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            alpha: Arc::from(bitmap.into_boxed_slice()),
        }
    }
}

#[derive(Clone)]
struct GlyphBitmap {
    width: u32,
    height: u32,
    xmin: i32,
    ymin: i32,
    alpha: Arc<[u8]>,
}

/// Monospace cell metrics derived from the printable ASCII range once per
/// font load.
#[derive(Debug, Clone, Copy)]
pub struct GlyphLayout {
    pub line_height: u32,
    pub cell_advance: u32,
    ascent: i32,
    left_bearing: i32,
}

impl GlyphLayout {
    fn from_font(font: &Font, size: f32) -> Self {
        let mut min_xmin = i32::MAX;
        let mut max_xmax = i32::MIN;
        let mut min_ymin = i32::MAX;
        let mut max_ymax = i32::MIN;
        let mut max_advance = 0.0f32;

        for byte in 32u8..=126 {
            let ch = byte as char;
            let metrics = font.metrics_indexed(font.lookup_glyph_index(ch), size);
            max_advance = max_advance.max(metrics.advance_width);
            if metrics.width == 0 && metrics.height == 0 {
                continue;
            }
            min_xmin = min_xmin.min(metrics.xmin);
            max_xmax = max_xmax.max(metrics.xmin + metrics.width as i32);
            min_ymin = min_ymin.min(metrics.ymin);
            max_ymax = max_ymax.max(metrics.ymin + metrics.height as i32);
        }

        if min_xmin > max_xmax {
            return Self {
                line_height: 1,
                cell_advance: 1,
                ascent: 0,
                left_bearing: 0,
            };
        }

        let left_bearing = -min_xmin;
        let ascent = max_ymax;
        let descent = -min_ymin;
        let cell_width = (left_bearing + max_xmax).max(1) as u32;
        Self {
            line_height: (ascent + descent).max(1) as u32,
            cell_advance: (max_advance.max(cell_width as f32).ceil() as u32).max(1),
            ascent,
            left_bearing,
        }
    }
}

/// Fixed panel identifiers; each owns its texture and screen anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAnchor {
    TopLeft,
    TopRight,
    BottomLeft,
}

pub struct TextPanelConfig {
    pub width: u32,
    pub height: u32,
    pub padding_x: u32,
    pub padding_y: u32,
    pub anchor: PanelAnchor,
    pub label: &'static str,
}

/// A CPU-composed text surface uploaded to its own texture and drawn as a
/// screen-space quad. Redraws only when its lines change.
pub struct TextPanel {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    padding_x: u32,
    padding_y: u32,
    anchor: PanelAnchor,
    label: &'static str,
    dirty: bool,
    visible: bool,
}

impl TextPanel {
    const FG_COLOR: [u8; 4] = [235, 240, 250, 235];
    const BG_COLOR: [u8; 4] = [10, 14, 24, 190];

    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bind_group_layout: &wgpu::BindGroupLayout,
        config: TextPanelConfig,
    ) -> Self {
        let width = config.width.max(1);
        let height = config.height.max(1);
        let (texture, bind_group) =
            Self::create_resources(device, bind_group_layout, width, height, config.label);
        let mut panel = Self {
            texture,
            bind_group,
            pixels: vec![0u8; (width * height * 4) as usize],
            width,
            height,
            padding_x: config.padding_x,
            padding_y: config.padding_y,
            anchor: config.anchor,
            label: config.label,
            dirty: true,
            visible: false,
        };
        panel.fill_background();
        panel.upload(queue);
        panel
    }

    pub fn anchor(&self) -> PanelAnchor {
        self.anchor
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Recomposes the panel from `lines`, wrapping to the usable column
    /// count and truncating rows that no longer fit.
    pub fn set_lines(&mut self, font: &mut OverlayFont, lines: &[String]) {
        self.fill_background();

        let layout = font.layout();
        let usable_width = self.width.saturating_sub(self.padding_x * 2);
        let usable_height = self.height.saturating_sub(self.padding_y * 2);
        let max_cols = (usable_width / layout.cell_advance.max(1)) as usize;
        let max_rows = (usable_height / layout.line_height.max(1)) as usize;
        if max_cols == 0 || max_rows == 0 {
            self.visible = false;
            self.dirty = true;
            return;
        }

        let display_lines = wrap_lines(lines, max_cols, max_rows);
        for (row, line) in display_lines.iter().enumerate() {
            let line_top = self.padding_y + row as u32 * layout.line_height;
            for (col, ch) in line.chars().take(max_cols).enumerate() {
                if ch == '\r' {
                    continue;
                }
                let glyph = font.glyph(ch);
                let cell_x = self.padding_x + col as u32 * layout.cell_advance;
                self.blit_glyph(cell_x, line_top, &glyph, &layout);
            }
        }

        self.visible = !display_lines.is_empty();
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        self.fill_background();
        self.visible = false;
        self.dirty = true;
    }

    pub fn upload(&mut self, queue: &wgpu::Queue) {
        if !self.dirty {
            return;
        }
        let upload = match prepare_rgba_upload(self.width, self.height, &self.pixels) {
            Ok(upload) => upload,
            Err(err) => {
                warn!(
                    "{} panel upload failed ({}x{}): {err}",
                    self.label,
                    self.width,
                    self.height
                );
                return;
            }
        };
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            upload.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(upload.bytes_per_row()),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.dirty = false;
    }

    fn create_resources(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        width: u32,
        height: u32,
        label: &str,
    ) -> (wgpu::Texture, wgpu::BindGroup) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label}-panel-texture")),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label}-panel-sampler")),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}-panel-bind-group")),
            layout: bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });
        (texture, bind_group)
    }

    fn fill_background(&mut self) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&Self::BG_COLOR);
        }
    }

    fn blit_glyph(&mut self, cell_x: u32, line_top: u32, glyph: &GlyphBitmap, layout: &GlyphLayout) {
        if glyph.width == 0 || glyph.height == 0 {
            return;
        }

        let start_x = cell_x as i32 + layout.left_bearing + glyph.xmin;
        let baseline = line_top as i32 + layout.ascent;
        let start_y = baseline - (glyph.ymin + glyph.height as i32);

        for gy in 0..glyph.height {
            let dest_y = start_y + gy as i32;
            if dest_y < 0 || dest_y >= self.height as i32 {
                continue;
            }
            let source_row = gy as usize * glyph.width as usize;
            for gx in 0..glyph.width {
                let coverage = glyph.alpha[source_row + gx as usize];
                if coverage == 0 {
                    continue;
                }
                let dest_x = start_x + gx as i32;
                if dest_x < 0 || dest_x >= self.width as i32 {
                    continue;
                }
                let idx = ((dest_y as u32 * self.width + dest_x as u32) * 4) as usize;
                let alpha = ((coverage as u16 * Self::FG_COLOR[3] as u16) / u8::MAX as u16) as u8;
                self.pixels[idx..idx + 4].copy_from_slice(&[
                    Self::FG_COLOR[0],
                    Self::FG_COLOR[1],
                    Self::FG_COLOR[2],
                    alpha,
                ]);
            }
        }
    }
}

fn wrap_lines(lines: &[String], max_cols: usize, max_rows: usize) -> Vec<String> {
    if max_cols == 0 || max_rows == 0 {
        return Vec::new();
    }
    let mut result = Vec::new();
    for line in lines {
        if result.len() >= max_rows {
            break;
        }
        for segment in line.split('\n') {
            if result.len() >= max_rows {
                break;
            }
            wrap_segment(&mut result, segment, max_cols, max_rows);
        }
    }
    result
}

fn wrap_segment(out: &mut Vec<String>, segment: &str, max_cols: usize, max_rows: usize) {
    if out.len() >= max_rows {
        return;
    }
    if segment.is_empty() {
        out.push(String::new());
        return;
    }

    let mut buffer = String::new();
    let mut count = 0;
    for ch in segment.chars() {
        buffer.push(ch);
        count += 1;
        if count == max_cols {
            if out.len() >= max_rows {
                return;
            }
            out.push(mem::take(&mut buffer));
            count = 0;
        }
    }

    if count > 0 && out.len() < max_rows {
        out.push(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn long_lines_wrap_at_the_column_limit() {
        let wrapped = wrap_lines(&lines(&["abcdefgh"]), 3, 10);
        assert_eq!(wrapped, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn embedded_newlines_split_rows() {
        let wrapped = wrap_lines(&lines(&["top\nbottom", "tail"]), 10, 10);
        assert_eq!(wrapped, vec!["top", "bottom", "tail"]);
    }

    #[test]
    fn row_budget_truncates_output() {
        let wrapped = wrap_lines(&lines(&["one", "two", "three", "four"]), 10, 2);
        assert_eq!(wrapped, vec!["one", "two"]);
        // A wrapped long line eats into the same budget.
        let wrapped = wrap_lines(&lines(&["abcdef", "never"]), 2, 3);
        assert_eq!(wrapped, vec!["ab", "cd", "ef"]);
    }

    #[test]
    fn empty_segments_keep_their_blank_row() {
        let wrapped = wrap_lines(&lines(&["", "after"]), 8, 4);
        assert_eq!(wrapped, vec!["", "after"]);
    }

    #[test]
    fn zero_budget_renders_nothing() {
        assert!(wrap_lines(&lines(&["text"]), 0, 5).is_empty());
        assert!(wrap_lines(&lines(&["text"]), 5, 0).is_empty());
    }
}
