use crate::gpu::GpuContext;
use fontdue::{Font, FontSettings};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Fonts tried, in order, when no font path is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read font at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse font: {0}")]
    Parse(&'static str),
}

/// The configured font if given, otherwise the first system font that exists.
pub fn find_font(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }
    SYSTEM_FONTS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

/// Opaque identifier for a loaded font.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontId(pub(crate) usize);

/// Information about a single glyph in the font atlas.
#[derive(Clone, Copy, Debug)]
pub struct GlyphInfo {
    /// UV coordinates in the atlas (x, y, width, height) normalized to [0, 1].
    pub uv: [f32; 4],
    /// Size of the glyph in pixels.
    pub width: u32,
    pub height: u32,
    /// Offset from the cursor position to where the glyph should be drawn.
    pub offset_x: f32,
    pub offset_y: f32,
    /// How far to advance the cursor after this glyph.
    pub advance: f32,
}

/// Placement of glyph bitmaps in a single-channel atlas.
#[derive(Debug, PartialEq)]
struct AtlasLayout {
    width: u32,
    height: u32,
    /// Top-left corner of each input rectangle, in input order.
    positions: Vec<(u32, u32)>,
}

impl AtlasLayout {
    const PADDING: u32 = 1;

    /// Row-pack `sizes` into the smallest power-of-two atlas (from 512×512) that holds them.
    fn pack(sizes: &[(u32, u32)]) -> Self {
        let mut width = 512u32;
        let mut height = 512u32;
        loop {
            if let Some(positions) = Self::try_pack(sizes, width, height) {
                return Self {
                    width,
                    height,
                    positions,
                };
            }
            // Double the smaller dimension
            if width <= height {
                width *= 2;
            } else {
                height *= 2;
            }
        }
    }

    fn try_pack(sizes: &[(u32, u32)], width: u32, height: u32) -> Option<Vec<(u32, u32)>> {
        let padding = Self::PADDING;
        let mut x = padding;
        let mut y = padding;
        let mut row_height = 0u32;
        let mut positions = Vec::with_capacity(sizes.len());

        for &(w, h) in sizes {
            if w + 2 * padding > width {
                return None;
            }
            if x + w + padding > width {
                x = padding;
                y += row_height + padding;
                row_height = 0;
            }
            if y + h + padding > height {
                return None;
            }
            positions.push((x, y));
            x += w + padding;
            row_height = row_height.max(h);
        }

        Some(positions)
    }
}

/// A font atlas containing pre-rasterized printable ASCII glyphs.
pub struct FontAtlas {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    glyphs: HashMap<char, GlyphInfo>,
    size: f32,
    line_height: f32,
    ascent: f32,
}

impl FontAtlas {
    /// Create a new font atlas from TTF/OTF data.
    pub fn new(gpu: &GpuContext, font_data: &[u8], size: f32) -> Result<Self, AssetError> {
        let font = Font::from_bytes(font_data, FontSettings::default()).map_err(AssetError::Parse)?;

        let rasterized: Vec<(char, fontdue::Metrics, Vec<u8>)> = (32u8..=126u8)
            .map(|b| {
                let c = b as char;
                let (metrics, bitmap) = font.rasterize(c, size);
                (c, metrics, bitmap)
            })
            .collect();

        let sizes: Vec<(u32, u32)> = rasterized
            .iter()
            .map(|(_, m, _)| (m.width as u32, m.height as u32))
            .collect();
        let layout = AtlasLayout::pack(&sizes);

        let mut atlas_data = vec![0u8; (layout.width * layout.height) as usize];
        let mut glyphs = HashMap::new();

        for ((c, metrics, bitmap), &(x, y)) in rasterized.iter().zip(&layout.positions) {
            let glyph_w = metrics.width as u32;
            let glyph_h = metrics.height as u32;

            for gy in 0..glyph_h {
                let src = (gy * glyph_w) as usize;
                let dst = ((y + gy) * layout.width + x) as usize;
                atlas_data[dst..dst + glyph_w as usize]
                    .copy_from_slice(&bitmap[src..src + glyph_w as usize]);
            }

            let uv = [
                x as f32 / layout.width as f32,
                y as f32 / layout.height as f32,
                glyph_w as f32 / layout.width as f32,
                glyph_h as f32 / layout.height as f32,
            ];

            glyphs.insert(
                *c,
                GlyphInfo {
                    uv,
                    width: glyph_w,
                    height: glyph_h,
                    offset_x: metrics.xmin as f32,
                    offset_y: metrics.ymin as f32,
                    advance: metrics.advance_width,
                },
            );
        }

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Font Atlas"),
            size: wgpu::Extent3d {
                width: layout.width,
                height: layout.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &atlas_data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(layout.width),
                rows_per_image: Some(layout.height),
            },
            wgpu::Extent3d {
                width: layout.width,
                height: layout.height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Font Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let line_metrics = font.horizontal_line_metrics(size);
        let line_height = line_metrics.map(|m| m.new_line_size).unwrap_or(size * 1.2);
        let ascent = line_metrics.map(|m| m.ascent).unwrap_or(size * 0.8);

        Ok(Self {
            texture,
            view,
            sampler,
            glyphs,
            size,
            line_height,
            ascent,
        })
    }

    /// Get glyph info for a character.
    pub fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    /// Get the font size this atlas was created with.
    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Distance from the top of a line to the baseline.
    pub fn ascent(&self) -> f32 {
        self.ascent
    }
}

/// Loaded fonts.
#[derive(Default)]
pub struct Assets {
    pub(crate) fonts: Vec<FontAtlas>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a font from a file path.
    pub fn load_font(
        &mut self,
        gpu: &GpuContext,
        path: impl AsRef<Path>,
        size: f32,
    ) -> Result<FontId, AssetError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| AssetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_font_bytes(gpu, &data, size)
    }

    /// Load a font from raw TTF/OTF bytes.
    pub fn load_font_bytes(
        &mut self,
        gpu: &GpuContext,
        data: &[u8],
        size: f32,
    ) -> Result<FontId, AssetError> {
        let atlas = FontAtlas::new(gpu, data, size)?;
        let id = FontId(self.fonts.len());
        self.fonts.push(atlas);
        Ok(id)
    }

    /// Get a font atlas by ID.
    pub fn font(&self, id: FontId) -> Option<&FontAtlas> {
        self.fonts.get(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_rows_left_to_right() {
        let layout = AtlasLayout::pack(&[(10, 12), (20, 5), (0, 0)]);
        assert_eq!((layout.width, layout.height), (512, 512));
        assert_eq!(layout.positions, vec![(1, 1), (12, 1), (33, 1)]);
    }

    #[test]
    fn wraps_to_the_next_row() {
        let layout = AtlasLayout::pack(&[(300, 10), (300, 20), (100, 5)]);
        assert_eq!(layout.positions, vec![(1, 1), (1, 12), (302, 12)]);
    }

    #[test]
    fn grows_when_glyphs_do_not_fit() {
        let sizes = vec![(100, 100); 40];
        let layout = AtlasLayout::pack(&sizes);
        assert!(layout.width * layout.height > 512 * 512);
        assert_eq!(layout.positions.len(), 40);
        for &(x, y) in &layout.positions {
            assert!(x + 100 <= layout.width && y + 100 <= layout.height);
        }
    }

    #[test]
    fn configured_font_wins_over_system_fonts() {
        let configured = Path::new("fonts/custom.ttf");
        assert_eq!(find_font(Some(configured)), Some(configured.to_path_buf()));
    }
}
