use std::path::{Path, PathBuf};

use crate::gpu::GpuContext;

/// Failures while reading, decoding or uploading a texture image.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to read texture at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode texture at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("texture worker for {path} exited without a result")]
    WorkerLost { path: PathBuf },
    #[error("{label} is {width}x{height}, the device accepts 1 to {max} pixels per side")]
    Size {
        label: &'static str,
        width: u32,
        height: u32,
        max: u32,
    },
}

/// The fixed set of textures the viewer can put on the object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextureKey {
    #[default]
    Space,
    Earth,
    AmbientOcclusion,
    BaseColor,
    Height,
    Metallic,
    Normal,
    Opacity,
    Roughness,
}

impl TextureKey {
    pub const ALL: [TextureKey; 9] = [
        TextureKey::Space,
        TextureKey::Earth,
        TextureKey::AmbientOcclusion,
        TextureKey::BaseColor,
        TextureKey::Height,
        TextureKey::Metallic,
        TextureKey::Normal,
        TextureKey::Opacity,
        TextureKey::Roughness,
    ];

    /// Dropdown labels, in [`TextureKey::ALL`] order.
    pub const LABELS: [&'static str; 9] = [
        "Space",
        "Earth",
        "Ambient_Occlusion",
        "Base_Color",
        "Height",
        "Metallic",
        "Normal",
        "Opacity",
        "Roughness",
    ];

    pub fn index(self) -> usize {
        match self {
            TextureKey::Space => 0,
            TextureKey::Earth => 1,
            TextureKey::AmbientOcclusion => 2,
            TextureKey::BaseColor => 3,
            TextureKey::Height => 4,
            TextureKey::Metallic => 5,
            TextureKey::Normal => 6,
            TextureKey::Opacity => 7,
            TextureKey::Roughness => 8,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        Self::LABELS[self.index()]
    }

    /// Image path relative to the asset root.
    pub fn path(self) -> &'static str {
        match self {
            TextureKey::Space => "Textures/texture.jpg",
            TextureKey::Earth => "Textures/texture2.jpg",
            TextureKey::AmbientOcclusion => "Metal_Mesh/Metal_Mesh_002_ambientOcclusion.jpg",
            TextureKey::BaseColor => "Metal_Mesh/Metal_Mesh_002_basecolor.jpg",
            TextureKey::Height => "Metal_Mesh/Metal_Mesh_002_height.png",
            TextureKey::Metallic => "Metal_Mesh/Metal_Mesh_002_metallic.jpg",
            TextureKey::Normal => "Metal_Mesh/Metal_Mesh_002_normal.jpg",
            TextureKey::Opacity => "Metal_Mesh/Metal_Mesh_002_opacity.jpg",
            TextureKey::Roughness => "Metal_Mesh/Metal_Mesh_002_roughness.jpg",
        }
    }

    /// Every key paired with its full path under `root`.
    pub fn manifest(root: &Path) -> Vec<(TextureKey, PathBuf)> {
        Self::ALL
            .iter()
            .map(|&key| (key, root.join(key.path())))
            .collect()
    }
}

/// Tightly packed RGBA8 pixels produced by a decode worker.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    /// Read and decode an image file into RGBA8.
    pub fn open(path: &Path) -> Result<Self, TextureError> {
        let bytes = std::fs::read(path).map_err(|source| TextureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let img = image::load_from_memory(&bytes)
            .map_err(|source| TextureError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            rgba: img.into_raw(),
            width,
            height,
        })
    }
}

/// A GPU texture that can be bound to shaders.
///
/// Always a single mip level sampled with nearest-neighbour filtering and
/// repeat addressing.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from raw RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// Upload a decoded image for `key`, rejecting sizes the device cannot hold.
    pub fn from_decoded(
        gpu: &GpuContext,
        key: TextureKey,
        image: &DecodedImage,
    ) -> Result<Self, TextureError> {
        let max = gpu.device.limits().max_texture_dimension_2d;
        check_size(key, image, max)?;
        Ok(Self::from_rgba(
            gpu,
            &image.rgba,
            image.width,
            image.height,
            key.label(),
        ))
    }

    /// A 1×1 white texture, bound while the requested map is unavailable.
    pub fn white(gpu: &GpuContext) -> Self {
        Self::from_rgba(gpu, &[255, 255, 255, 255], 1, 1, "White Texture")
    }
}

/// Both sides must be non-zero and at most `max`.
fn check_size(key: TextureKey, image: &DecodedImage, max: u32) -> Result<(), TextureError> {
    let fits = |side: u32| (1..=max).contains(&side);
    if fits(image.width) && fits(image.height) {
        Ok(())
    } else {
        Err(TextureError::Size {
            label: key.label(),
            width: image.width,
            height: image.height,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> DecodedImage {
        DecodedImage {
            rgba: Vec::new(),
            width,
            height,
        }
    }

    #[test]
    fn sizes_beyond_the_device_limit_are_rejected() {
        assert!(check_size(TextureKey::Space, &blank(8192, 1024), 8192).is_ok());
        assert!(check_size(TextureKey::Space, &blank(1, 1), 8192).is_ok());

        let err = check_size(TextureKey::Earth, &blank(9000, 9000), 8192).unwrap_err();
        assert!(matches!(
            err,
            TextureError::Size {
                width: 9000,
                height: 9000,
                max: 8192,
                ..
            }
        ));
        assert!(err.to_string().contains("9000x9000"));
        assert!(check_size(TextureKey::Earth, &blank(0, 16), 8192).is_err());
    }

    #[test]
    fn labels_follow_key_order() {
        for (i, key) in TextureKey::ALL.iter().enumerate() {
            assert_eq!(key.index(), i);
            assert_eq!(TextureKey::from_index(i), Some(*key));
        }
        assert_eq!(TextureKey::AmbientOcclusion.label(), "Ambient_Occlusion");
        assert_eq!(TextureKey::from_index(9), None);
    }

    #[test]
    fn manifest_joins_asset_root() {
        let manifest = TextureKey::manifest(Path::new("static"));
        assert_eq!(manifest.len(), 9);
        assert_eq!(
            manifest[4],
            (
                TextureKey::Height,
                Path::new("static").join("Metal_Mesh/Metal_Mesh_002_height.png")
            )
        );
    }

    #[test]
    fn open_reports_missing_file_as_read_error() {
        let path = std::env::temp_dir().join("shape-lab-no-such-image.png");
        let err = DecodedImage::open(&path).unwrap_err();
        assert!(matches!(err, TextureError::Read { .. }));
    }
}
