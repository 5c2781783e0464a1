//! 2D textures and their samplers.

use crate::error::RenderError;
use crate::gpu::GpuContext;

/// How texture coordinates outside `[0, 1]` are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextureWrap {
    #[default]
    Clamp,
    Repeat,
    Mirror,
}

impl TextureWrap {
    fn address_mode(self) -> wgpu::AddressMode {
        match self {
            TextureWrap::Clamp => wgpu::AddressMode::ClampToEdge,
            TextureWrap::Repeat => wgpu::AddressMode::Repeat,
            TextureWrap::Mirror => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// An RGBA texture with its sampler, bindable to any shader that declares
/// a texture/sampler pair.
#[derive(Debug)]
pub struct Texture {
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Uploads raw RGBA8 pixels. `data` holds `width * height * 4` bytes,
    /// rows top to bottom.
    pub fn from_rgba(
        gpu: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        wrap: TextureWrap,
        label: &str,
    ) -> Self {
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
            label: Some(&format!("{label} sampler")),
            address_mode_u: wrap.address_mode(),
            address_mode_v: wrap.address_mode(),
            address_mode_w: wrap.address_mode(),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            view,
            sampler,
            width,
            height,
        }
    }

    /// Loads and decodes an image file.
    pub fn from_file(gpu: &GpuContext, path: &str, wrap: TextureWrap) -> Result<Self, RenderError> {
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(gpu, &img, width, height, wrap, path))
    }

    /// Decodes an embedded image, e.g. from `include_bytes!`.
    pub fn from_bytes(
        gpu: &GpuContext,
        bytes: &[u8],
        wrap: TextureWrap,
        label: &str,
    ) -> Result<Self, RenderError> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(gpu, &img, width, height, wrap, label))
    }

    /// Generates a procedural wooden-crate texture: planks with darker
    /// seams and a bright border frame.
    pub fn wooden_crate(gpu: &GpuContext, size: u32, seed: u32) -> Self {
        let mut data = vec![0u8; (size * size * 4) as usize];
        let plank = size / 4;
        let border = size / 16;

        for y in 0..size {
            for x in 0..size {
                let idx = ((y * size + x) * 4) as usize;

                let on_border = x < border
                    || y < border
                    || x >= size - border
                    || y >= size - border;
                let on_seam = !on_border && y % plank < border / 2;

                let base: [u8; 3] = if on_border {
                    [168, 123, 66]
                } else if on_seam {
                    [96, 66, 32]
                } else {
                    [139, 100, 52]
                };

                // Grain follows the plank direction.
                let grain = (hash(x / 3, y, seed) % 24) as i32 - 12;

                data[idx] = (base[0] as i32 + grain).clamp(0, 255) as u8;
                data[idx + 1] = (base[1] as i32 + grain).clamp(0, 255) as u8;
                data[idx + 2] = (base[2] as i32 + grain / 2).clamp(0, 255) as u8;
                data[idx + 3] = 255;
            }
        }

        Self::from_rgba(gpu, &data, size, size, TextureWrap::Clamp, "wooden crate")
    }

    /// Generates a two-tone checkerboard, `cells` squares per side.
    pub fn checkerboard(gpu: &GpuContext, size: u32, cells: u32, light: [u8; 3], dark: [u8; 3]) -> Self {
        let mut data = vec![0u8; (size * size * 4) as usize];
        let cell = (size / cells).max(1);

        for y in 0..size {
            for x in 0..size {
                let idx = ((y * size + x) * 4) as usize;
                let colour = if (x / cell + y / cell) % 2 == 0 {
                    light
                } else {
                    dark
                };
                data[idx..idx + 3].copy_from_slice(&colour);
                data[idx + 3] = 255;
            }
        }

        Self::from_rgba(gpu, &data, size, size, TextureWrap::Repeat, "checkerboard")
    }
}

fn hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_add(x.wrapping_mul(374761393));
    h = h.wrapping_add(y.wrapping_mul(668265263));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}
