use std::path::{Path, PathBuf};

use brickyard_shared::block::{BlockRegistry, BlockType};
use brickyard_shared::coords::Face;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AtlasBuildError {
    #[error("failed to read atlas {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode atlas {}: {source}", path.display())]
    DecodeImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Loads the atlas image and lays it out the way the block registry's
/// rectangles expect: the rectangles count rows from the bottom, so the image
/// is flipped to put row zero at the bottom of texture space.
pub fn load_atlas_image(path: &Path, registry: &BlockRegistry) -> Result<RgbaImage, AtlasBuildError> {
    let bytes = std::fs::read(path).map_err(|source| AtlasBuildError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = image::load_from_memory(&bytes).map_err(|source| AtlasBuildError::DecodeImage {
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height) = registry.atlas_size();
    let mut rgba = decoded.to_rgba8();
    if rgba.dimensions() != (width, height) {
        warn!(
            "Atlas {} is {}x{}, expected {width}x{height}; resizing",
            path.display(),
            rgba.width(),
            rgba.height()
        );
        rgba = imageops::resize(&rgba, width, height, FilterType::Nearest);
    }
    imageops::flip_vertical_in_place(&mut rgba);
    Ok(rgba)
}

/// Paints every registered face rectangle with a flat, lightly dithered block
/// colour. Used when no atlas image is available.
pub fn generate_fallback_atlas(registry: &BlockRegistry) -> RgbaImage {
    let (width, height) = registry.atlas_size();
    let mut atlas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));

    for (block, texture) in registry.registered() {
        for face in Face::ALL {
            let rect = texture.face(face);
            let base = fallback_color(block, face);
            for y in rect.y..(rect.y + rect.height).min(height) {
                for x in rect.x..(rect.x + rect.width).min(width) {
                    let shade = if (x / 4 + y / 4) % 2 == 0 { 0 } else { 18 };
                    let [r, g, b] = base.map(|c| c.saturating_sub(shade));
                    atlas.put_pixel(x, y, Rgba([r, g, b, 255]));
                }
            }
        }
    }
    atlas
}

fn fallback_color(block: BlockType, face: Face) -> [u8; 3] {
    match (block, face) {
        (BlockType::Grass, Face::Top | Face::Bottom) => [96, 168, 64],
        (BlockType::Grass, _) => [120, 140, 70],
        (BlockType::Dirt, _) => [134, 96, 67],
        (BlockType::Stone, _) => [128, 128, 128],
        (BlockType::Sand, _) => [219, 207, 163],
        (BlockType::Wood, _) => [150, 111, 51],
        (BlockType::Air, _) => [0, 0, 0],
    }
}

/// Configured atlas if it loads, generated atlas otherwise.
pub fn prepare_atlas_image(path: Option<&Path>, registry: &BlockRegistry) -> RgbaImage {
    let Some(path) = path else {
        info!("No atlas path configured; using generated block colours");
        return generate_fallback_atlas(registry);
    };

    match load_atlas_image(path, registry) {
        Ok(image) => {
            info!("Loaded block atlas from {}", path.display());
            image
        }
        Err(err) => {
            warn!("{err}; using generated block colours");
            generate_fallback_atlas(registry)
        }
    }
}

pub fn create_atlas_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    atlas_image: &RgbaImage,
) -> (wgpu::Texture, wgpu::TextureView, wgpu::Sampler) {
    let (width, height) = atlas_image.dimensions();
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let atlas_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Block Atlas Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &atlas_texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        atlas_image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        size,
    );

    let atlas_view = atlas_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let atlas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Block Atlas Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    (atlas_texture, atlas_view, atlas_sampler)
}

#[cfg(test)]
mod tests {
    use brickyard_shared::block::register_default_blocks;

    use super::*;

    #[test]
    fn fallback_atlas_covers_every_registered_rect() {
        let registry = register_default_blocks();
        let atlas = generate_fallback_atlas(&registry);
        assert_eq!(atlas.dimensions(), registry.atlas_size());

        for (_, texture) in registry.registered() {
            for rect in texture.faces {
                let corner = atlas.get_pixel(rect.x, rect.y);
                assert_eq!(corner[3], 255);
                let far = atlas.get_pixel(rect.x + rect.width - 1, rect.y + rect.height - 1);
                assert_eq!(far[3], 255);
            }
        }
        // (96, 0) is not used by any default block.
        assert_eq!(atlas.get_pixel(96, 0)[3], 0);
    }

    #[test]
    fn loaded_atlas_is_flipped_and_resized() {
        let registry = register_default_blocks();
        let path = std::env::temp_dir().join(format!(
            "brickyard-atlas-test-{}.png",
            std::process::id()
        ));

        let mut source = RgbaImage::from_pixel(64, 64, Rgba([0, 0, 255, 255]));
        for x in 0..64 {
            source.put_pixel(x, 0, Rgba([255, 0, 0, 255]));
        }
        source.save(&path).expect("write png");

        let atlas = load_atlas_image(&path, &registry).expect("load atlas");
        let _ = std::fs::remove_file(&path);

        assert_eq!(atlas.dimensions(), (128, 128));
        assert_eq!(*atlas.get_pixel(10, 127), Rgba([255, 0, 0, 255]));
        assert_eq!(*atlas.get_pixel(10, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn missing_atlas_falls_back_to_generated_colours() {
        let registry = register_default_blocks();
        let missing = Path::new("definitely/not/here/atlas.png");
        assert!(matches!(
            load_atlas_image(missing, &registry),
            Err(AtlasBuildError::ReadFile { .. })
        ));

        let atlas = prepare_atlas_image(Some(missing), &registry);
        assert_eq!(atlas, generate_fallback_atlas(&registry));
    }
}
