//! Offscreen render targets for the obscurance pipeline.
//!
//! Five targets at surface resolution: scene depth, camera-space positions
//! and normals (all mip-chained), the occlusion values and a scratch target
//! for the separable blur. The set is recreated wholesale on resize; nothing
//! here is touched mid-frame.

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
pub const OCCLUSION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg32Float;

/// Mip levels allocated for the chained targets: `floor(log2(max(w, h)))`,
/// never less than one. Level 0 is the native resolution.
pub fn mip_count(width: u32, height: u32) -> u32 {
    width.max(height).max(2).ilog2()
}

pub struct RenderTargets {
    width: u32,
    height: u32,
    mip_count: u32,
    depth_view: wgpu::TextureView,
    /// Whole-chain view, sampled by the occlusion pass.
    position_view: wgpu::TextureView,
    /// One single-level view per mip, used as downsample attachments.
    position_mip_views: Vec<wgpu::TextureView>,
    normal_view: wgpu::TextureView,
    occlusion_view: wgpu::TextureView,
    scratch_view: wgpu::TextureView,
}

impl RenderTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let mip_count = mip_count(width, height);

        let depth = create_target(device, "Scene Depth", width, height, mip_count, DEPTH_FORMAT);
        let position = create_target(
            device,
            "Camera Positions",
            width,
            height,
            mip_count,
            POSITION_FORMAT,
        );
        let normal = create_target(
            device,
            "Camera Normals",
            width,
            height,
            mip_count,
            NORMAL_FORMAT,
        );
        let occlusion = create_target(device, "Occlusion", width, height, 1, OCCLUSION_FORMAT);
        let scratch = create_target(
            device,
            "Occlusion Scratch",
            width,
            height,
            1,
            OCCLUSION_FORMAT,
        );

        // Attachments must be single-level views; only depth level 0 is
        // ever rendered even though the chain is allocated in full.
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor {
            base_mip_level: 0,
            mip_level_count: Some(1),
            ..Default::default()
        });
        let position_view = position.create_view(&wgpu::TextureViewDescriptor::default());
        let position_mip_views = (0..mip_count)
            .map(|level| {
                position.create_view(&wgpu::TextureViewDescriptor {
                    base_mip_level: level,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        let normal_view = normal.create_view(&wgpu::TextureViewDescriptor {
            base_mip_level: 0,
            mip_level_count: Some(1),
            ..Default::default()
        });
        let occlusion_view = occlusion.create_view(&wgpu::TextureViewDescriptor::default());
        let scratch_view = scratch.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            width,
            height,
            mip_count,
            depth_view,
            position_view,
            position_mip_views,
            normal_view,
            occlusion_view,
            scratch_view,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mip_count(&self) -> u32 {
        self.mip_count
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    pub fn position_view(&self) -> &wgpu::TextureView {
        &self.position_view
    }

    pub fn position_mip_view(&self, level: u32) -> &wgpu::TextureView {
        &self.position_mip_views[level as usize]
    }

    pub fn normal_view(&self) -> &wgpu::TextureView {
        &self.normal_view
    }

    pub fn occlusion_view(&self) -> &wgpu::TextureView {
        &self.occlusion_view
    }

    pub fn scratch_view(&self) -> &wgpu::TextureView {
        &self.scratch_view
    }

    /// Resets the occlusion target to fully lit. Stands in for the whole
    /// obscurance chain when it is switched off.
    pub fn clear_occlusion(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Occlusion Clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.occlusion_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }
}

fn create_target(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    mip_level_count: u32,
    format: wgpu::TextureFormat,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_count_720p() {
        assert_eq!(mip_count(1280, 720), 10);
    }

    #[test]
    fn test_mip_count_uses_larger_dimension() {
        assert_eq!(mip_count(720, 1280), 10);
        assert_eq!(mip_count(16, 4096), 12);
    }

    #[test]
    fn test_mip_count_rounds_down() {
        assert_eq!(mip_count(1024, 1024), 10);
        assert_eq!(mip_count(1025, 1025), 10);
        assert_eq!(mip_count(2047, 2047), 10);
    }

    #[test]
    fn test_mip_count_never_below_one() {
        assert_eq!(mip_count(1, 1), 1);
        assert_eq!(mip_count(2, 1), 1);
        assert_eq!(mip_count(3, 2), 1);
    }

    #[test]
    fn test_mip_count_within_device_limit() {
        for (w, h) in [(1, 1), (2, 2), (640, 480), (1280, 720), (1920, 1080), (3840, 2160)] {
            let full_chain = u32::max(w, h).ilog2() + 1;
            assert!(mip_count(w, h) <= full_chain);
        }
    }
}
