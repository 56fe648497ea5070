use std::sync::Arc;

use crate::assets::decode::RasterImage;
use crate::foundation::core::{Affine, Canvas, FrameRGBA};
use crate::foundation::error::{ReelError, ReelResult};
use crate::synth::transition::Placement;

/// Draws one raster onto a fixed canvas at arbitrary placements, reusing its render context and
/// target between frames.
pub(crate) struct Compositor {
    ctx: vello_cpu::RenderContext,
    target: vello_cpu::Pixmap,
    paint: vello_cpu::Image,
    image_w: u32,
    image_h: u32,
    canvas: Canvas,
    background: [u8; 4],
}

impl Compositor {
    pub(crate) fn new(
        canvas: Canvas,
        background: [u8; 4],
        image: &RasterImage,
    ) -> ReelResult<Self> {
        canvas.validate()?;
        if image.width == 0 || image.height == 0 {
            return Err(ReelError::validation("source image must be non-empty"));
        }
        let pixmap = pixmap_from_premul_bytes(&image.rgba8_premul, image.width, image.height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        let (w, h) = canvas_u16(canvas)?;
        Ok(Self {
            ctx: vello_cpu::RenderContext::new(w, h),
            target: vello_cpu::Pixmap::new(w, h),
            paint,
            image_w: image.width,
            image_h: image.height,
            canvas,
            background,
        })
    }

    pub(crate) fn image_size(&self) -> (u32, u32) {
        (self.image_w, self.image_h)
    }

    /// Opaque background, then the raster under `placement`.
    pub(crate) fn compose(&mut self, placement: Placement) -> FrameRGBA {
        let [r, g, b, _] = self.background;
        let (cw, ch) = (f64::from(self.canvas.width), f64::from(self.canvas.height));

        self.target.data_as_u8_slice_mut().fill(0);
        self.ctx.reset();
        self.ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, 255));
        self.ctx
            .fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, cw, ch));

        self.ctx.set_transform(affine_to_cpu(placement.to_affine()));
        self.ctx.set_paint(self.paint.clone());
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.image_w),
            f64::from(self.image_h),
        ));

        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut self.target);

        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.target.data_as_u8_slice().to_vec(),
            premultiplied: true,
        }
    }
}

fn canvas_u16(canvas: Canvas) -> ReelResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| ReelError::validation("canvas width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| ReelError::validation("canvas height exceeds u16"))?;
    Ok((w, h))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ReelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelError::validation("source image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelError::validation("source image height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ReelError::validation("source image byte len mismatch"));
    }
    // Pixmap stores PremulRgba8; our bytes are already premultiplied.
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}
