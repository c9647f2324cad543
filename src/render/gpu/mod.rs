//! wgpu compute backend.
//!
//! Surfaces travel as storage buffers of display-encoded RGBA `f32` pixels and come back into
//! the caller's [`Surface`] so the frame cache stays backend-agnostic. Per pass:
//!
//! - geometry: resampling, lens warp and chromatic aberration run on the GPU. The anti-alias
//!   box prefilter for large reductions runs on the CPU first.
//! - master, HSL and curve: fully on the GPU.
//! - detail: CPU. Every operator in it is a blur difference.
//! - film: the colour grade (LUT, matrix, tone, response, cast, fade) runs on the GPU. Grain
//!   and defects follow on the CPU because their hashes are 64-bit.
//! - optics: halation and bloom maps are blurred on the CPU. The screen blend, vignette and
//!   vignette correction run on the GPU.
//!
//! Surfaces larger than the adapter's storage binding limit take the CPU path.

mod kernels;
mod shaders;

use std::sync::{Arc, Mutex, PoisonError};

use wgpu::util::DeviceExt as _;

use crate::foundation::cancel::CancellationToken;
use crate::foundation::core::Surface;
use crate::foundation::error::{FilmError, FilmResult};
use crate::render::backend::{BackendKind, RendererBackend};
use crate::render::blur::box_blur;
use crate::render::geometry::GeometryPlan;
use crate::render::passes::{PassUniforms, run_pass_cpu};

use kernels::{Kernel, KernelParams};

const WORKGROUP_SIZE: u32 = 256;
const MAX_WORKGROUPS_PER_DIM: u32 = 65_535;

struct GpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layout: wgpu::BindGroupLayout,
    pipelines: Vec<wgpu::ComputePipeline>,
    max_texture_size: u32,
    max_binding_bytes: u64,
}

/// GPU backend. The device is created on [`RendererBackend::warm_up`].
pub struct GpuBackend {
    max_texture_size: u32,
    device: Mutex<Option<Arc<GpuDevice>>>,
}

impl std::fmt::Debug for GpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBackend")
            .field("max_texture_size", &self.max_texture_size)
            .finish_non_exhaustive()
    }
}

impl GpuBackend {
    /// Backend capped at `max_texture_size` (further capped by the adapter once warm).
    pub fn new(max_texture_size: u32) -> Self {
        Self {
            max_texture_size,
            device: Mutex::new(None),
        }
    }

    fn device(&self) -> FilmResult<Arc<GpuDevice>> {
        let mut slot = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(d) = slot.as_ref() {
            return Ok(Arc::clone(d));
        }
        let d = Arc::new(GpuDevice::create()?);
        *slot = Some(Arc::clone(&d));
        Ok(d)
    }
}

/// Workgroup grid for `pixel_count` invocations, split over two dimensions when needed.
fn dispatch_grid(pixel_count: u32) -> FilmResult<(u32, u32)> {
    let groups = pixel_count.div_ceil(WORKGROUP_SIZE);
    let (gx, gy) = if groups <= MAX_WORKGROUPS_PER_DIM {
        (groups.max(1), 1)
    } else {
        let side = (f64::from(groups).sqrt().ceil() as u32).min(MAX_WORKGROUPS_PER_DIM);
        (side, groups.div_ceil(side))
    };
    if gy > MAX_WORKGROUPS_PER_DIM {
        return Err(FilmError::validation(format!(
            "{pixel_count} pixels exceed the gpu dispatch grid"
        )));
    }
    Ok((gx, gy))
}

fn surface_bytes(pixels: usize) -> u64 {
    (pixels * 4 * std::mem::size_of::<f32>()) as u64
}

impl GpuDevice {
    fn create() -> FilmResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                FilmError::context_unavailable("no gpu adapter available")
            }
            other => {
                FilmError::context_unavailable(format!("wgpu request_adapter failed: {other:?}"))
            }
        })?;

        let adapter_limits = adapter.limits();
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
            max_buffer_size: adapter_limits.max_buffer_size,
            max_texture_dimension_2d: adapter_limits.max_texture_dimension_2d,
            ..wgpu::Limits::default()
        };
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("filmlab"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| {
            FilmError::context_unavailable(format!("wgpu request_device failed: {e:?}"))
        })?;

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("filmlab_kernel_layout"),
            entries: &[
                storage(0, true),
                storage(1, false),
                storage(2, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("filmlab_kernel_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipelines: Vec<_> = Kernel::ALL
            .iter()
            .map(|kernel| {
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(kernel.label()),
                    source: wgpu::ShaderSource::Wgsl(kernel.source().into()),
                });
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(kernel.label()),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: Some("main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                })
            })
            .collect();
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(FilmError::Other(anyhow::anyhow!("gpu kernels failed to build: {err}")));
        }

        let info = adapter.get_info();
        tracing::debug!(adapter = %info.name, backend = ?info.backend, "gpu device ready");
        Ok(Self {
            device,
            queue,
            layout,
            pipelines,
            max_texture_size: limits.max_texture_dimension_2d,
            max_binding_bytes: u64::from(limits.max_storage_buffer_binding_size),
        })
    }

    /// Whether buffers for `src_pixels` in, `dst_pixels` out and `aux_len` floats fit.
    fn fits(&self, src_pixels: usize, dst_pixels: usize, aux_len: usize) -> bool {
        let aux = (aux_len * std::mem::size_of::<f32>()) as u64;
        surface_bytes(src_pixels).max(surface_bytes(dst_pixels)).max(aux) <= self.max_binding_bytes
    }

    /// Run `kernel` over every pixel of a `size` output, reading `input` and `aux`.
    fn dispatch(
        &self,
        kernel: Kernel,
        input: &Surface,
        size: (u32, u32),
        aux: &[f32],
        mut params: KernelParams,
        output: &mut Surface,
    ) -> FilmResult<()> {
        let (width, height) = size;
        let pixel_count = width
            .checked_mul(height)
            .ok_or_else(|| FilmError::validation("surface too large for gpu dispatch"))?;
        let (gx, gy) = dispatch_grid(pixel_count)?;
        params.grid = [pixel_count, width, height, gx];
        let bytes = surface_bytes(pixel_count as usize);
        // Zero-sized bindings are invalid; unused aux gets one padding float.
        let aux: &[f32] = if aux.is_empty() { &[0.0] } else { aux };

        let d = &self.device;
        d.push_error_scope(wgpu::ErrorFilter::Validation);
        let src = d.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("filmlab_src"),
            contents: bytemuck::cast_slice(&input.data),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let dst = d.create_buffer(&wgpu::BufferDescriptor {
            label: Some("filmlab_dst"),
            size: bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let aux_buf = d.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("filmlab_aux"),
            contents: bytemuck::cast_slice(aux),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let param_buf = d.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("filmlab_params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let readback = d.create_buffer(&wgpu::BufferDescriptor {
            label: Some("filmlab_readback"),
            size: bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = d.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.label()),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: src.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dst.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: aux_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: param_buf.as_entire_binding(),
                },
            ],
        });

        let mut encoder = d.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(kernel.label()),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.label()),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipelines[kernel.index()]);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(gx, gy, 1);
        }
        encoder.copy_buffer_to_buffer(&dst, 0, &readback, 0, bytes);
        self.queue.submit(Some(encoder.finish()));
        if let Some(err) = pollster::block_on(d.pop_error_scope()) {
            return Err(FilmError::Other(anyhow::anyhow!(
                "gpu {} pass rejected: {err}",
                kernel.label()
            )));
        }

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        d.poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| FilmError::Other(anyhow::anyhow!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| FilmError::Other(anyhow::anyhow!("readback channel closed")))?
            .map_err(|e| FilmError::Other(anyhow::anyhow!("readback map failed: {e:?}")))?;

        let mapped = slice.get_mapped_range();
        output.reshape(width, height);
        output.data.copy_from_slice(bytemuck::cast_slice(&mapped));
        drop(mapped);
        readback.unmap();
        Ok(())
    }

    /// Same-size pass over `input` when the buffers fit; `Ok(false)` asks for the CPU path.
    fn try_pixel_pass(
        &self,
        kernel: Kernel,
        input: &Surface,
        aux: &[f32],
        params: KernelParams,
        output: &mut Surface,
    ) -> FilmResult<bool> {
        let pixels = input.data.len() / 4;
        if !self.fits(pixels, pixels, aux.len()) {
            tracing::debug!(kernel = kernel.label(), pixels, "exceeds gpu binding limit");
            return Ok(false);
        }
        let size = (input.width, input.height);
        self.dispatch(kernel, input, size, aux, params, output)?;
        Ok(true)
    }

    fn run_geometry(
        &self,
        plan: &GeometryPlan,
        src: &Surface,
        output: &mut Surface,
        cancel: &CancellationToken,
    ) -> FilmResult<bool> {
        let (out_w, out_h) = plan.output_size();
        let dst_pixels = out_w as usize * out_h as usize;
        if !self.fits(src.data.len() / 4, dst_pixels, 0) {
            tracing::debug!(dst_pixels, "geometry exceeds gpu binding limit");
            return Ok(false);
        }
        let prefiltered;
        let src = match plan.prefilter_radius() {
            0 => src,
            radius => {
                prefiltered = Surface {
                    width: src.width,
                    height: src.height,
                    data: box_blur(&src.data, src.width, src.height, 4, radius)?,
                };
                cancel.check()?;
                &prefiltered
            }
        };
        let params = kernels::pack_geometry(plan);
        self.dispatch(Kernel::Geometry, src, (out_w, out_h), &[], params, output)?;
        Ok(true)
    }

    fn run_pass(
        &self,
        pass: PassUniforms<'_>,
        input: &Surface,
        output: &mut Surface,
        cancel: &CancellationToken,
    ) -> FilmResult<bool> {
        match pass {
            PassUniforms::Master(u) => {
                let params = kernels::pack_master(u);
                self.try_pixel_pass(Kernel::Master, input, &[], params, output)
            }
            PassUniforms::Hsl(u) => {
                let params = kernels::pack_hsl(u);
                self.try_pixel_pass(Kernel::Hsl, input, &[], params, output)
            }
            PassUniforms::Curve(u) => {
                let (params, tables) = kernels::pack_curve(u);
                self.try_pixel_pass(Kernel::Curve, input, &tables, params, output)
            }
            PassUniforms::Film(u) => {
                if u.grade_is_identity() {
                    output.copy_from(input);
                } else {
                    let (params, cube) = kernels::pack_film_grade(u);
                    if !self.try_pixel_pass(Kernel::FilmGrade, input, cube, params, output)? {
                        return Ok(false);
                    }
                }
                cancel.check()?;
                u.apply_stochastic(output);
                Ok(true)
            }
            PassUniforms::Optics(u) => {
                let pixels = input.data.len() / 4;
                let glows = usize::from(u.halation.is_some()) + usize::from(u.bloom.is_some());
                if !self.fits(pixels, pixels, pixels * 3 * glows) {
                    return Ok(false);
                }
                let (halo, bloom) = u.glow_maps(input, cancel)?;
                let (params, maps) = kernels::pack_optics(u, halo.as_deref(), bloom.as_deref());
                self.try_pixel_pass(Kernel::Optics, input, &maps, params, output)
            }
            PassUniforms::Detail(_) => Ok(false),
        }
    }
}

impl RendererBackend for GpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn warm_up(&self) -> FilmResult<()> {
        self.device().map(|_| ())
    }

    fn max_texture_size(&self) -> u32 {
        let slot = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(d) => self.max_texture_size.min(d.max_texture_size),
            None => self.max_texture_size,
        }
    }

    fn run_geometry(
        &self,
        plan: &GeometryPlan,
        src: &Surface,
        output: &mut Surface,
        cancel: &CancellationToken,
    ) -> FilmResult<()> {
        plan.check_source(src)?;
        cancel.check()?;
        if plan.is_identity() || src.data.is_empty() {
            output.copy_from(src);
            return Ok(());
        }
        if self.device()?.run_geometry(plan, src, output, cancel)? {
            return cancel.check();
        }
        plan.execute_into(src, output, cancel)
    }

    fn run_pass(
        &self,
        pass: PassUniforms<'_>,
        input: &Surface,
        output: &mut Surface,
        cancel: &CancellationToken,
    ) -> FilmResult<()> {
        cancel.check()?;
        if pass.is_identity() || input.data.is_empty() {
            return run_pass_cpu(pass, input, output, cancel);
        }
        if self.device()?.run_pass(pass, input, output, cancel)? {
            return Ok(());
        }
        run_pass_cpu(pass, input, output, cancel)
    }

    fn dispose(&self) {
        let dropped = self
            .device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if dropped.is_some() {
            tracing::debug!("gpu device released");
        }
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/render/gpu.rs"]
mod tests;
