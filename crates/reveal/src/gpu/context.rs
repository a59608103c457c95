use anyhow::{Context as AnyhowContext, Result};

/// Target format for offscreen renders; PNG bytes come out gamma encoded.
pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Device and queue without a presentation surface.
pub(crate) struct HeadlessContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    max_dimension: u32,
}

impl HeadlessContext {
    pub(crate) fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a GPU adapter for offscreen rendering")?;

        let info = adapter.get_info();
        let limits = adapter.limits();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected offscreen adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("cardmenu export device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        Ok(Self {
            _instance: instance,
            device,
            queue,
            max_dimension: limits.max_texture_dimension_2d,
        })
    }

    pub(crate) fn check_size(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            anyhow::bail!("export size must be non-zero, got {width}x{height}");
        }
        if width > self.max_dimension || height > self.max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max}, requested export is {width}x{height}",
                max = self.max_dimension,
            );
        }
        Ok(())
    }
}
