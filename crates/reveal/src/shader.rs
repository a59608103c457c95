//! Reveal wipe program for the panel.
//!
//! The GPU side lives in `shaders/reveal.wgsl`; the functions here mirror its
//! per-fragment rule on the CPU so the mask can be checked without a device.
//! The hue rotation is purely stylistic: the normalized position is treated as
//! a colour and spun once around the YIQ colour wheel per period.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};

use crate::clock::RevealPhase;
use crate::panel::Bounds;

pub const REVEAL_WGSL: &str = include_str!("shaders/reveal.wgsl");

pub const UNIFORM_BOUNDING_BOX: &str = "uBoundingBox";
pub const UNIFORM_TIME: &str = "uTime";
pub const UNIFORM_TIME_EASED: &str = "uTimeCubic";

const RGB_TO_Y: [f32; 3] = [0.299, 0.587, 0.114];
const RGB_TO_I: [f32; 3] = [0.596, -0.275, -0.321];
const RGB_TO_Q: [f32; 3] = [0.212, -0.523, 0.311];
const YIQ_TO_R: [f32; 3] = [1.0, 0.956, 0.621];
const YIQ_TO_G: [f32; 3] = [1.0, -0.272, -0.647];
const YIQ_TO_B: [f32; 3] = [1.0, -1.107, 1.704];

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RevealUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub bounding_box: [f32; 4],
    pub time: f32,
    pub time_eased: f32,
    pub _padding: [f32; 2],
}

impl RevealUniforms {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            view_proj: IDENTITY,
            bounding_box: bounds.as_uniform(),
            time: 0.0,
            time_eased: 0.0,
            _padding: [0.0; 2],
        }
    }

    pub fn set_phase(&mut self, phase: &RevealPhase) {
        self.time = phase.raw();
        self.time_eased = phase.eased();
    }

    pub fn set_view_proj(&mut self, view_proj: [[f32; 4]; 4]) {
        self.view_proj = view_proj;
    }
}

const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Whether a fragment at normalized position `v` survives the wipe mask.
pub fn is_revealed(v: [f32; 3], time_eased: f32) -> bool {
    (1.0 - v[1]) < time_eased && (v[0] - 0.5).abs() < time_eased
}

pub fn hue_shift(color: [f32; 3], hue_adjust: f32) -> [f32; 3] {
    let y_prime = dot(color, RGB_TO_Y);
    let i = dot(color, RGB_TO_I);
    let q = dot(color, RGB_TO_Q);
    let hue = q.atan2(i) + hue_adjust;
    let chroma = (i * i + q * q).sqrt();

    let yiq = [y_prime, chroma * hue.cos(), chroma * hue.sin()];
    [dot(yiq, YIQ_TO_R), dot(yiq, YIQ_TO_G), dot(yiq, YIQ_TO_B)]
}

/// RGBA for a drawn fragment, or `None` when the fragment is discarded.
pub fn shade_fragment(v: [f32; 3], phase: &RevealPhase) -> Option<[f32; 4]> {
    if !is_revealed(v, phase.eased()) {
        return None;
    }
    let [r, g, b] = hue_shift(v, phase.raw() * TAU);
    Some([r, g, b, 1.0])
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Parses and validates a WGSL program the way device creation would.
#[cfg(test)]
pub(crate) fn validated_wgsl(source: &str) -> wgpu::naga::Module {
    use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

    let module = wgpu::naga::front::wgsl::parse_str(source)
        .unwrap_or_else(|err| panic!("{}", err.emit_to_string(source)));
    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .unwrap_or_else(|err| panic!("{err:?}"));
    module
}

/// Byte size naga assigns to the named struct.
#[cfg(test)]
pub(crate) fn struct_span(module: &wgpu::naga::Module, name: &str) -> Option<u32> {
    module.types.iter().find_map(|(_, ty)| match ty.inner {
        wgpu::naga::TypeInner::Struct { span, .. } if ty.name.as_deref() == Some(name) => {
            Some(span)
        }
        _ => None,
    })
}

#[cfg(test)]
pub(crate) fn entry_points(module: &wgpu::naga::Module) -> Vec<&str> {
    module
        .entry_points
        .iter()
        .map(|entry| entry.name.as_str())
        .collect()
}
