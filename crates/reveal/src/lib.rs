//! Animated reveal engine for the card-grid menu.
//!
//! One clock drives two consumers every frame: the wipe program on the panel
//! and the staggered fly-in of the cards. Both read the same [`RevealPhase`],
//! so the wipe front and the arriving cards stay in step.
//!
//! ```text
//!   TimeSource ─▶ FrameDriver ─▶ CardMenu::tick(TimeSample)
//!                                    │ RevealClock + Easing ─▶ RevealPhase
//!                                    ├─▶ panel uniforms (uTime, uTimeCubic)
//!                                    └─▶ CardAnimator ─▶ card position / opacity
//!                                                │
//!                                           SceneHost ─▶ gpu::StillRenderer
//! ```
//!
//! Cards enter the grid whenever their image arrives; only their index decides
//! where they sit and when they animate.

pub mod animator;
pub mod clock;
pub mod easing;
pub mod frame;
pub mod gpu;
pub mod layout;
pub mod menu;
pub mod panel;
pub mod scene;
pub mod shader;

pub use animator::{CardAnimator, CardPose};
pub use clock::{
    BoxedTimeSource, FixedTimeSource, RevealClock, RevealPhase, SystemTimeSource, TimeSample,
    TimeSource,
};
pub use easing::{CubicBezier, Easing};
pub use frame::{FrameControl, FrameDriver, HeadlessFrameDriver};
pub use layout::GridLayout;
pub use menu::{Card, CardMenu, MenuError, MenuSettings};
pub use panel::{Bounds, PanelGeometry};
pub use scene::{NodeId, SceneGraph, SceneHost, TextureData, Transform, Uniform};
