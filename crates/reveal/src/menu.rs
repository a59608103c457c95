use std::collections::BTreeMap;
use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::animator::{CardAnimator, CardPose};
use crate::clock::{RevealClock, RevealPhase, TimeSample};
use crate::easing::Easing;
use crate::layout::GridLayout;
use crate::panel::{Bounds, PanelGeometry};
use crate::scene::{NodeId, SceneHost, TextureData, Transform, Uniform};
use crate::shader::{REVEAL_WGSL, UNIFORM_BOUNDING_BOX, UNIFORM_TIME, UNIFORM_TIME_EASED};

/// Depth offset of a card's back face behind its front face.
pub const BACK_FACE_OFFSET: f32 = -0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuSettings {
    pub layout: GridLayout,
    pub easing: Easing,
    pub period: Duration,
    pub stagger: f32,
    pub drop_offset: f32,
    pub inner_factor: f32,
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            layout: GridLayout::default(),
            easing: Easing::default(),
            period: Duration::from_millis(2000),
            stagger: 0.02,
            drop_offset: 0.1,
            inner_factor: 0.99,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MenuError {
    #[error("card index {index} is outside the {count}-card grid")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("card {0} is already in the grid")]
    Duplicate(usize),
}

/// A card that has entered the grid.
#[derive(Debug, Clone)]
pub struct Card {
    pub index: usize,
    pub base_position: [f32; 3],
    pub front: NodeId,
    pub back: NodeId,
    pub pose: CardPose,
}

/// Panel plus the cards that have arrived so far.
///
/// The panel node is the root handed to the host; cards are attached to it as
/// their images resolve and are never removed. Each call to [`CardMenu::tick`]
/// drives the panel uniforms and every card from the same [`RevealPhase`].
#[derive(Debug)]
pub struct CardMenu {
    settings: MenuSettings,
    clock: RevealClock,
    animator: CardAnimator,
    bounds: Bounds,
    root: NodeId,
    cards: BTreeMap<usize, Card>,
    card_back: Option<TextureData>,
    phase: RevealPhase,
}

impl CardMenu {
    pub fn build<H: SceneHost + ?Sized>(host: &mut H, settings: MenuSettings) -> Self {
        let geometry = Arc::new(PanelGeometry::for_layout(
            &settings.layout,
            settings.inner_factor,
        ));
        let bounds = geometry.bounds();
        let root = host.create_program_surface("menu-panel", REVEAL_WGSL, geometry);
        host.set_uniform(root, UNIFORM_BOUNDING_BOX, Uniform::Vec4(bounds.as_uniform()));

        let phase = RevealPhase::new(0.0, settings.easing);
        host.set_uniform(root, UNIFORM_TIME, Uniform::Float(phase.raw()));
        host.set_uniform(root, UNIFORM_TIME_EASED, Uniform::Float(phase.eased()));

        tracing::debug!(
            rows = settings.layout.rows,
            cols = settings.layout.cols,
            width = bounds.size[0],
            height = bounds.size[1],
            "built menu panel"
        );

        Self {
            clock: RevealClock::new(settings.period),
            animator: CardAnimator::new(settings.easing, settings.stagger, settings.drop_offset),
            settings,
            bounds,
            root,
            cards: BTreeMap::new(),
            card_back: None,
            phase,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn settings(&self) -> &MenuSettings {
        &self.settings
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    pub fn capacity(&self) -> usize {
        self.settings.layout.card_count()
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.get(&index)
    }

    /// Indices present in the grid, ascending.
    pub fn indices(&self) -> Vec<usize> {
        self.cards.keys().copied().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.cards.len() == self.capacity()
    }

    /// Adds card `index` with its front texture, posed for the current phase.
    pub fn insert_card<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        index: usize,
        texture: Option<TextureData>,
    ) -> Result<&Card, MenuError> {
        let count = self.capacity();
        let base_position = self
            .settings
            .layout
            .rest_position_for_index(index)
            .ok_or(MenuError::IndexOutOfRange { index, count })?;
        if self.cards.contains_key(&index) {
            return Err(MenuError::Duplicate(index));
        }

        let size = [
            self.settings.layout.card_width,
            self.settings.layout.card_height,
        ];
        let front = host.create_textured_surface(&format!("card-{index}"), size, texture);
        let back =
            host.create_textured_surface(&format!("card-{index}-back"), size, self.card_back.clone());
        host.set_transform(
            back,
            Transform {
                position: [0.0, 0.0, BACK_FACE_OFFSET],
                rotation_y: PI,
            },
        );
        host.add_child(front, back);
        host.add_child(self.root, front);

        let pose = self.animator.pose(base_position, self.phase.raw(), index);
        apply_pose(host, front, back, &pose);

        tracing::debug!(index, x = base_position[0], y = base_position[1], "card entered grid");
        let card = self.cards.entry(index).or_insert(Card {
            index,
            base_position,
            front,
            back,
            pose,
        });
        Ok(card)
    }

    /// Sets the texture shown on every back face, including cards added later.
    pub fn set_card_back<H: SceneHost + ?Sized>(&mut self, host: &mut H, texture: TextureData) {
        for card in self.cards.values() {
            host.set_texture(card.back, texture.clone());
        }
        self.card_back = Some(texture);
    }

    pub fn has_card_back(&self) -> bool {
        self.card_back.is_some()
    }

    /// Advances the panel uniforms and every present card to `sample`.
    pub fn tick<H: SceneHost + ?Sized>(&mut self, host: &mut H, sample: &TimeSample) -> RevealPhase {
        let phase = self.clock.phase(sample, self.settings.easing);
        self.apply_phase(host, phase);
        phase
    }

    /// Poses the menu for an explicit raw progress value in `[0, 1)`.
    pub fn seek<H: SceneHost + ?Sized>(&mut self, host: &mut H, raw_time: f32) -> RevealPhase {
        let phase = RevealPhase::new(raw_time, self.settings.easing);
        self.apply_phase(host, phase);
        phase
    }

    fn apply_phase<H: SceneHost + ?Sized>(&mut self, host: &mut H, phase: RevealPhase) {
        host.set_uniform(self.root, UNIFORM_TIME, Uniform::Float(phase.raw()));
        host.set_uniform(self.root, UNIFORM_TIME_EASED, Uniform::Float(phase.eased()));
        for card in self.cards.values_mut() {
            card.pose = self
                .animator
                .pose(card.base_position, phase.raw(), card.index);
            apply_pose(host, card.front, card.back, &card.pose);
        }
        self.phase = phase;
    }
}

fn apply_pose<H: SceneHost + ?Sized>(host: &mut H, front: NodeId, back: NodeId, pose: &CardPose) {
    host.set_position(front, pose.position);
    host.set_opacity(front, pose.opacity);
    host.set_opacity(back, pose.opacity);
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use image::RgbaImage;

    use super::*;
    use crate::scene::SceneGraph;

    fn menu() -> (SceneGraph, CardMenu) {
        let mut scene = SceneGraph::new();
        let menu = CardMenu::build(&mut scene, MenuSettings::default());
        (scene, menu)
    }

    fn texture() -> TextureData {
        Arc::new(RgbaImage::new(2, 2))
    }

    fn at(ms: u64) -> TimeSample {
        TimeSample::new(Duration::from_millis(ms), 0)
    }

    #[test]
    fn full_grid_has_each_index_once() {
        let (mut scene, mut menu) = menu();
        // Arrival order is deliberately scrambled.
        for index in (1..24).step_by(2).chain((0..24).step_by(2).rev()) {
            menu.insert_card(&mut scene, index, Some(texture())).unwrap();
        }
        assert!(menu.is_complete());
        let indices = menu.indices();
        assert_eq!(indices, (0..24).collect::<Vec<_>>());
        let unique: HashSet<_> = menu.cards().map(|card| card.front).collect();
        assert_eq!(unique.len(), 24);
        assert_eq!(scene.node(menu.root()).unwrap().children.len(), 24);
    }

    #[test]
    fn rejects_duplicates_and_out_of_range() {
        let (mut scene, mut menu) = menu();
        menu.insert_card(&mut scene, 3, None).unwrap();
        assert_eq!(
            menu.insert_card(&mut scene, 3, None).unwrap_err(),
            MenuError::Duplicate(3)
        );
        assert_eq!(
            menu.insert_card(&mut scene, 24, None).unwrap_err(),
            MenuError::IndexOutOfRange {
                index: 24,
                count: 24
            }
        );
    }

    #[test]
    fn panel_carries_reveal_uniforms() {
        let (mut scene, mut menu) = menu();
        let bounds = scene
            .uniform(menu.root(), UNIFORM_BOUNDING_BOX)
            .and_then(|u| u.as_vec4())
            .unwrap();
        assert_eq!(bounds, menu.bounds().as_uniform());

        let phase = menu.tick(&mut scene, &at(500));
        let time = scene.uniform(menu.root(), UNIFORM_TIME).unwrap();
        let eased = scene.uniform(menu.root(), UNIFORM_TIME_EASED).unwrap();
        assert_eq!(time.as_float(), Some(phase.raw()));
        assert_eq!(eased.as_float(), Some(Easing::default().sample(phase.raw())));
    }

    #[test]
    fn back_face_is_flipped_behind_front() {
        let (mut scene, mut menu) = menu();
        menu.insert_card(&mut scene, 0, Some(texture())).unwrap();
        let card = menu.card(0).unwrap().clone();
        let back = scene.node(card.back).unwrap();
        assert_eq!(back.parent, Some(card.front));
        assert_eq!(back.transform.position, [0.0, 0.0, BACK_FACE_OFFSET]);
        assert!((back.transform.rotation_y - PI).abs() < 1e-6);
        assert!(scene.textured(card.back).unwrap().texture.is_none());

        let card_back = texture();
        menu.set_card_back(&mut scene, card_back.clone());
        assert!(Arc::ptr_eq(
            scene.textured(card.back).unwrap().texture.as_ref().unwrap(),
            &card_back
        ));
        menu.insert_card(&mut scene, 1, None).unwrap();
        let later = menu.card(1).unwrap().back;
        assert!(scene.textured(later).unwrap().texture.is_some());
    }

    #[test]
    fn seek_matches_tick_at_same_phase() {
        let (mut scene, mut menu) = menu();
        menu.insert_card(&mut scene, 7, Some(texture())).unwrap();

        let ticked = menu.tick(&mut scene, &at(700));
        let pose = menu.card(7).unwrap().pose;

        let sought = menu.seek(&mut scene, ticked.raw());
        assert_eq!(sought, ticked);
        assert_eq!(menu.card(7).unwrap().pose, pose);
        assert_eq!(
            scene.uniform(menu.root(), UNIFORM_TIME).and_then(|u| u.as_float()),
            Some(ticked.raw())
        );
    }

    #[test]
    fn scenario_over_one_period() {
        let (mut scene, mut menu) = menu();
        for index in 0..24 {
            menu.insert_card(&mut scene, index, Some(texture())).unwrap();
        }

        menu.tick(&mut scene, &at(0));
        let start: Vec<CardPose> = menu.cards().map(|card| card.pose).collect();
        for card in menu.cards() {
            assert_eq!(card.pose.opacity, Easing::default().sample(0.0));
            let expected = card.base_position[1] - 0.1;
            assert!((card.pose.position[1] - expected).abs() < 1e-6);
            let front = scene.textured(card.front).unwrap();
            let back = scene.textured(card.back).unwrap();
            assert_eq!(front.opacity, back.opacity);
        }

        menu.tick(&mut scene, &at(1000));
        assert!(menu.card(0).unwrap().pose.opacity > menu.card(20).unwrap().pose.opacity);
        let leading = scene.node(menu.card(0).unwrap().front).unwrap();
        assert_eq!(leading.transform.position, menu.card(0).unwrap().pose.position);

        menu.tick(&mut scene, &at(2000));
        let wrapped: Vec<CardPose> = menu.cards().map(|card| card.pose).collect();
        assert_eq!(start, wrapped);
    }

    #[test]
    fn missing_card_leaves_the_rest_animating() {
        let (mut scene, mut menu) = menu();
        for index in (0..24).filter(|index| *index != 5) {
            menu.insert_card(&mut scene, index, Some(texture())).unwrap();
        }
        assert!(!menu.is_complete());
        assert!(menu.card(5).is_none());

        menu.tick(&mut scene, &at(1500));
        for card in menu.cards() {
            assert!(card.pose.opacity > 0.0, "card {} is still hidden", card.index);
        }
    }

    #[test]
    fn late_card_joins_at_current_phase() {
        let (mut scene, mut menu) = menu();
        menu.tick(&mut scene, &at(1200));
        let raw = menu.phase().raw();
        let card = menu.insert_card(&mut scene, 2, None).unwrap().clone();
        let animator = CardAnimator::new(Easing::default(), 0.02, 0.1);
        assert_eq!(card.pose, animator.pose(card.base_position, raw, 2));
    }
}
