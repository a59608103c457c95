use std::time::{Duration, Instant};

use cardfetch::{FetchOutcome, FetchQueue, FetchTarget};
use reveal::{CardMenu, MenuSettings, RevealPhase, SceneGraph, TimeSample};
use tracing::{debug, info, warn};

/// A live menu: scene, menu state, and the fetches still feeding it.
///
/// Everything here runs on the frame thread. Fetch results are only applied
/// inside [`MenuSession::pump`], so cards appear between frames and never
/// during one. Dropping the session cancels outstanding fetches.
pub struct MenuSession {
    scene: SceneGraph,
    menu: CardMenu,
    queue: Option<FetchQueue>,
    failed: usize,
}

impl MenuSession {
    pub fn new(settings: MenuSettings, queue: Option<FetchQueue>) -> Self {
        let mut scene = SceneGraph::new();
        let menu = CardMenu::build(&mut scene, settings);
        Self {
            scene,
            menu,
            queue,
            failed: 0,
        }
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn menu(&self) -> &CardMenu {
        &self.menu
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Fetches that have neither delivered nor failed yet.
    pub fn pending(&self) -> usize {
        self.queue.as_ref().map_or(0, FetchQueue::pending)
    }

    /// Applies every finished fetch. Returns how many outcomes were handled.
    pub fn pump(&mut self) -> usize {
        let Some(queue) = self.queue.as_mut() else {
            return 0;
        };
        let outcomes = queue.try_drain();
        let handled = outcomes.len();
        for outcome in outcomes {
            self.apply(outcome);
        }
        handled
    }

    /// Pumps fetch results, then advances the menu to `sample`.
    pub fn tick(&mut self, sample: &TimeSample) -> RevealPhase {
        self.pump();
        self.menu.tick(&mut self.scene, sample)
    }

    /// Blocks until every fetch has finished or `timeout` passes.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        // An unrepresentable deadline means waiting until every fetch reports.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            self.pump();
            if self.pending() == 0 {
                return true;
            }
            let now = Instant::now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                warn!(pending = self.pending(), "gave up waiting for card images");
                return false;
            }
            let wait = deadline
                .map_or(Duration::MAX, |deadline| deadline - now)
                .min(Duration::from_millis(50));
            if let Some(outcome) = self.queue.as_mut().and_then(|queue| queue.recv_timeout(wait)) {
                self.apply(outcome);
            }
        }
    }

    fn apply(&mut self, outcome: FetchOutcome) {
        match (outcome.target, outcome.result) {
            (FetchTarget::Card(index), Ok(image)) => {
                if let Err(err) = self.menu.insert_card(&mut self.scene, index, Some(image)) {
                    warn!(index, error = %err, "rejected card");
                } else if self.menu.is_complete() {
                    info!(cards = self.menu.capacity(), "card grid complete");
                }
            }
            (FetchTarget::CardBack, Ok(image)) => {
                self.menu.set_card_back(&mut self.scene, image);
                debug!("card back texture applied");
            }
            (target, Err(err)) => {
                self.failed += 1;
                debug!(?target, error = %err, "leaving slot empty");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cardfetch::{
        CardSource, FetchError, FetchJob, ImageFetcher, RgbaImage, SyntheticFetcher, Url,
    };
    use menuconfig::MenuConfig;

    use super::*;
    use crate::bindings;

    struct SkipFive;

    impl ImageFetcher for SkipFive {
        fn fetch(&self, url: &Url) -> Result<RgbaImage, FetchError> {
            if url.as_str().contains("t=6&") {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                });
            }
            SyntheticFetcher::default().fetch(url)
        }
    }

    fn session_with(fetcher: Arc<dyn ImageFetcher>, source: &CardSource) -> MenuSession {
        let settings = MenuSettings::default();
        let jobs = FetchJob::for_grid(source, settings.layout.card_count());
        let queue = FetchQueue::spawn(fetcher, jobs, 4).unwrap();
        MenuSession::new(settings, Some(queue))
    }

    #[test]
    fn settles_with_every_card() {
        let mut config = MenuConfig::default();
        config.fetch.card_back = Some("https://example.com/cardback.png".into());
        let source = bindings::card_source(&config.fetch).unwrap();
        let mut session = session_with(Arc::new(SyntheticFetcher::default()), &source);
        assert!(session.settle(Duration::from_secs(5)));
        assert!(session.menu().is_complete());
        assert!(session.menu().has_card_back());
        assert_eq!(session.failed(), 0);
        assert_eq!(session.menu().indices(), (0..24).collect::<Vec<_>>());
    }

    #[test]
    fn failed_card_leaves_gap() {
        let source = bindings::card_source(&MenuConfig::default().fetch).unwrap();
        let mut session = session_with(Arc::new(SkipFive), &source);
        assert!(session.settle(Duration::from_secs(5)));
        assert_eq!(session.failed(), 1);
        assert!(session.menu().card(5).is_none());
        assert_eq!(session.menu().cards().count(), 23);

        session.tick(&TimeSample::new(Duration::from_millis(1500), 1));
        assert!(session.menu().cards().all(|card| card.pose.opacity > 0.0));
    }

    #[test]
    fn session_without_fetches_still_animates() {
        let mut session = MenuSession::new(MenuSettings::default(), None);
        assert_eq!(session.pending(), 0);
        assert_eq!(session.pump(), 0);
        let phase = session.tick(&TimeSample::new(Duration::from_millis(500), 0));
        assert!((phase.raw() - 0.25).abs() < 1e-6);
        let root = session.menu().root();
        assert!(session.scene().program(root).is_some());
    }

    #[test]
    fn cards_only_arrive_through_pump() {
        let source = bindings::card_source(&MenuConfig::default().fetch).unwrap();
        let mut session = session_with(Arc::new(SyntheticFetcher::default()), &source);
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(session.menu().cards().count(), 0);
        session.pump();
        assert!(session.menu().cards().count() > 0);
    }
}
