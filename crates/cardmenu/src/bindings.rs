use anyhow::{Context, Result};
use cardfetch::CardSource;
use menuconfig::{EasingSetting, Fetch, MenuConfig};
use reveal::{CubicBezier, Easing, GridLayout, MenuSettings};

pub fn easing(setting: EasingSetting) -> Easing {
    match setting {
        EasingSetting::Linear => Easing::Linear,
        EasingSetting::Smoothstep => Easing::Smoothstep,
        EasingSetting::EaseInOut => Easing::EaseInOut,
        EasingSetting::CubicBezier([x1, y1, x2, y2]) => {
            Easing::CubicBezier(CubicBezier::new(x1, y1, x2, y2))
        }
    }
}

pub fn grid_layout(config: &MenuConfig) -> GridLayout {
    let grid = &config.grid;
    GridLayout {
        rows: grid.rows as usize,
        cols: grid.cols as usize,
        card_width: grid.card_width,
        card_height: grid.card_height(),
        buffer_factor: grid.buffer_factor,
        margin: grid.corner_radius,
    }
}

pub fn menu_settings(config: &MenuConfig) -> MenuSettings {
    MenuSettings {
        layout: grid_layout(config),
        easing: easing(config.timing.easing),
        period: config.timing.period,
        stagger: config.timing.stagger,
        drop_offset: config.timing.drop_offset,
        inner_factor: config.grid.inner_factor,
    }
}

pub fn card_source(fetch: &Fetch) -> Result<CardSource> {
    let source = CardSource::new(&fetch.host, fetch.width, fetch.format.clone())
        .with_context(|| format!("invalid fetch.host '{}'", fetch.host))?;
    match &fetch.card_back {
        Some(url) => source
            .with_card_back(url)
            .with_context(|| format!("invalid fetch.card_back '{url}'")),
        None => Ok(source),
    }
}
