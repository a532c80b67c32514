// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Autoplay in a scrolling feed.
//!
//! Twenty cells in a vertical list; the feed scrolls in steps and the arbiter
//! picks the cell to play after each step.
//!
//! Run:
//! - `cargo run -p understory_demos --example feed_autoplay`
//! - `RUST_LOG=understory_playback=debug cargo run -p understory_demos --example feed_autoplay`

use std::time::Duration;

use kurbo::{Rect, Vec2};
use tracing_subscriber::EnvFilter;
use understory_playback::adapters::containers::ScrollContainer;
use understory_playback::adapters::scene::Scene;
use understory_playback::{
    Arbiter, ArbiterConfig, Axes, Binding, ContainerId, GroupConfig, ManagerOptions, MediaBridge,
    MediaId, MemoryMode, RepeatMode,
};

const FEED: ContainerId = ContainerId(1);
const CELL_H: f64 = 300.0;
const WIDTH: f64 = 360.0;

/// Prints every command it receives.
struct Printer(MediaId);

impl MediaBridge for Printer {
    fn prepare(&mut self, resume: Option<Duration>, preload: bool) {
        println!("  {:?}: prepare (resume {resume:?}, preload {preload})", self.0);
    }

    fn play(&mut self) {
        println!("  {:?}: play", self.0);
    }

    fn pause(&mut self) {
        println!("  {:?}: pause", self.0);
    }

    fn reset(&mut self, _keep_state: bool) {
        println!("  {:?}: reset", self.0);
    }

    fn release(&mut self) {
        println!("  {:?}: release", self.0);
    }

    fn set_repeat_mode(&mut self, mode: RepeatMode) {
        println!("  {:?}: repeat {mode:?}", self.0);
    }
}

fn main() -> Result<(), understory_playback::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut scene = Scene::new(Rect::new(0.0, 0.0, WIDTH, 640.0));
    scene.add_root(FEED, Rect::new(0.0, 0.0, WIDTH, 640.0));

    let mut arbiter = Arbiter::new(ArbiterConfig {
        memory_mode: MemoryMode::Normal,
        ..ArbiterConfig::default()
    });
    let group = arbiter.add_group(GroupConfig::default());
    let manager = arbiter.add_manager(
        group,
        ManagerOptions {
            tag: "feed".into(),
            ..ManagerOptions::default()
        },
    )?;
    arbiter.add_bucket(manager, Box::new(ScrollContainer::list(FEED, Axes::VERTICAL)))?;

    for n in 0..20_u64 {
        let y = n as f64 * CELL_H;
        let cell = ContainerId(100 + n);
        scene.add_child(FEED, cell, Rect::new(0.0, y, WIDTH, y + CELL_H - 20.0));
        arbiter.add_media(MediaId(n), Box::new(Printer(MediaId(n))))?;
        arbiter.bind(&scene, manager, Binding::new(MediaId(n), cell))?;
    }

    let step = Duration::from_millis(100);
    let mut now = Duration::ZERO;
    for offset in [0.0, 120.0, 310.0, 620.0, 1500.0, 1480.0] {
        println!("scroll to {offset}");
        scene.scroll_to(FEED, Vec2::new(0.0, offset));
        arbiter.on_container_scrolled(FEED)?;
        now += step;
        arbiter.advance(now, &scene)?;
        let playing = arbiter
            .selection(group)
            .and_then(|slot| arbiter.slot(slot))
            .map(|slot| slot.media());
        println!("  -> playing {playing:?}");
    }
    Ok(())
}
