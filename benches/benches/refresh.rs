// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Rect, Vec2};
use understory_playback::adapters::containers::ScrollContainer;
use understory_playback::adapters::scene::Scene;
use understory_playback::{
    Arbiter, Axes, Binding, ContainerId, GroupConfig, ManagerId, ManagerOptions, MediaBridge,
    MediaId, MemoryMode,
};

const LIST: ContainerId = ContainerId(1);
const CELL_H: f64 = 120.0;

struct Null;

impl MediaBridge for Null {
    fn prepare(&mut self, _resume: Option<Duration>, _preload: bool) {}
    fn play(&mut self) {}
    fn pause(&mut self) {}
    fn reset(&mut self, _keep_state: bool) {}
    fn release(&mut self) {}
}

/// A feed of `cells` rows with the list filling an 800 pt tall window.
fn feed(cells: u64, mode: MemoryMode) -> (Scene, Arbiter, ManagerId) {
    let mut scene = Scene::new(Rect::new(0.0, 0.0, 400.0, 800.0));
    scene.add_root(LIST, Rect::new(0.0, 0.0, 400.0, 800.0));
    let mut arbiter = Arbiter::default();
    let group = arbiter.add_group(GroupConfig {
        memory_mode: Some(mode),
        ..GroupConfig::default()
    });
    let manager = arbiter
        .add_manager(group, ManagerOptions::default())
        .unwrap();
    arbiter
        .add_bucket(manager, Box::new(ScrollContainer::list(LIST, Axes::VERTICAL)))
        .unwrap();
    for n in 0..cells {
        let y = n as f64 * CELL_H;
        let cell = ContainerId(10 + n);
        scene.add_child(LIST, cell, Rect::new(0.0, y, 400.0, y + CELL_H - 8.0));
        arbiter.add_media(MediaId(n), Box::new(Null)).unwrap();
        arbiter
            .bind(&scene, manager, Binding::new(MediaId(n), cell))
            .unwrap();
    }
    (scene, arbiter, manager)
}

fn bench_scroll_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("scroll_refresh");
    for &cells in &[16_u64, 128, 1024] {
        for mode in [MemoryMode::Low, MemoryMode::High] {
            let (mut scene, mut arbiter, _) = feed(cells, mode);
            let mut now = Duration::ZERO;
            let mut offset = 0.0;
            group.throughput(Throughput::Elements(cells));
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}"), cells),
                &cells,
                |b, _| {
                    b.iter(|| {
                        offset = (offset + 37.0) % (CELL_H * 8.0);
                        scene.scroll_to(LIST, Vec2::new(0.0, offset));
                        arbiter.on_container_scrolled(LIST).unwrap();
                        now += Duration::from_millis(40);
                        arbiter.advance(now, &scene).unwrap();
                        black_box(arbiter.next_deadline());
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_bind_unbind(c: &mut Criterion) {
    c.bench_function("rebind_media", |b| {
        let (mut scene, mut arbiter, manager) = feed(64, MemoryMode::Balanced);
        scene.add_child(LIST, ContainerId(5000), Rect::new(0.0, 0.0, 400.0, 100.0));
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let target = if flip { ContainerId(5000) } else { ContainerId(10) };
            black_box(
                arbiter
                    .bind(&scene, manager, Binding::new(MediaId(0), target))
                    .unwrap(),
            );
        });
    });
}

criterion_group!(benches, bench_scroll_refresh, bench_bind_unbind);
criterion_main!(benches);
