use std::collections::{BTreeMap, BTreeSet};

use rand::prelude::*;
use tilesight_map::{
    LightSource, Map, MapObject, NearbyListener, ObjectId, Point, Quadrant, Quadrants, Rgb,
    ViewConfig, VisibilityState,
};

const COLS: i32 = 24;
const ROWS: i32 = 18;

fn cave(seed: u64, density: u32) -> (Map, Vec<ObjectId>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut map = Map::new("cave", COLS, ROWS).unwrap();
    let mut walls = Vec::new();
    for p in map.range() {
        if rng.random_range(0..100) < density {
            let id = map.insert_object(MapObject::solid(0));
            map.add(p, id).unwrap();
            walls.push(id);
        }
    }
    (map, walls)
}

fn full(map: &Map, origin: Point, radius: i32) -> BTreeSet<Point> {
    let mut set = BTreeSet::new();
    map.field_of_view(
        origin,
        radius,
        |p| {
            set.insert(p);
        },
        Quadrants::ALL,
    )
    .unwrap();
    set
}

fn random_point(rng: &mut StdRng) -> Point {
    Point::new(rng.random_range(0..COLS), rng.random_range(0..ROWS))
}

#[test]
fn fov_is_monotonic_in_radius() {
    for seed in 0..6 {
        let (map, _) = cave(seed, 25);
        let origin = Point::new(COLS / 2, ROWS / 2);
        let mut prev = full(&map, origin, 0);
        assert_eq!(prev, BTreeSet::from([origin]));
        for r in 1..=12 {
            let cur = full(&map, origin, r);
            assert!(prev.is_subset(&cur), "seed {seed}: radius {r} lost cells");
            prev = cur;
        }
    }
}

#[test]
fn fov_is_deterministic_across_quadrant_splits() {
    let (map, _) = cave(11, 30);
    let origin = Point::new(7, 9);
    let reference = full(&map, origin, 9);
    assert_eq!(full(&map, origin, 9), reference);

    let mut merged = BTreeSet::new();
    for q in Quadrant::ALL.into_iter().rev() {
        let mut part = Vec::new();
        map.field_of_view(origin, 9, |p| part.push(p), Quadrants::only(q))
            .unwrap();
        for p in part {
            assert_eq!(Quadrant::of(p, origin), q);
            assert!(merged.insert(p), "{p} visited by two quadrants");
        }
    }
    assert_eq!(merged, reference);

    let reversed: Quadrants = Quadrant::ALL.into_iter().rev().collect();
    let mut again = BTreeSet::new();
    map.field_of_view(
        origin,
        9,
        |p| {
            again.insert(p);
        },
        reversed,
    )
    .unwrap();
    assert_eq!(again, reference);
}

#[test]
fn los_agrees_with_fov() {
    for seed in 20..24 {
        let (map, _) = cave(seed, 30);
        let mut rng = StdRng::seed_from_u64(seed);
        let origin = random_point(&mut rng);
        let radius = 8;
        let fov = full(&map, origin, radius);
        for c in map.range() {
            if !origin.within(c, radius) {
                assert!(!fov.contains(&c));
                continue;
            }
            assert_eq!(
                fov.contains(&c),
                map.test_los(origin, c).unwrap(),
                "seed {seed}: {origin} -> {c}"
            );
        }
    }
}

#[test]
fn five_by_five_scenario() {
    let mut map = Map::new("small", 5, 5).unwrap();
    let origin = Point::new(2, 2);
    let open = full(&map, origin, 2);
    assert_eq!(open.len(), 13);
    assert!(open.contains(&Point::new(2, 4)));
    assert!(!open.contains(&Point::new(1, 4)));

    let blocker = map.insert_object(MapObject::solid(0));
    map.add(Point::new(2, 3), blocker).unwrap();
    let shadowed = full(&map, origin, 2);
    assert!(shadowed.contains(&Point::new(2, 3)));
    assert!(!shadowed.contains(&Point::new(2, 4)));
    assert_eq!(shadowed.len(), 12);
}

#[test]
fn light_falloff_scenario() {
    let mut map = Map::new("lit", 11, 11).unwrap();
    let mut light = LightSource::new(Rgb::new(255, 0, 0), 1.0);
    assert_eq!(light.radius(), 5);
    let pos = Point::new(5, 5);
    light.apply(&mut map, pos).unwrap();
    assert_eq!(light.applied_tiles()[&pos], 1.0);
    assert_eq!(light.applied_tiles()[&Point::new(5, 4)], 1.0);
    assert_eq!(light.applied_tiles()[&Point::new(4, 5)], 1.0);
    assert_eq!(light.applied_tiles().len(), full(&map, pos, 5).len());
}

#[test]
fn incremental_view_matches_full_recompute() {
    for seed in 100..104 {
        let (mut map, mut rocks) = cave(seed, 15);
        let mut rng = StdRng::seed_from_u64(seed);
        let hero = map.insert_object(MapObject::new(5));
        map.add(Point::new(COLS / 2, ROWS / 2), hero).unwrap();
        let cfg = ViewConfig {
            radius: 7,
            remember: true,
        };
        let mut view = VisibilityState::bind(&mut map, hero, cfg).unwrap();
        view.update(&map).unwrap();

        for step in 0..150 {
            for _ in 0..rng.random_range(1..4) {
                match rng.random_range(0..5) {
                    0 => {
                        let Some(&rock) = rocks.get(rng.random_range(0..rocks.len().max(1))) else {
                            continue;
                        };
                        map.move_object(rock, random_point(&mut rng)).unwrap();
                    }
                    1 => {
                        let rock = map.insert_object(MapObject::solid(0));
                        map.add(random_point(&mut rng), rock).unwrap();
                        rocks.push(rock);
                    }
                    2 => {
                        if rocks.is_empty() {
                            continue;
                        }
                        let rock = rocks.swap_remove(rng.random_range(0..rocks.len()));
                        map.destroy_object(rock).unwrap();
                    }
                    3 => {
                        let Some(&rock) = rocks.get(rng.random_range(0..rocks.len().max(1))) else {
                            continue;
                        };
                        map.update_object(rock, |o| o.blocks_los = !o.blocks_los)
                            .unwrap();
                    }
                    _ => {
                        let at = map.position_of(hero).unwrap().unwrap();
                        let to = at.shift(rng.random_range(-1..=1), rng.random_range(-1..=1));
                        if map.contains(to) {
                            map.move_object(hero, to).unwrap();
                        }
                    }
                }
            }
            map.dispatch_dirty(&mut [&mut view]).unwrap();
            view.update(&map).unwrap();
            let origin = map.position_of(hero).unwrap().unwrap();
            let expected = full(&map, origin, 7);
            assert_eq!(
                view.visible().collect::<BTreeSet<_>>(),
                expected,
                "seed {seed} step {step}"
            );
            assert!(view.visible().all(|p| view.remembered(p)));
        }
    }
}

#[test]
fn single_quadrant_change_merges_into_prior() {
    let (mut map, _) = cave(7, 20);
    let origin = Point::new(12, 9);
    let before = full(&map, origin, 8);

    let rock = map.insert_object(MapObject::solid(0));
    map.add(Point::new(14, 12), rock).unwrap();
    let q = Quadrant::of(Point::new(14, 12), origin);
    assert_eq!(q, Quadrant::SE);

    let mut merged: BTreeSet<Point> = before
        .into_iter()
        .filter(|&p| Quadrant::of(p, origin) != q)
        .collect();
    map.field_of_view(
        origin,
        8,
        |p| {
            merged.insert(p);
        },
        Quadrants::only(q),
    )
    .unwrap();
    assert_eq!(merged, full(&map, origin, 8));
}

#[test]
fn light_round_trip_after_churn() {
    let (mut map, mut rocks) = cave(42, 12);
    let mut rng = StdRng::seed_from_u64(42);
    map.set_ambient_light(Rgb::new(30, 30, 30), 0.2);
    let baseline: Vec<_> = map.tiles().map(|t| t.light()).collect();

    let mut a = LightSource::new(Rgb::new(255, 180, 90), 1.6);
    let mut b = LightSource::new(Rgb::new(60, 90, 255), 0.9).with_fall_off(0.7);
    let mut c = a.copy();
    a.apply(&mut map, Point::new(4, 4)).unwrap();
    b.apply(&mut map, Point::new(18, 12)).unwrap();
    c.apply(&mut map, Point::new(11, 8)).unwrap();

    for _ in 0..60 {
        if rng.random_range(0..2) == 0 || rocks.is_empty() {
            let rock = map.insert_object(MapObject::solid(0));
            map.add(random_point(&mut rng), rock).unwrap();
            rocks.push(rock);
        } else {
            let rock = rocks.swap_remove(rng.random_range(0..rocks.len()));
            map.destroy_object(rock).unwrap();
        }
        map.dispatch_dirty(&mut [&mut a, &mut b, &mut c]).unwrap();
        for l in [&a, &b, &c] {
            let pos = l.position().unwrap();
            let lit: BTreeSet<Point> = l.applied_tiles().keys().copied().collect();
            assert_eq!(lit, full(&map, pos, l.radius()));
        }
    }

    c.remove(&mut map).unwrap();
    a.remove(&mut map).unwrap();
    b.remove(&mut map).unwrap();
    let after: Vec<_> = map.tiles().map(|t| t.light()).collect();
    assert_eq!(after, baseline);
    assert_eq!(map.watch_count(), 0);
}

#[test]
fn proximity_batches_are_complete() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut map = Map::new("watch", COLS, ROWS).unwrap();
    let center = Point::new(10, 8);
    let radius = 4;
    let watch = map.monitor_nearby(center, radius, None).unwrap();
    let ids: Vec<ObjectId> = (0..20)
        .map(|i| map.insert_object(MapObject::new(i)))
        .collect();

    for round in 0..40 {
        let mut expected: BTreeMap<ObjectId, (Point, Point)> = BTreeMap::new();
        let mut record = |id: ObjectId, p: Point| {
            if center.within(p, radius) {
                expected
                    .entry(id)
                    .and_modify(|e| e.1 = p)
                    .or_insert((p, p));
            }
        };
        for _ in 0..rng.random_range(0..8) {
            let id = ids[rng.random_range(0..ids.len())];
            let to = random_point(&mut rng);
            match map.position_of(id).unwrap() {
                Some(from) if rng.random_range(0..3) == 0 => {
                    map.remove(from, id).unwrap();
                    record(id, from);
                }
                Some(from) => {
                    map.move_object(id, to).unwrap();
                    record(id, from);
                    record(id, to);
                }
                None => {
                    map.add(to, id).unwrap();
                    record(id, to);
                }
            }
        }
        let batches = map.flush_dirty();
        if expected.is_empty() {
            assert!(batches.is_empty(), "round {round}");
            continue;
        }
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].watch, watch);
        let got: BTreeMap<ObjectId, (Point, Point)> = batches[0]
            .entries
            .iter()
            .map(|e| (e.object, (e.first_pos, e.pos)))
            .collect();
        assert_eq!(got, expected, "round {round}");
        assert!(map.flush_dirty().is_empty());
    }
}

#[test]
fn flush_drains_every_watch_before_dispatch() {
    let mut map = Map::new("order", 10, 10).unwrap();
    let mut torch = LightSource::new(Rgb::WHITE, 1.0);
    torch.apply(&mut map, Point::new(3, 3)).unwrap();
    let mut view =
        VisibilityState::bind(&mut map, Point::new(5, 5), ViewConfig::default()).unwrap();
    view.update(&map).unwrap();

    let wall = map.insert_object(MapObject::solid(0));
    map.add(Point::new(4, 4), wall).unwrap();
    let mut listeners: [&mut dyn NearbyListener; 2] = [&mut view, &mut torch];
    let delivered = map.dispatch_dirty(&mut listeners).unwrap();
    assert_eq!(delivered, 2);
    assert!(map.flush_dirty().is_empty());
    assert_eq!(view.dirty_quadrants(), Quadrants::only(Quadrant::NW));
    view.update(&map).unwrap();
    assert_eq!(
        view.visible().collect::<BTreeSet<_>>(),
        full(&map, Point::new(5, 5), ViewConfig::default().radius)
    );
}
