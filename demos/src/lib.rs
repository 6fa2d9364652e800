//! Shared model for the tilesight demos.
//!
//! Demonstrates: building a map from an ASCII template, a view bound to a
//! walking player, torches that re-light when doors open and close, and
//! rubble dropped at random into the cave.

use std::collections::HashSet;
use std::fmt::Write as _;

use anyhow::{Result, bail};
use rand::prelude::*;
use tilesight_core::{Point, Rgb};
use tilesight_map::{
    LightSource, Map, MapObject, NearbyListener, ObjectId, ViewConfig, VisibilityChange,
    VisibilityState,
};

pub const LEVEL: &str = "\
##############################
#.........#........#.........#
#..*......#........+.....*...#
#.........+........#.........#
#.........#...@....#.........#
#####+#####........#####+#####
#.........#........#.........#
#....*....#........#....*....#
#.........#........+.........#
##############################";

const LAYER_FLOOR: i32 = 0;
const LAYER_WALL: i32 = 1;
const LAYER_DOOR: i32 = 2;
const LAYER_RUBBLE: i32 = 3;
const LAYER_PLAYER: i32 = 10;

const TORCH_RGB: Rgb = Rgb::new(255, 190, 110);
const TORCH_INTENSITY: f64 = 1.5;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// One player command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Point),
    Wait,
    ToggleDoors,
    DropRubble,
}

/// Parse a command string in roguelike keys: `hjklyubn` to move, `.` to
/// wait, `o` to open or close every door, `r` to drop rubble. Other
/// characters are ignored.
pub fn parse_commands(keys: &str) -> Vec<Command> {
    keys.chars()
        .filter_map(|c| {
            let (dx, dy) = match c {
                'h' => (-1, 0),
                'j' => (0, 1),
                'k' => (0, -1),
                'l' => (1, 0),
                'y' => (-1, -1),
                'u' => (1, -1),
                'b' => (-1, 1),
                'n' => (1, 1),
                '.' => return Some(Command::Wait),
                'o' => return Some(Command::ToggleDoors),
                'r' => return Some(Command::DropRubble),
                _ => return None,
            };
            Some(Command::Move(Point::new(dx, dy)))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CaveWalk
// ---------------------------------------------------------------------------

pub struct CaveWalk {
    map: Map,
    player: ObjectId,
    view: VisibilityState,
    torches: Vec<LightSource>,
    doors: Vec<ObjectId>,
    rubble: HashSet<ObjectId>,
    rng: StdRng,
    turn: u32,
}

impl CaveWalk {
    /// Build the cave from a template: `#` wall, `.` floor, `+` closed
    /// door, `*` torch on the floor, `@` the player.
    pub fn from_template(template: &str, config: ViewConfig, seed: u64) -> Result<Self> {
        let lines: Vec<&str> = template.lines().collect();
        let rows = lines.len() as i32;
        let cols = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as i32;
        let mut map = Map::new("cave", cols, rows)?;
        let mut player = None;
        let mut doors = Vec::new();
        let mut torch_spots = Vec::new();

        for (y, line) in lines.iter().enumerate() {
            for (x, c) in line.chars().enumerate() {
                let p = Point::new(x as i32, y as i32);
                let floor = map.insert_object(MapObject::new(LAYER_FLOOR));
                map.add(p, floor)?;
                match c {
                    '#' | ' ' => {
                        let wall = map.insert_object(MapObject::solid(LAYER_WALL));
                        map.add(p, wall)?;
                    }
                    '+' => {
                        let door = map.insert_object(MapObject::solid(LAYER_DOOR));
                        map.add(p, door)?;
                        doors.push(door);
                    }
                    '*' => torch_spots.push(p),
                    '@' => {
                        let id = map.insert_object(MapObject::new(LAYER_PLAYER));
                        map.add(p, id)?;
                        player = Some(id);
                    }
                    '.' => {}
                    other => bail!("unexpected {other:?} at {p}"),
                }
            }
        }
        let Some(player) = player else {
            bail!("template has no player start");
        };

        map.set_ambient_light(Rgb::new(40, 40, 60), 0.3);
        let mut torches = Vec::with_capacity(torch_spots.len());
        for p in torch_spots {
            let mut torch = LightSource::new(TORCH_RGB, TORCH_INTENSITY);
            torch.apply(&mut map, p)?;
            torches.push(torch);
        }
        let mut view = VisibilityState::bind(&mut map, player, config)?;
        view.update(&map)?;
        log::info!(
            "{map}: {} doors, {} torches, view radius {}",
            doors.len(),
            torches.len(),
            config.radius
        );
        Ok(Self {
            map,
            player,
            view,
            torches,
            doors,
            rubble: HashSet::new(),
            rng: StdRng::seed_from_u64(seed),
            turn: 0,
        })
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn view(&self) -> &VisibilityState {
        &self.view
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn player_pos(&self) -> Result<Point> {
        match self.map.position_of(self.player)? {
            Some(p) => Ok(p),
            None => bail!("player is not on the map"),
        }
    }

    /// Run one command, then let every listener catch up and refresh the
    /// view.
    pub fn step(&mut self, cmd: Command) -> Result<VisibilityChange> {
        match cmd {
            Command::Move(d) => {
                let to = self.player_pos()? + d;
                if self.map.contains(to) && !self.map[to].blocks_move() {
                    self.map.move_object(self.player, to)?;
                } else {
                    log::debug!("bump at {to}");
                }
            }
            Command::Wait => {}
            Command::ToggleDoors => {
                for &door in &self.doors {
                    self.map.update_object(door, |o| {
                        o.blocks_los = !o.blocks_los;
                        o.blocks_move = !o.blocks_move;
                    })?;
                }
            }
            Command::DropRubble => self.drop_rubble()?,
        }
        self.turn += 1;

        let mut listeners: Vec<&mut dyn NearbyListener> =
            Vec::with_capacity(self.torches.len() + 1);
        listeners.push(&mut self.view);
        for t in &mut self.torches {
            listeners.push(t);
        }
        let delivered = self.map.dispatch_dirty(&mut listeners)?;
        let change = self.view.update(&self.map)?;
        log::debug!(
            "turn {}: {delivered} batch(es), +{} -{} cells",
            self.turn,
            change.newly_visible.len(),
            change.newly_hidden.len()
        );
        Ok(change)
    }

    fn drop_rubble(&mut self) -> Result<()> {
        let range = self.map.range();
        for _ in 0..32 {
            let p = Point::new(
                self.rng.random_range(0..range.width()),
                self.rng.random_range(0..range.height()),
            );
            if self.map[p].blocks_move() || self.map[p].contains(self.player) {
                continue;
            }
            let id = self
                .map
                .insert_object(MapObject::new(LAYER_RUBBLE).with_blocks_los(true));
            self.map.add(p, id)?;
            self.rubble.insert(id);
            log::info!("rubble falls at {p}");
            return Ok(());
        }
        Ok(())
    }

    /// Render the cave as text. Visible tiles are tinted by their light
    /// when `color` is set; remembered tiles are drawn grey.
    pub fn render(&self, color: bool) -> String {
        let mut out = String::new();
        for y in 0..self.map.rows() {
            for x in 0..self.map.cols() {
                let p = Point::new(x, y);
                let tile = &self.map[p];
                let glyph = self.glyph(p);
                if self.view.in_fov(p) {
                    if color {
                        let rgb = tile.light().clamped();
                        let _ = write!(out, "\x1b[38;2;{};{};{}m{glyph}", rgb.r, rgb.g, rgb.b);
                    } else {
                        out.push(glyph);
                    }
                } else if self.view.remembered(p) {
                    if color {
                        let _ = write!(out, "\x1b[38;2;70;70;80m{glyph}");
                    } else {
                        out.push(glyph);
                    }
                } else {
                    out.push(' ');
                }
            }
            if color {
                out.push_str("\x1b[0m");
            }
            out.push('\n');
        }
        out
    }

    fn glyph(&self, p: Point) -> char {
        if self.torches.iter().any(|t| t.position() == Some(p)) {
            return '*';
        }
        let Ok(Some(top)) = self.map.highest_object(p) else {
            return ' ';
        };
        match self.map.object(top) {
            Ok(o) => match o.layer {
                LAYER_PLAYER => '@',
                LAYER_RUBBLE => '%',
                LAYER_DOOR if o.blocks_move => '+',
                LAYER_DOOR => '\'',
                LAYER_WALL => '#',
                _ => '.',
            },
            Err(_) => '?',
        }
    }
}
