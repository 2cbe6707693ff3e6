// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interactive scene for the visual programming environment.
//!
//! This crate turns a [`vpe_graph::Graph`] into something a user can edit:
//! - [`View`]: zoom and pan between device and scene space
//! - [`CollisionDetector`]: z-ordered hit testing and area queries
//! - [`Renderer`]: layered, dirty-tracked drawing into a host [`Surface`]
//! - [`Command`] variants and the [`UndoHistory`]
//! - [`Scene`]: routes pointer, wheel and keyboard input to commands
//!
//! ## Architecture
//!
//! [`SceneState`] owns the graph with everything derived from it (layouts,
//! collision index, selection, dirty layers). Commands mutate the state only
//! through its methods so that the index and the renderer stay in sync. The
//! [`Scene`] adds the renderer, the history and the one running gesture.

pub mod clipboard;
pub mod collision;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod input;
pub mod layout;
pub mod renderer;
pub mod scene;
pub mod state;
pub mod style;
pub mod surface;
pub mod view;

pub use clipboard::{ClipboardBundle, ClipboardStore, MemoryStore};
pub use collision::{BoundingRect, CollisionDetector, HitResult, ItemId, ItemKind};
pub use commands::{Command, CommandInput};
pub use config::{ConfigError, SceneConfig};
pub use error::{Result, SceneError};
pub use history::UndoHistory;
pub use input::{Key, KeyEvent, Modifiers, MouseButton, PointerEvent, WheelEvent};
pub use layout::{CursorIcon, NodeLayout, ResizeBorder};
pub use renderer::{Frame, Layer, LayerSet, Renderer};
pub use scene::{ContextCommand, Scene, SerializedScene};
pub use state::{Diagnostic, Hover, SceneState, Severity};
pub use style::{Rgba, StyleSheet};
pub use surface::{DrawContext, DrawOp, RecordingSurface, Surface};
pub use view::{Lod, SerializedView, View};
