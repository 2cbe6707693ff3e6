// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end editing scenarios driven through the public scene API.

use vpe_graph::library::create_builtin_registry;
use vpe_graph::{Endpoint, NodeId, Point, SerializedConnector, SerializedGraph};
use vpe_scene::commands::{ConnectCommand, CreateNodeCommand};
use vpe_scene::{Key, KeyEvent, Modifiers, PointerEvent, RecordingSurface, Scene, Severity};

fn scene() -> Scene<RecordingSurface> {
    Scene::with_registry(create_builtin_registry().into_shared(), RecordingSurface::new(1024, 768)).unwrap()
}

fn add(scene: &mut Scene<RecordingSurface>, node_type: &str, x: f64, y: f64) -> NodeId {
    let node = scene
        .graph()
        .registry()
        .read()
        .create(node_type)
        .unwrap()
        .with_position(x, y);
    scene.state_mut().add_node(node).unwrap()
}

/// Device position of the middle of a slot
fn slot_point(scene: &Scene<RecordingSurface>, node: NodeId, slot: &str) -> Point {
    let visual = scene.state().node_visual(node).unwrap();
    let local = visual.layout.slots.get(slot).unwrap().rect.center();
    let position = scene.graph().node(node).unwrap().position;
    scene.state().view.map_from_scene(local + position)
}

/// Device position inside a node's title bar
fn title_point(scene: &Scene<RecordingSurface>, node: NodeId) -> Point {
    let position = scene.graph().node(node).unwrap().position;
    scene.state().view.map_from_scene(position + Point::new(5.0, -10.0))
}

fn drag(scene: &mut Scene<RecordingSurface>, from: Point, to: Point, modifiers: Modifiers) {
    scene.pointer_down(PointerEvent::primary(from.x, from.y).with_modifiers(modifiers));
    let middle = Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0);
    scene.pointer_move(PointerEvent::primary(middle.x, middle.y).with_modifiers(modifiers));
    scene.pointer_move(PointerEvent::primary(to.x, to.y).with_modifiers(modifiers));
    scene.pointer_up(PointerEvent::primary(to.x, to.y).with_modifiers(modifiers));
}

fn click(scene: &mut Scene<RecordingSurface>, at: Point, modifiers: Modifiers) {
    scene.pointer_down(PointerEvent::primary(at.x, at.y).with_modifiers(modifiers));
    scene.pointer_up(PointerEvent::primary(at.x, at.y).with_modifiers(modifiers));
}

/// Graph content independent of insertion order, plus the selection
fn snapshot(scene: &Scene<RecordingSurface>) -> (SerializedGraph, Vec<NodeId>) {
    let mut graph = scene.graph().serialize();
    graph.nodes.sort_by_key(|n| n.id);
    graph.connectors.sort_by_key(|c| c.0);
    (graph, scene.state().selected_ids())
}

fn slot_pairs(connectors: &[SerializedConnector]) -> Vec<(String, String)> {
    let mut pairs: Vec<_> = connectors.iter().map(|c| (c.2.clone(), c.4.clone())).collect();
    pairs.sort();
    pairs
}

#[test]
fn test_connect_undo_redo_scenario() {
    let mut scene = scene();
    let a = add(&mut scene, "Image.Read", 10.0, 30.0);
    let b = add(&mut scene, "Image.GaussianFilter", 200.0, 100.0);

    scene
        .exec_command(Box::new(ConnectCommand::between(
            Endpoint::new(a, "out_exec"),
            Endpoint::new(b, "in_exec"),
        )))
        .unwrap();
    scene
        .exec_command(Box::new(ConnectCommand::between(
            Endpoint::new(a, "image"),
            Endpoint::new(b, "input"),
        )))
        .unwrap();

    let data = scene.graph().serialize();
    assert_eq!(data.nodes.len(), 2);
    assert_eq!(data.connectors.len(), 2);
    assert_eq!(
        slot_pairs(&data.connectors),
        vec![
            ("image".to_string(), "input".to_string()),
            ("out_exec".to_string(), "in_exec".to_string()),
        ]
    );
    let second = data.connectors[1].clone();

    assert!(scene.undo().unwrap());
    let data = scene.graph().serialize();
    assert_eq!(data.connectors.len(), 1);
    assert_eq!(slot_pairs(&data.connectors), vec![("out_exec".to_string(), "in_exec".to_string())]);

    assert!(scene.redo().unwrap());
    let data = scene.graph().serialize();
    assert_eq!(data.connectors.len(), 2);
    assert!(data.connectors.contains(&second));
}

#[test]
fn test_undo_all_then_redo_all_restores_state() {
    let mut scene = scene();
    let initial = snapshot(&scene);

    scene
        .exec_command(Box::new(CreateNodeCommand::new("Image.Read").at(Point::new(10.0, 30.0))))
        .unwrap();
    let a = scene.graph().node_ids().next().unwrap();
    scene
        .exec_command(Box::new(
            CreateNodeCommand::new("Image.GaussianFilter").at(Point::new(300.0, 100.0)),
        ))
        .unwrap();
    let b = scene.graph().node_ids().find(|id| *id != a).unwrap();

    let from = slot_point(&scene, a, "image");
    let to = slot_point(&scene, b, "input");
    drag(&mut scene, from, to, Modifiers::NONE);
    assert_eq!(scene.graph().connector_count(), 1);

    let from = title_point(&scene, a);
    drag(&mut scene, from, from + Point::new(40.0, 60.0), Modifiers::NONE);
    assert_eq!(scene.graph().node(a).unwrap().position, Point::new(50.0, 90.0));

    scene.key_down(KeyEvent::new(Key::Char('a'), Modifiers::CTRL));
    scene.key_down(KeyEvent::new(Key::Char('d'), Modifiers::CTRL));
    assert_eq!(scene.graph().node_count(), 4);

    let steps = scene.history().len();
    assert_eq!(steps, 5);
    let last = snapshot(&scene);

    for _ in 0..steps {
        assert!(scene.undo().unwrap());
    }
    assert!(!scene.undo().unwrap());
    assert_eq!(snapshot(&scene), initial);

    for _ in 0..steps {
        assert!(scene.redo().unwrap());
    }
    assert!(!scene.redo().unwrap());
    assert_eq!(snapshot(&scene), last);
}

#[test]
fn test_copy_paste_with_offset() {
    let mut scene = scene();
    let a = add(&mut scene, "Image.Read", 10.0, 30.0);
    let b = add(&mut scene, "Image.GaussianFilter", 200.0, 100.0);
    scene
        .state_mut()
        .connect(Endpoint::new(a, "image"), Endpoint::new(b, "input"))
        .unwrap();
    scene.state_mut().select_nodes(&[a, b]);
    assert!(scene.key_down(KeyEvent::new(Key::Char('c'), Modifiers::CTRL)));

    scene.pointer_move(PointerEvent::primary(60.0, 80.0));
    assert!(scene.key_down(KeyEvent::new(Key::Char('v'), Modifiers::CTRL)));

    assert_eq!(scene.graph().node_count(), 4);
    assert_eq!(scene.graph().connector_count(), 2);
    let pasted = scene.state().selected_ids();
    assert_eq!(pasted.len(), 2);
    assert!(!pasted.contains(&a) && !pasted.contains(&b));
    assert_eq!(scene.graph().node(pasted[0]).unwrap().position, Point::new(60.0, 80.0));
    assert_eq!(scene.graph().node(pasted[1]).unwrap().position, Point::new(250.0, 150.0));

    let copy = scene
        .graph()
        .find_connector(&Endpoint::new(pasted[0], "image"), &Endpoint::new(pasted[1], "input"))
        .cloned();
    assert!(copy.is_some());

    assert!(scene.undo().unwrap());
    assert_eq!(scene.graph().node_count(), 2);
    assert_eq!(scene.graph().connector_count(), 1);
}

#[test]
fn test_click_selects_and_drag_moves() {
    let mut scene = scene();
    let a = add(&mut scene, "Image.Read", 10.0, 30.0);
    let b = add(&mut scene, "Image.Show", 300.0, 30.0);

    let p = title_point(&scene, a);
    click(&mut scene, p, Modifiers::NONE);
    assert_eq!(scene.state().selected_ids(), vec![a]);
    let p = title_point(&scene, b);
    click(&mut scene, p, Modifiers::CTRL);
    assert_eq!(scene.state().selected_ids(), vec![a, b]);
    let p = title_point(&scene, a);
    click(&mut scene, p, Modifiers::CTRL);
    assert_eq!(scene.state().selected_ids(), vec![b]);
    assert!(scene.history().is_empty());

    let from = title_point(&scene, b);
    drag(&mut scene, from, from + Point::new(-20.0, 10.0), Modifiers::NONE);
    assert_eq!(scene.graph().node(b).unwrap().position, Point::new(280.0, 40.0));
    assert_eq!(scene.graph().node(a).unwrap().position, Point::new(10.0, 30.0));
    assert_eq!(scene.undo_description(), "Undo Move 1 node(s)");
}

#[test]
fn test_marquee_on_empty_space() {
    let mut scene = scene();
    let a = add(&mut scene, "Image.Read", 10.0, 30.0);
    let b = add(&mut scene, "Image.Show", 300.0, 30.0);
    drag(&mut scene, Point::new(700.0, 600.0), Point::new(0.0, 0.0), Modifiers::NONE);
    assert_eq!(scene.state().selection_len(), 2);
    assert!(scene.state().is_selected(a) && scene.state().is_selected(b));
    assert!(scene.history().is_empty());
    assert!(scene.active_command().is_none());
}

#[test]
fn test_slot_gestures() {
    let mut scene = scene();
    let a = add(&mut scene, "Image.Read", 10.0, 30.0);
    let b = add(&mut scene, "Image.GaussianFilter", 300.0, 100.0);
    let c = add(&mut scene, "Image.Show", 300.0, 300.0);

    let from = slot_point(&scene, a, "image");
    let to = slot_point(&scene, b, "input");
    drag(&mut scene, from, to, Modifiers::NONE);
    assert!(scene
        .graph()
        .find_connector(&Endpoint::new(a, "image"), &Endpoint::new(b, "input"))
        .is_some());

    let from = slot_point(&scene, b, "input");
    let to = slot_point(&scene, c, "image");
    drag(&mut scene, from, to, Modifiers::CTRL);
    assert_eq!(scene.graph().connector_count(), 1);
    assert!(scene
        .graph()
        .find_connector(&Endpoint::new(a, "image"), &Endpoint::new(c, "image"))
        .is_some());

    let p = slot_point(&scene, c, "image");
    click(&mut scene, p, Modifiers::ALT);
    assert_eq!(scene.graph().connector_count(), 0);
    assert_eq!(scene.undo_description(), "Undo Break All Pin Link(s)");

    assert!(scene.undo().unwrap());
    assert!(scene.undo().unwrap());
    assert!(scene
        .graph()
        .find_connector(&Endpoint::new(a, "image"), &Endpoint::new(b, "input"))
        .is_some());
}

#[test]
fn test_incompatible_drop_reports_warning() {
    let mut scene = scene();
    let a = add(&mut scene, "Image.Read", 10.0, 30.0);
    let b = add(&mut scene, "Image.GaussianFilter", 300.0, 100.0);
    let from = slot_point(&scene, a, "image");
    let to = slot_point(&scene, b, "in_exec");
    drag(&mut scene, from, to, Modifiers::NONE);

    assert_eq!(scene.graph().connector_count(), 0);
    assert!(scene.history().is_empty());
    let diagnostics = scene.take_diagnostics();
    assert!(diagnostics.iter().any(|d| d.severity == Severity::Warning));
    assert!(scene.take_diagnostics().is_empty());
}

#[test]
fn test_resize_comment_by_corner() {
    let mut scene = scene();
    let comment = add(&mut scene, "Comment", 0.0, 25.0);
    drag(&mut scene, Point::new(199.0, 199.0), Point::new(249.0, 219.0), Modifiers::NONE);
    let node = scene.graph().node(comment).unwrap();
    assert_eq!(node.size.map(|s| (s.width, s.height)), Some((250.0, 220.0)));
    assert_eq!(node.position, Point::new(0.0, 25.0));
    assert_eq!(scene.history().len(), 1);
}

#[test]
fn test_render_after_edit_redraws_affected_layers() {
    let mut scene = scene();
    scene.render_now().unwrap();
    let a = add(&mut scene, "Image.Read", 10.0, 30.0);
    let redrawn = scene.render_now().unwrap();
    assert!(redrawn.contains(vpe_scene::Layer::Nodes));
    assert!(!redrawn.contains(vpe_scene::Layer::Background));
    assert!(scene.renderer().target().composites() > 0);

    scene.state_mut().select_node(a);
    let redrawn = scene.render_now().unwrap();
    assert!(!redrawn.contains(vpe_scene::Layer::Comments));
}
