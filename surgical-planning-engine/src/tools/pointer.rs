use crate::engine::camera::view_projection::ViewProjection;
use crate::engine::surface::raycast::SurfaceMesh;
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::annotation::place_annotation;
use crate::tools::brush::{begin_brush_stroke, continue_brush_stroke, finish_brush_stroke};
use crate::tools::context::{ToolContext, ToolOutcome};
use crate::tools::eraser::erase_at_pointer;
use crate::tools::labels::{LabelDrag, LabelLayout, LabelTarget};
use crate::tools::measure::{MeasurementKind, handle_angle_click, handle_two_point_click};
use crate::tools::registry::{ObjectRegistry, Removal};
use crate::tools::settings::{SceneScale, ToolSettings};
use crate::tools::tool_manager::{ToolManager, ToolType};
use bevy::input::touch::TouchPhase;
use bevy::prelude::*;
use bevy::window::{CursorLeft, PrimaryWindow, WindowFocused};
use constants::tool_defaults::TOUCH_TAP_MAX_SECS;

/// Pointer gesture in viewport pixels, unified across mouse and touch.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Down(Vec2),
    Move(Vec2),
    Up(Vec2),
    /// Release that counts as a click for the click tools.
    Tap(Vec2),
    /// Gesture aborted: touch cancelled, focus lost or cursor left the window.
    Cancel,
}

/// Tracks the press that is in progress so releases can be classified.
#[derive(Default)]
pub struct PressTracker {
    pressed_at: Option<f64>,
    touch_id: Option<u64>,
}

impl PressTracker {
    fn press(&mut self, now: f64) {
        self.pressed_at = Some(now);
    }

    /// Mouse clicks always count; touch taps must be short.
    fn release_is_tap(&mut self, now: f64, touch: bool) -> bool {
        let Some(pressed_at) = self.pressed_at.take() else {
            return false;
        };
        !touch || now - pressed_at <= TOUCH_TAP_MAX_SECS
    }

    fn reset(&mut self) {
        self.pressed_at = None;
        self.touch_id = None;
    }
}

/// Translate mouse, touch and window events into `PointerInput`.
///
/// Only the first finger of a touch gesture is tracked.
pub fn collect_pointer_input(
    mouse: Res<ButtonInput<MouseButton>>,
    time: Res<Time>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut tracker: Local<PressTracker>,
    mut cursor_moved: EventReader<CursorMoved>,
    mut cursor_left: EventReader<CursorLeft>,
    mut focus: EventReader<WindowFocused>,
    mut touches: EventReader<TouchInput>,
    mut pointer: EventWriter<PointerInput>,
) {
    let now = time.elapsed_secs_f64();
    let cursor = windows.single().ok().and_then(Window::cursor_position);

    let left = cursor_left.read().count() > 0;
    let unfocused = focus.read().fold(false, |lost, event| lost || !event.focused);
    if left || unfocused {
        if tracker.pressed_at.is_some() {
            pointer.write(PointerInput::Cancel);
        }
        tracker.reset();
        cursor_moved.clear();
        touches.clear();
        return;
    }

    if let Some(position) = cursor {
        if mouse.just_pressed(MouseButton::Left) {
            tracker.press(now);
            pointer.write(PointerInput::Down(position));
        }
        if cursor_moved.read().last().is_some() {
            pointer.write(PointerInput::Move(position));
        }
        if mouse.just_released(MouseButton::Left) {
            pointer.write(PointerInput::Up(position));
            if tracker.release_is_tap(now, false) {
                pointer.write(PointerInput::Tap(position));
            }
        }
    } else {
        cursor_moved.clear();
    }

    for touch in touches.read() {
        match touch.phase {
            TouchPhase::Started if tracker.touch_id.is_none() => {
                tracker.touch_id = Some(touch.id);
                tracker.press(now);
                pointer.write(PointerInput::Down(touch.position));
            }
            TouchPhase::Moved if tracker.touch_id == Some(touch.id) => {
                pointer.write(PointerInput::Move(touch.position));
            }
            TouchPhase::Ended if tracker.touch_id == Some(touch.id) => {
                tracker.touch_id = None;
                pointer.write(PointerInput::Up(touch.position));
                if tracker.release_is_tap(now, true) {
                    pointer.write(PointerInput::Tap(touch.position));
                }
            }
            TouchPhase::Canceled if tracker.touch_id == Some(touch.id) => {
                tracker.reset();
                pointer.write(PointerInput::Cancel);
            }
            _ => {}
        }
    }
}

/// Route one pointer event to label dragging or the active tool.
///
/// Labels sit above the surface, so a press on a label never reaches the tool.
pub fn handle_pointer(
    input: PointerInput,
    manager: &mut ToolManager,
    registry: &mut ObjectRegistry,
    layout: &LabelLayout,
    ctx: &ToolContext,
) -> Option<ToolOutcome> {
    let tool = manager.active_tool();
    let session = manager.session_mut();

    match input {
        PointerInput::Down(position) => {
            if let Some(hit) = layout.hit_test(position) {
                session.suppress_tap = true;
                if let (true, LabelTarget::Measurement(id)) = (hit.on_close, hit.target) {
                    info!("Measurement {} removed from its label", id.0);
                    return registry
                        .remove_measurement(id)
                        .map(ToolOutcome::MeasurementRemoved);
                }
                debug!("Label drag started: {:?}", hit.target);
                session.drag = Some(LabelDrag::begin(hit.target, position, hit.centre));
                return None;
            }
            session.suppress_tap = false;

            match tool {
                ToolType::Brush => {
                    session.stroke = begin_brush_stroke(ctx, position);
                    None
                }
                ToolType::Eraser => {
                    session.erasing = true;
                    erase_at_pointer(registry, ctx, position)
                }
                _ => None,
            }
        }
        PointerInput::Move(position) => {
            if let Some(drag) = session.drag {
                if let Some(label) = registry.label_mut(drag.target) {
                    drag.update(position, label, ctx.view);
                }
                return None;
            }

            match tool {
                ToolType::Brush if session.stroke.is_some() => {
                    if !session.accept_move(ctx.now) {
                        return None;
                    }
                    if let Some(stroke) = session.stroke.as_mut() {
                        continue_brush_stroke(stroke, registry, ctx, position);
                    }
                    None
                }
                ToolType::Eraser if session.erasing => {
                    if !session.accept_move(ctx.now) {
                        return None;
                    }
                    erase_at_pointer(registry, ctx, position)
                }
                _ => None,
            }
        }
        PointerInput::Up(_) => {
            if let Some(drag) = session.drag.take() {
                debug!("Label drag finished: {:?}", drag.target);
                return None;
            }
            session.erasing = false;
            let stroke = session.stroke.take()?;
            finish_brush_stroke(stroke, registry, ctx)
        }
        PointerInput::Tap(position) => {
            if std::mem::take(&mut session.suppress_tap) {
                return None;
            }
            if !matches!(
                tool,
                ToolType::Line | ToolType::Distance | ToolType::Angle | ToolType::Annotation
            ) {
                return None;
            }
            let Some(point) = ctx.pick_point(position) else {
                debug!("Click missed the surface");
                return None;
            };
            match tool {
                ToolType::Line => handle_two_point_click(session, registry, ctx, point, false),
                ToolType::Distance => handle_two_point_click(session, registry, ctx, point, true),
                ToolType::Angle => handle_angle_click(session, registry, ctx, point),
                ToolType::Annotation => Some(place_annotation(registry, ctx, point)),
                _ => None,
            }
        }
        PointerInput::Cancel => {
            session.drag = None;
            session.erasing = false;
            session.suppress_tap = false;
            let stroke = session.stroke.take()?;
            finish_brush_stroke(stroke, registry, ctx)
        }
    }
}

/// Feed pointer events through the active tool and report what changed.
pub fn dispatch_pointer_input(
    mut events: EventReader<PointerInput>,
    time: Res<Time>,
    surface: Res<SurfaceMesh>,
    view: Option<Res<ViewProjection>>,
    settings: Res<ToolSettings>,
    scale: Res<SceneScale>,
    layout: Res<LabelLayout>,
    mut tool_manager: ResMut<ToolManager>,
    mut registry: ResMut<ObjectRegistry>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    let Some(view) = view else {
        events.clear();
        return;
    };
    let ctx = ToolContext {
        surface: &surface,
        view: &view,
        settings: &settings,
        scale: &scale,
        now: time.elapsed_secs_f64(),
    };

    for input in events.read() {
        let Some(outcome) =
            handle_pointer(*input, &mut tool_manager, &mut registry, &layout, &ctx)
        else {
            continue;
        };
        report_outcome(&outcome, &mut tool_manager, &registry, &mut rpc_interface);
    }
}

fn report_outcome(
    outcome: &ToolOutcome,
    tool_manager: &mut ToolManager,
    registry: &ObjectRegistry,
    rpc_interface: &mut WebRpcInterface,
) {
    match outcome {
        ToolOutcome::StrokeCommitted(id) => {
            debug!("Stroke {} committed", id.0);
        }
        ToolOutcome::MeasurementCompleted(id) => {
            let Some(measurement) = registry.measurement(*id) else {
                return;
            };
            let text = measurement.display_value();
            info!("{} measurement: {}", measurement.kind.as_str(), text);
            if measurement.kind != MeasurementKind::Area {
                tool_manager.set_readout(text.clone());
            }
            rpc_interface.send_notification(
                "measurement_completed",
                serde_json::json!({
                    "id": measurement.id,
                    "kind": measurement.kind.as_str(),
                    "value": measurement.value,
                    "unit": measurement.unit.symbol(),
                    "text": text,
                }),
            );
        }
        ToolOutcome::AnnotationCreated(id) => {
            let Some(annotation) = registry.annotation(*id) else {
                return;
            };
            rpc_interface.send_notification(
                "annotation_created",
                serde_json::json!({
                    "id": annotation.id,
                    "anchor": annotation.anchor().to_array(),
                    "title": annotation.title(),
                }),
            );
        }
        ToolOutcome::Erased(removals) => {
            rpc_interface.send_notification("objects_erased", removal_summary(removals));
        }
        ToolOutcome::MeasurementRemoved(removal) => {
            rpc_interface.send_notification(
                "objects_erased",
                removal_summary(std::slice::from_ref(removal)),
            );
        }
    }
}

fn removal_summary(removals: &[Removal]) -> serde_json::Value {
    let mut objects = Vec::new();
    let mut measurements = Vec::new();
    let mut annotations = Vec::new();
    for removal in removals {
        objects.extend(removal.object_ids().into_iter().map(|id| id.0));
        match removal {
            Removal::Measurement { id, .. } => measurements.push(id.0),
            Removal::Annotation { id, .. } => annotations.push(id.0),
            Removal::Object(_) => {}
        }
    }
    serde_json::json!({
        "objects": objects,
        "measurements": measurements,
        "annotations": annotations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::{DrawnKind, MarkStyle};
    use crate::tools::test_support::TestScene;

    fn select(manager: &mut ToolManager, registry: &mut ObjectRegistry, tool: ToolType) {
        manager.select_tool(tool, registry);
    }

    fn layout_for(registry: &ObjectRegistry, scene: &TestScene) -> LabelLayout {
        let mut layout = LabelLayout::default();
        layout.rebuild(registry, &scene.view);
        layout
    }

    fn input_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<ButtonInput<MouseButton>>()
            .add_event::<CursorMoved>()
            .add_event::<CursorLeft>()
            .add_event::<WindowFocused>()
            .add_event::<TouchInput>()
            .add_event::<PointerInput>()
            .add_systems(Update, collect_pointer_input);
        app
    }

    fn emitted(app: &App) -> Vec<PointerInput> {
        app.world()
            .resource::<Events<PointerInput>>()
            .iter_current_update_events()
            .copied()
            .collect()
    }

    #[test]
    fn focus_loss_is_consumed_with_cursor_leave() {
        let mut app = input_app();
        let window = Entity::PLACEHOLDER;
        app.world_mut().send_event(CursorLeft { window });
        app.world_mut().send_event(WindowFocused {
            window,
            focused: false,
        });
        app.update();

        app.world_mut().send_event(TouchInput {
            phase: TouchPhase::Started,
            position: Vec2::new(40.0, 60.0),
            window,
            force: None,
            id: 3,
        });
        app.update();
        assert_eq!(emitted(&app), [PointerInput::Down(Vec2::new(40.0, 60.0))]);
    }

    #[test]
    fn distance_tool_measures_on_two_taps() {
        let scene = TestScene::new();
        let mut manager = ToolManager::default();
        let mut registry = ObjectRegistry::default();
        let layout = LabelLayout::default();
        select(&mut manager, &mut registry, ToolType::Distance);
        let ctx = scene.ctx(0.0);

        let first = scene.screen(Vec3::new(-0.5, 0.0, 0.0));
        let second = scene.screen(Vec3::new(0.5, 0.0, 0.0));
        assert!(
            handle_pointer(PointerInput::Tap(first), &mut manager, &mut registry, &layout, &ctx)
                .is_none()
        );
        let outcome =
            handle_pointer(PointerInput::Tap(second), &mut manager, &mut registry, &layout, &ctx);
        let Some(ToolOutcome::MeasurementCompleted(id)) = outcome else {
            panic!("expected a measurement, got {outcome:?}");
        };
        let measurement = registry.measurement(id).unwrap();
        assert_eq!(measurement.kind, MeasurementKind::Distance);
        assert!((measurement.value - 1.0).abs() < 0.01);
    }

    #[test]
    fn view_tool_ignores_taps() {
        let scene = TestScene::new();
        let mut manager = ToolManager::default();
        let mut registry = ObjectRegistry::default();
        let ctx = scene.ctx(0.0);
        let tap = PointerInput::Tap(scene.screen(Vec3::ZERO));
        assert!(
            handle_pointer(tap, &mut manager, &mut registry, &LabelLayout::default(), &ctx)
                .is_none()
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn brush_drag_commits_on_release() {
        let scene = TestScene::new();
        let mut manager = ToolManager::default();
        let mut registry = ObjectRegistry::default();
        let layout = LabelLayout::default();
        select(&mut manager, &mut registry, ToolType::Brush);

        let steps = [
            PointerInput::Down(scene.screen(Vec3::new(-0.6, 0.0, 0.0))),
            PointerInput::Move(scene.screen(Vec3::new(-0.2, 0.1, 0.0))),
            PointerInput::Move(scene.screen(Vec3::new(0.3, 0.0, 0.0))),
        ];
        for (frame, input) in steps.into_iter().enumerate() {
            let ctx = scene.ctx(frame as f64 * 0.1);
            handle_pointer(input, &mut manager, &mut registry, &layout, &ctx);
        }
        assert!(registry.objects().is_empty());
        assert_eq!(registry.scratch_objects().len(), 1);

        let ctx = scene.ctx(1.0);
        let outcome = handle_pointer(
            PointerInput::Up(scene.screen(Vec3::new(0.3, 0.0, 0.0))),
            &mut manager,
            &mut registry,
            &layout,
            &ctx,
        );
        assert!(matches!(outcome, Some(ToolOutcome::StrokeCommitted(_))));
        assert_eq!(registry.objects().len(), 1);
        assert_eq!(registry.objects()[0].kind(), DrawnKind::Stroke);
        assert!(registry.scratch_objects().is_empty());
    }

    #[test]
    fn cancel_finishes_stroke_like_release() {
        let scene = TestScene::new();
        let mut manager = ToolManager::default();
        let mut registry = ObjectRegistry::default();
        let layout = LabelLayout::default();
        select(&mut manager, &mut registry, ToolType::Brush);

        let ctx = scene.ctx(0.0);
        handle_pointer(
            PointerInput::Down(scene.screen(Vec3::new(-0.5, 0.0, 0.0))),
            &mut manager,
            &mut registry,
            &layout,
            &ctx,
        );
        let ctx = scene.ctx(0.5);
        handle_pointer(
            PointerInput::Move(scene.screen(Vec3::new(0.5, 0.0, 0.0))),
            &mut manager,
            &mut registry,
            &layout,
            &ctx,
        );
        let outcome =
            handle_pointer(PointerInput::Cancel, &mut manager, &mut registry, &layout, &ctx);
        assert!(matches!(outcome, Some(ToolOutcome::StrokeCommitted(_))));
        assert!(manager.session().stroke.is_none());
    }

    #[test]
    fn eraser_drag_removes_marks_under_pointer() {
        let scene = TestScene::new();
        let mut manager = ToolManager::default();
        let mut registry = ObjectRegistry::default();
        let layout = LabelLayout::default();
        let ctx = scene.ctx(0.0);
        crate::tools::brush::draw_surface_line(
            &mut registry,
            &ctx,
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 0.0),
        );
        select(&mut manager, &mut registry, ToolType::Eraser);

        handle_pointer(
            PointerInput::Down(scene.screen(Vec3::new(1.5, 1.5, 0.0))),
            &mut manager,
            &mut registry,
            &layout,
            &ctx,
        );
        assert_eq!(registry.objects().len(), 1);

        let ctx = scene.ctx(0.5);
        let outcome = handle_pointer(
            PointerInput::Move(scene.screen(Vec3::ZERO)),
            &mut manager,
            &mut registry,
            &layout,
            &ctx,
        );
        assert!(matches!(outcome, Some(ToolOutcome::Erased(_))));
        assert!(registry.objects().is_empty());
    }

    #[test]
    fn press_on_label_drags_instead_of_placing() {
        let scene = TestScene::new();
        let mut manager = ToolManager::default();
        let mut registry = ObjectRegistry::default();
        select(&mut manager, &mut registry, ToolType::Annotation);
        let anchor = Vec3::new(0.2, 0.2, 0.0);
        let id = registry.add_annotation(anchor, 0.01, MarkStyle::new([1.0; 3], 1.0));
        let layout = layout_for(&registry, &scene);
        let ctx = scene.ctx(0.0);

        let centre = layout.position(LabelTarget::Annotation(id)).unwrap();
        handle_pointer(PointerInput::Down(centre), &mut manager, &mut registry, &layout, &ctx);
        assert!(manager.session().drag.is_some());
        assert!(!manager.camera_orbit_enabled());

        let target = centre + Vec2::new(40.0, 25.0);
        handle_pointer(PointerInput::Move(target), &mut manager, &mut registry, &layout, &ctx);
        handle_pointer(PointerInput::Up(target), &mut manager, &mut registry, &layout, &ctx);
        let outcome =
            handle_pointer(PointerInput::Tap(target), &mut manager, &mut registry, &layout, &ctx);

        assert!(outcome.is_none());
        assert_eq!(registry.annotations().len(), 1);
        let label = registry.label(LabelTarget::Annotation(id)).unwrap();
        let moved = label.screen_position(&scene.view).unwrap();
        assert!(moved.distance(target) < 0.5);
    }

    #[test]
    fn close_box_removes_measurement() {
        let scene = TestScene::new();
        let mut manager = ToolManager::default();
        let mut registry = ObjectRegistry::default();
        let ctx = scene.ctx(0.0);
        let edge = crate::tools::brush::draw_surface_line(
            &mut registry,
            &ctx,
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 0.0),
        )
        .unwrap();
        let id = registry.add_measurement(
            MeasurementKind::Distance,
            1.0,
            vec![Vec3::new(-0.5, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0)],
            Vec3::ZERO,
            vec![edge],
        );
        let layout = layout_for(&registry, &scene);
        let centre = layout.position(LabelTarget::Measurement(id)).unwrap();
        let close = crate::tools::labels::close_rect(centre).center();

        let outcome =
            handle_pointer(PointerInput::Down(close), &mut manager, &mut registry, &layout, &ctx);
        assert!(matches!(outcome, Some(ToolOutcome::MeasurementRemoved(_))));
        assert!(registry.measurements().is_empty());
        assert!(registry.objects().is_empty());
    }

    #[test]
    fn removal_summary_lists_cascaded_ids() {
        let mut registry = ObjectRegistry::default();
        let id = registry.add_annotation(Vec3::ZERO, 0.01, MarkStyle::new([1.0; 3], 1.0));
        let removal = registry.remove_annotation(id).unwrap();
        let summary = removal_summary(&[removal]);
        assert_eq!(summary["annotations"], serde_json::json!([1]));
        assert_eq!(summary["objects"].as_array().map(Vec::len), Some(1));
    }
}
