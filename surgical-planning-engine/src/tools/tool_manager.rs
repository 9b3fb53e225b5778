use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::brush::StrokeBuilder;
use crate::tools::labels::LabelDrag;
use crate::tools::measure::ClickSequence;
use crate::tools::registry::{ObjectId, ObjectRegistry, Removal};
use bevy::prelude::*;
use constants::tool_defaults::{
    CLEAR_CONFIRM_WINDOW_SECS, POINTER_MOVE_INTERVAL_SECS, TRANSIENT_MARKER_LIFETIME_SECS,
};
use serde::{Deserialize, Serialize};

/// Enumeration of available tools in the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    #[default]
    View,
    Brush,
    Eraser,
    Line,
    Annotation,
    Distance,
    Angle,
}

impl ToolType {
    pub const ALL: [ToolType; 7] = [
        Self::View,
        Self::Brush,
        Self::Eraser,
        Self::Line,
        Self::Annotation,
        Self::Distance,
        Self::Angle,
    ];

    /// Convert string identifier to tool type for RPC compatibility.
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "view" => Some(Self::View),
            "brush" => Some(Self::Brush),
            "eraser" => Some(Self::Eraser),
            "line" => Some(Self::Line),
            "annotation" => Some(Self::Annotation),
            "distance" => Some(Self::Distance),
            "angle" => Some(Self::Angle),
            _ => None,
        }
    }

    /// Convert tool type to string identifier for frontend communication.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Brush => "brush",
            Self::Eraser => "eraser",
            Self::Line => "line",
            Self::Annotation => "annotation",
            Self::Distance => "distance",
            Self::Angle => "angle",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::View => "View",
            Self::Brush => "Surgical marker",
            Self::Eraser => "Eraser",
            Self::Line => "Surface line",
            Self::Annotation => "Annotation",
            Self::Distance => "Distance",
            Self::Angle => "Angle",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Self::View => "Drag to orbit, scroll to zoom",
            Self::Brush => "Drag on the surface to draw; close the loop to measure its area",
            Self::Eraser => "Drag over markings to erase them",
            Self::Line => "Click two points to draw a line along the surface",
            Self::Annotation => "Click the surface to pin a numbered note",
            Self::Distance => "Click two points to measure the distance",
            Self::Angle => "Click start, vertex, then end",
        }
    }

    /// Tools that show the numeric readout.
    pub fn shows_readout(&self) -> bool {
        matches!(self, Self::Distance | Self::Angle)
    }
}

/// Ephemeral per-gesture state. Nothing here outlives a tool transition.
#[derive(Debug, Default)]
pub struct InteractionSession {
    pub stroke: Option<StrokeBuilder>,
    pub clicks: ClickSequence,
    pub last_angle_click: Option<Vec3>,
    pub erasing: bool,
    /// At most one label is dragged at a time.
    pub drag: Option<LabelDrag>,
    /// Set when a press landed on a label, so its release is not a tool click.
    pub suppress_tap: bool,
    expiring: Vec<(ObjectId, f64)>,
    last_move_at: Option<f64>,
}

impl InteractionSession {
    /// Schedule click markers for removal.
    pub fn expire_later(&mut self, markers: &[ObjectId], now: f64) {
        let deadline = now + TRANSIENT_MARKER_LIFETIME_SECS;
        self.expiring
            .extend(markers.iter().map(|id| (*id, deadline)));
    }

    pub fn has_due_markers(&self, now: f64) -> bool {
        self.expiring.iter().any(|(_, deadline)| *deadline <= now)
    }

    pub fn expire_markers(&mut self, registry: &mut ObjectRegistry, now: f64) {
        self.expiring.retain(|(id, deadline)| {
            let due = *deadline <= now;
            if due {
                registry.remove_scratch(*id);
            }
            !due
        });
    }

    pub fn flush_expiring(&mut self, registry: &mut ObjectRegistry) {
        for (id, _) in self.expiring.drain(..) {
            registry.remove_scratch(id);
        }
    }

    /// Throttle for pointer moves while drawing or erasing.
    pub fn accept_move(&mut self, now: f64) -> bool {
        if self
            .last_move_at
            .is_some_and(|last| now - last < POINTER_MOVE_INTERVAL_SECS)
        {
            return false;
        }
        self.last_move_at = Some(now);
        true
    }

    /// Drop every in-progress gesture and the objects it put on screen.
    /// Returns whether an unfinished stroke or click sequence was dropped.
    pub fn discard(&mut self, registry: &mut ObjectRegistry) -> bool {
        let unfinished = self.stroke.is_some() || !self.clicks.points.is_empty();
        if let Some(mut stroke) = self.stroke.take() {
            stroke.discard(registry);
        }
        let clicks = std::mem::take(&mut self.clicks);
        for id in clicks.markers.into_iter().chain(clicks.edges) {
            registry.remove_scratch(id);
        }
        self.flush_expiring(registry);
        *self = Self::default();
        unfinished
    }
}

/// Result of a tool selection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolTransition {
    Activated { previous: ToolType, tool: ToolType },
    PanelToggled { visible: bool },
    Unchanged,
}

/// Resource tracking the currently active tool and tool-specific state.
#[derive(Resource, Debug, Default)]
pub struct ToolManager {
    active_tool: ToolType,
    settings_panel_visible: bool,
    /// Text of the most recent distance or angle.
    readout: Option<String>,
    session: InteractionSession,
}

impl ToolManager {
    /// Switch tools, or toggle the settings panel when the active tool is
    /// selected again. Switching always discards in-progress gestures.
    pub fn select_tool(&mut self, tool: ToolType, registry: &mut ObjectRegistry) -> ToolTransition {
        if tool == self.active_tool {
            if tool == ToolType::View {
                return ToolTransition::Unchanged;
            }
            self.settings_panel_visible = !self.settings_panel_visible;
            return ToolTransition::PanelToggled {
                visible: self.settings_panel_visible,
            };
        }

        self.session.discard(registry);
        self.readout = None;
        let previous = std::mem::replace(&mut self.active_tool, tool);
        self.settings_panel_visible = tool != ToolType::View;
        info!("Tool manager activated: {}", tool.as_str());
        ToolTransition::Activated { previous, tool }
    }

    /// Get currently active tool type.
    pub fn active_tool(&self) -> ToolType {
        self.active_tool
    }

    /// Check if specific tool is currently active.
    pub fn is_tool_active(&self, tool_type: ToolType) -> bool {
        self.active_tool == tool_type
    }

    pub fn settings_panel_visible(&self) -> bool {
        self.settings_panel_visible
    }

    pub fn readout_visible(&self) -> bool {
        self.active_tool.shows_readout()
    }

    pub fn readout(&self) -> Option<&str> {
        self.readout.as_deref()
    }

    pub fn set_readout(&mut self, text: String) {
        self.readout = Some(text);
    }

    /// Orbit only in the view tool, and never while a label is dragged.
    pub fn camera_orbit_enabled(&self) -> bool {
        self.active_tool == ToolType::View && self.session.drag.is_none()
    }

    pub fn session(&self) -> &InteractionSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut InteractionSession {
        &mut self.session
    }

    /// Host-facing summary of the tool state.
    pub fn state_json(&self) -> serde_json::Value {
        serde_json::json!({
            "tool": self.active_tool.as_str(),
            "settings_panel_visible": self.settings_panel_visible,
            "readout_visible": self.readout_visible(),
            "orbit_enabled": self.camera_orbit_enabled(),
        })
    }
}

/// Event fired when tool selection changes via RPC or keyboard shortcuts.
#[derive(Event)]
pub struct ToolSelectionEvent {
    pub tool_type: ToolType,
    pub source: ToolSelectionSource,
}

/// Source of tool selection for debugging and conditional logic.
#[derive(Debug, Clone, Copy)]
pub enum ToolSelectionSource {
    Rpc,
    Keyboard,
}

/// Return to the view tool.
#[derive(Event)]
pub struct ClearToolEvent;

/// Event fired when undo or clear is requested.
#[derive(Event)]
pub struct HistoryActionEvent {
    pub action: HistoryAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    /// Only sent once the user has confirmed.
    ClearAll,
}

/// System handling tool selection events with proper state coordination.
pub fn handle_tool_selection_events(
    mut events: EventReader<ToolSelectionEvent>,
    mut tool_manager: ResMut<ToolManager>,
    mut registry: ResMut<ObjectRegistry>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for event in events.read() {
        let transition = tool_manager.select_tool(event.tool_type, &mut registry);
        match transition {
            ToolTransition::Activated { previous, tool } => {
                info!(
                    "{} activated via {:?} (was {})",
                    tool.title(),
                    event.source,
                    previous.as_str()
                );
                rpc_interface.send_notification("tool_state_changed", tool_manager.state_json());
            }
            ToolTransition::PanelToggled { visible } => {
                debug!("Settings panel visible: {}", visible);
                rpc_interface.send_notification("tool_state_changed", tool_manager.state_json());
            }
            ToolTransition::Unchanged => {}
        }
    }
}

pub fn handle_clear_tool_events(
    mut events: EventReader<ClearToolEvent>,
    mut tool_events: EventWriter<ToolSelectionEvent>,
    tool_manager: Res<ToolManager>,
) {
    for _ in events.read() {
        if !tool_manager.is_tool_active(ToolType::View) {
            tool_events.write(ToolSelectionEvent {
                tool_type: ToolType::View,
                source: ToolSelectionSource::Rpc,
            });
        }
    }
}

/// System applying undo and confirmed clear requests.
pub fn handle_history_events(
    mut events: EventReader<HistoryActionEvent>,
    mut tool_manager: ResMut<ToolManager>,
    mut registry: ResMut<ObjectRegistry>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for event in events.read() {
        let cancelled = tool_manager.session_mut().discard(&mut registry);
        match event.action {
            HistoryAction::Undo if cancelled => {
                debug!("Undo cancelled the gesture in progress");
                rpc_interface.send_notification(
                    "history_changed",
                    serde_json::json!({
                        "action": "cancel",
                        "removed": [],
                        "remaining": registry.objects().len(),
                    }),
                );
            }
            HistoryAction::Undo => {
                let removal = registry.undo();
                let removed: Vec<u64> = removal
                    .as_ref()
                    .map(Removal::object_ids)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|id| id.0)
                    .collect();
                if removal.is_some() {
                    info!("Undo removed {} object(s)", removed.len());
                } else {
                    debug!("Nothing to undo");
                }
                rpc_interface.send_notification(
                    "history_changed",
                    serde_json::json!({
                        "action": "undo",
                        "removed": removed,
                        "remaining": registry.objects().len(),
                    }),
                );
            }
            HistoryAction::ClearAll => {
                registry.clear_all();
                info!("All markings and annotations cleared");
                rpc_interface.send_notification(
                    "history_changed",
                    serde_json::json!({
                        "action": "clear_all",
                        "remaining": 0,
                    }),
                );
            }
        }
    }
}

/// Remove click markers whose lifetime is over.
pub fn expire_transient_markers(
    time: Res<Time>,
    mut tool_manager: ResMut<ToolManager>,
    mut registry: ResMut<ObjectRegistry>,
) {
    let now = time.elapsed_secs_f64();
    if !tool_manager.session().has_due_markers(now) {
        return;
    }
    tool_manager
        .session_mut()
        .expire_markers(&mut registry, now);
}

/// Two presses inside the confirmation window confirm a destructive clear.
pub fn confirm_clear(armed_at: &mut Option<f64>, now: f64) -> bool {
    match armed_at.take() {
        Some(at) if now - at <= CLEAR_CONFIRM_WINDOW_SECS => true,
        _ => {
            *armed_at = Some(now);
            false
        }
    }
}

/// System handling keyboard shortcuts for tool selection (native builds only).
#[cfg(not(target_arch = "wasm32"))]
pub fn handle_tool_keyboard_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut clear_armed_at: Local<Option<f64>>,
    mut tool_events: EventWriter<ToolSelectionEvent>,
    mut history_events: EventWriter<HistoryActionEvent>,
    mut settings: ResMut<crate::tools::settings::ToolSettings>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    const TOOL_KEYS: [(KeyCode, ToolType); 7] = [
        (KeyCode::KeyV, ToolType::View),
        (KeyCode::KeyB, ToolType::Brush),
        (KeyCode::KeyE, ToolType::Eraser),
        (KeyCode::KeyL, ToolType::Line),
        (KeyCode::KeyN, ToolType::Annotation),
        (KeyCode::KeyD, ToolType::Distance),
        (KeyCode::KeyA, ToolType::Angle),
    ];
    const PRESET_KEYS: [KeyCode; 10] = [
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
        KeyCode::Digit7,
        KeyCode::Digit8,
        KeyCode::Digit9,
        KeyCode::Digit0,
    ];

    let ctrl = keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]);
    if ctrl {
        if keyboard.just_pressed(KeyCode::KeyZ) {
            history_events.write(HistoryActionEvent {
                action: HistoryAction::Undo,
            });
        }
        return;
    }

    for (key, tool_type) in TOOL_KEYS {
        if keyboard.just_pressed(key) {
            tool_events.write(ToolSelectionEvent {
                tool_type,
                source: ToolSelectionSource::Keyboard,
            });
        }
    }

    for (index, key) in PRESET_KEYS.into_iter().enumerate() {
        if keyboard.just_pressed(key) && settings.set_preset(index) {
            debug!("Marker colour preset {} selected", index + 1);
            rpc_interface.send_notification(
                "settings_changed",
                serde_json::to_value(&*settings).unwrap_or_default(),
            );
        }
    }

    if keyboard.just_pressed(KeyCode::Delete) {
        if confirm_clear(&mut clear_armed_at, time.elapsed_secs_f64()) {
            history_events.write(HistoryActionEvent {
                action: HistoryAction::ClearAll,
            });
        } else {
            warn!("Clear all surgical markings and annotations? Press Delete again to confirm");
        }
    }
}

/// Placeholder system for WASM builds where keyboard shortcuts are disabled.
#[cfg(target_arch = "wasm32")]
pub fn handle_tool_keyboard_shortcuts() {
    // No keyboard shortcuts in WASM builds - tools controlled via RPC only.
}

#[cfg(not(target_arch = "wasm32"))]
pub fn clear_tool_on_escape(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut clear_events: EventWriter<ClearToolEvent>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        clear_events.write(ClearToolEvent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::labels::LabelTarget;
    use crate::tools::brush::draw_surface_line;
    use crate::tools::measure::handle_angle_click;
    use crate::tools::registry::{AnnotationId, DrawnGeometry, MarkStyle};
    use crate::tools::test_support::TestScene;

    #[test]
    fn starts_in_view_with_orbit() {
        let manager = ToolManager::default();
        assert_eq!(manager.active_tool(), ToolType::View);
        assert!(manager.camera_orbit_enabled());
        assert!(!manager.settings_panel_visible());
    }

    #[test]
    fn orbit_only_in_view_tool() {
        let mut manager = ToolManager::default();
        let mut registry = ObjectRegistry::default();
        for tool in ToolType::ALL {
            manager.select_tool(tool, &mut registry);
            assert_eq!(manager.camera_orbit_enabled(), tool == ToolType::View);
            assert_eq!(manager.readout_visible(), tool.shows_readout());
        }
    }

    #[test]
    fn reselecting_toggles_settings_panel() {
        let mut manager = ToolManager::default();
        let mut registry = ObjectRegistry::default();
        manager.select_tool(ToolType::Brush, &mut registry);
        assert!(manager.settings_panel_visible());
        assert_eq!(
            manager.select_tool(ToolType::Brush, &mut registry),
            ToolTransition::PanelToggled { visible: false }
        );
        assert_eq!(
            manager.select_tool(ToolType::Brush, &mut registry),
            ToolTransition::PanelToggled { visible: true }
        );
        manager.select_tool(ToolType::View, &mut registry);
        assert_eq!(
            manager.select_tool(ToolType::View, &mut registry),
            ToolTransition::Unchanged
        );
    }

    #[test]
    fn transition_discards_pending_gesture() {
        let mut manager = ToolManager::default();
        let mut registry = ObjectRegistry::default();
        manager.select_tool(ToolType::Angle, &mut registry);

        let style = MarkStyle::new([1.0; 3], 1.0);
        let marker = registry.add_scratch(DrawnGeometry::marker(Vec3::ZERO, 0.1), style);
        let edge = registry.add_scratch(
            DrawnGeometry::stroke(vec![Vec3::ZERO, Vec3::X], 0.01).unwrap(),
            style,
        );
        let session = manager.session_mut();
        session.clicks.points = vec![Vec3::X, Vec3::ZERO];
        session.clicks.markers.push(marker);
        session.clicks.edges.push(edge);
        session.drag = Some(LabelDrag::begin(
            LabelTarget::Annotation(AnnotationId(1)),
            Vec2::ZERO,
            Vec2::ZERO,
        ));

        manager.select_tool(ToolType::Distance, &mut registry);
        assert!(manager.session().clicks.points.is_empty());
        assert!(manager.session().drag.is_none());
        assert!(registry.rendered_objects().next().is_none());
    }

    fn history_app(manager: ToolManager, registry: ObjectRegistry) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(manager)
            .insert_resource(registry)
            .init_resource::<WebRpcInterface>()
            .add_event::<HistoryActionEvent>()
            .add_systems(Update, handle_history_events);
        app
    }

    fn undo(app: &mut App) {
        app.world_mut().send_event(HistoryActionEvent {
            action: HistoryAction::Undo,
        });
        app.update();
    }

    #[test]
    fn undo_during_angle_cancels_only_the_angle() {
        let scene = TestScene::new();
        let mut manager = ToolManager::default();
        let mut registry = ObjectRegistry::default();
        let ctx = scene.ctx(0.0);
        let earlier = draw_surface_line(
            &mut registry,
            &ctx,
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.5, -0.5, 0.0),
        )
        .unwrap();

        manager.select_tool(ToolType::Angle, &mut registry);
        handle_angle_click(manager.session_mut(), &mut registry, &ctx, Vec3::new(0.5, 0.0, 0.0));
        handle_angle_click(manager.session_mut(), &mut registry, &ctx, Vec3::ZERO);
        assert_eq!(registry.objects().len(), 1);

        let mut app = history_app(manager, registry);
        undo(&mut app);
        let registry = app.world().resource::<ObjectRegistry>();
        assert_eq!(registry.objects().len(), 1);
        assert_eq!(registry.objects()[0].id, earlier);
        assert!(registry.scratch_objects().is_empty());
        assert!(app.world().resource::<ToolManager>().session().clicks.points.is_empty());

        undo(&mut app);
        assert!(app.world().resource::<ObjectRegistry>().objects().is_empty());
    }

    #[test]
    fn drag_suspends_orbit() {
        let mut manager = ToolManager::default();
        manager.session_mut().drag = Some(LabelDrag::begin(
            LabelTarget::Annotation(AnnotationId(1)),
            Vec2::ZERO,
            Vec2::ZERO,
        ));
        assert!(!manager.camera_orbit_enabled());
        manager.session_mut().drag = None;
        assert!(manager.camera_orbit_enabled());
    }

    #[test]
    fn markers_expire_after_lifetime() {
        let mut session = InteractionSession::default();
        let mut registry = ObjectRegistry::default();
        let marker = registry.add_scratch(
            DrawnGeometry::marker(Vec3::ZERO, 0.1),
            MarkStyle::new([1.0; 3], 1.0),
        );
        session.expire_later(&[marker], 10.0);

        assert!(!session.has_due_markers(12.0));
        assert!(session.has_due_markers(13.0));
        session.expire_markers(&mut registry, 13.0);
        assert!(registry.scratch_objects().is_empty());
    }

    #[test]
    fn pointer_moves_are_throttled() {
        let mut session = InteractionSession::default();
        assert!(session.accept_move(1.0));
        assert!(!session.accept_move(1.005));
        assert!(session.accept_move(1.02));
    }

    #[test]
    fn clear_needs_second_press_inside_window() {
        let mut armed = None;
        assert!(!confirm_clear(&mut armed, 1.0));
        assert!(confirm_clear(&mut armed, 2.5));
        assert!(!confirm_clear(&mut armed, 3.0));
        assert!(!confirm_clear(&mut armed, 6.0));
    }

    #[test]
    fn tool_names_round_trip() {
        for tool in ToolType::ALL {
            assert_eq!(ToolType::from_string(tool.as_str()), Some(tool));
        }
        assert_eq!(ToolType::from_string("Brush"), Some(ToolType::Brush));
        assert_eq!(ToolType::from_string("polygon"), None);
    }
}
