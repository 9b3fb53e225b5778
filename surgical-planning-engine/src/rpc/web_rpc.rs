use crate::tools::project::{PlanReport, ProjectSnapshot};
use crate::tools::registry::{AnnotationId, MeasurementId, ObjectRegistry};
use crate::tools::settings::{SceneScale, ToolSettings, ToolSettingsPatch};
use crate::tools::tool_manager::{
    ClearToolEvent, HistoryAction, HistoryActionEvent, ToolManager, ToolSelectionEvent,
    ToolSelectionSource, ToolType,
};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// JSON-RPC 2.0 request structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Resource managing bidirectional RPC communication between the host page and Bevy.
/// Handles both request-response patterns and notification broadcasting.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
}

impl WebRpcInterface {
    /// Send notification to the host without expecting response.
    pub fn send_notification(&mut self, method: &str, params: serde_json::Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    /// Queue response for transmission to the host.
    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }
}

/// Plugin establishing WebRPC communication layer for iframe-based deployment.
pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WebRpcInterface>()
            .add_event::<IncomingRpcMessage>()
            .add_systems(
                Update,
                (
                    process_incoming_messages,
                    handle_rpc_messages,
                    send_outgoing_messages,
                )
                    .chain(),
            );

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(mut commands: Commands) {
    use std::sync::Arc;
    use std::sync::Mutex;

    // Thread-safe message queue for cross-thread communication.
    let message_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let queue_clone = message_queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();
            if message_str.contains("jsonrpc") {
                if let Ok(mut queue) = queue_clone.lock() {
                    queue.push(message_str);
                }
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    let registered = window().is_some_and(|window| {
        window
            .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
            .is_ok()
    });
    if !registered {
        error!("Failed to register message listener");
    }

    // Prevent closure from being dropped by transferring ownership to JS.
    closure.forget();
    commands.insert_resource(MessageQueue(message_queue));
}

/// Resource wrapping thread-safe message queue for WASM event handling.
#[derive(Resource)]
struct MessageQueue(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

/// Event representing incoming RPC message from the host page.
#[derive(Event)]
struct IncomingRpcMessage {
    content: String,
}

fn process_incoming_messages(
    message_queue: Option<Res<MessageQueue>>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    let Some(queue_res) = message_queue else {
        return;
    };

    let messages = if let Ok(mut queue) = queue_res.0.lock() {
        std::mem::take(&mut *queue)
    } else {
        Vec::new()
    };

    for message_str in messages {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

/// Everything an RPC method may read or change.
#[derive(SystemParam)]
pub(crate) struct RpcTargets<'w> {
    pub rpc_interface: ResMut<'w, WebRpcInterface>,
    pub tool_manager: ResMut<'w, ToolManager>,
    pub registry: ResMut<'w, ObjectRegistry>,
    pub settings: ResMut<'w, ToolSettings>,
    pub scale: ResMut<'w, SceneScale>,
    pub tool_events: EventWriter<'w, ToolSelectionEvent>,
    pub clear_tool_events: EventWriter<'w, ClearToolEvent>,
    pub history_events: EventWriter<'w, HistoryActionEvent>,
}

fn handle_rpc_messages(mut events: EventReader<IncomingRpcMessage>, mut targets: RpcTargets) {
    for event in events.read() {
        debug!("Received RPC: {}", event.content);

        match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) => {
                targets.rpc_interface.send_notification(
                    "debug_message",
                    serde_json::json!({
                        "message": format!("Processing method: {}", request.method)
                    }),
                );

                if let Some(response) = handle_rpc_request(&request, &mut targets) {
                    targets.rpc_interface.queue_response(response);
                }
            }
            Err(parse_error) => {
                warn!("Unparseable RPC message: {}", parse_error);
                targets.rpc_interface.send_notification(
                    "debug_message",
                    serde_json::json!({
                        "message": format!("Parse error: {}", parse_error)
                    }),
                );
            }
        }
    }
}

/// Run one request. Requests without an id are executed but get no response.
fn handle_rpc_request(request: &RpcRequest, targets: &mut RpcTargets) -> Option<RpcResponse> {
    let id = request.id.clone();

    if request.jsonrpc != "2.0" {
        return id.map(|id| {
            create_error_response(
                id,
                -32600,
                "Invalid Request",
                Some(serde_json::json!({"jsonrpc": request.jsonrpc})),
            )
        });
    }

    let params = &request.params;
    let result = match request.method.as_str() {
        "tool_selection" => handle_tool_selection(params, targets),
        "clear_tool" => {
            targets.clear_tool_events.write(ClearToolEvent);
            Ok(serde_json::json!({"success": true}))
        }
        "update_settings" => handle_update_settings(params, targets),
        "set_scale_factor" => handle_set_scale_factor(params, targets),
        "calibrate" => handle_calibrate(params, targets),
        "undo" => {
            targets.history_events.write(HistoryActionEvent {
                action: HistoryAction::Undo,
            });
            Ok(serde_json::json!({"success": true}))
        }
        "clear_all" => handle_clear_all(params, targets),
        "set_annotation_note" => handle_set_annotation_note(params, targets),
        "remove_measurement" => handle_remove_measurement(params, targets),
        "export_project" => handle_export_project(targets),
        "import_project" => handle_import_project(params, targets),
        "get_report" => to_result(&PlanReport::collect(&targets.registry, &targets.scale)),
        _ => {
            warn!("Unknown RPC method: {}", request.method);
            return id.map(|id| {
                create_error_response(
                    id,
                    -32601,
                    "Method not found",
                    Some(serde_json::json!({"method": request.method})),
                )
            });
        }
    };

    let id = id?;
    match result {
        Ok(result_value) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result_value),
            error: None,
            id: Some(id),
        }),
        Err(error) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        }),
    }
}

fn parse_params<T: DeserializeOwned>(
    params: &serde_json::Value,
    expected: &str,
) -> Result<T, RpcError> {
    serde_json::from_value::<T>(params.clone())
        .map_err(|error| RpcError::invalid_params(&format!("Expected {expected}: {error}")))
}

fn to_result<T: Serialize>(value: &T) -> Result<serde_json::Value, RpcError> {
    serde_json::to_value(value).map_err(|error| RpcError::internal_error(&error.to_string()))
}

/// Handle tool selection RPC method with parameter validation and event dispatch.
fn handle_tool_selection(
    params: &serde_json::Value,
    targets: &mut RpcTargets,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct ToolSelectionParams {
        tool: String,
    }

    let tool_params: ToolSelectionParams = parse_params(params, "'tool' parameter")?;
    let tool_type = ToolType::from_string(&tool_params.tool)
        .ok_or_else(|| RpcError::invalid_params(&format!("Unknown tool: {}", tool_params.tool)))?;

    targets.tool_events.write(ToolSelectionEvent {
        tool_type,
        source: ToolSelectionSource::Rpc,
    });
    info!("Tool selection event dispatched: {:?}", tool_type);

    Ok(serde_json::json!({
        "success": true,
        "active_tool": tool_type.as_str()
    }))
}

fn handle_update_settings(
    params: &serde_json::Value,
    targets: &mut RpcTargets,
) -> Result<serde_json::Value, RpcError> {
    let patch: ToolSettingsPatch = parse_params(params, "tool settings")?;
    targets.settings.apply(&patch);
    debug!("Tool settings updated: {:?}", *targets.settings);
    to_result(&*targets.settings)
}

fn handle_set_scale_factor(
    params: &serde_json::Value,
    targets: &mut RpcTargets,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct ScaleParams {
        scale_factor: f32,
    }

    let scale_params: ScaleParams = parse_params(params, "'scale_factor' parameter")?;
    targets
        .scale
        .set_scale_factor(scale_params.scale_factor)
        .map_err(|error| RpcError::invalid_params(&error.to_string()))?;
    info!("Scale factor set to {}", scale_params.scale_factor);

    Ok(serde_json::json!({"scale_factor": targets.scale.scale_factor()}))
}

fn handle_calibrate(
    params: &serde_json::Value,
    targets: &mut RpcTargets,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct CalibrateParams {
        virtual_distance: f32,
        real_distance: f32,
    }

    let calibrate: CalibrateParams =
        parse_params(params, "'virtual_distance' and 'real_distance'")?;
    let scale_factor = targets
        .scale
        .calibrate(calibrate.virtual_distance, calibrate.real_distance)
        .map_err(|error| RpcError::invalid_params(&error.to_string()))?;
    info!(
        "Calibrated: {} units = {} mm, scale factor {}",
        calibrate.virtual_distance, calibrate.real_distance, scale_factor
    );

    Ok(serde_json::json!({"scale_factor": scale_factor}))
}

fn handle_clear_all(
    params: &serde_json::Value,
    targets: &mut RpcTargets,
) -> Result<serde_json::Value, RpcError> {
    let confirmed = params
        .get("confirm")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    if !confirmed {
        return Err(RpcError::invalid_params(
            "clear_all removes every marking and annotation; pass confirm: true",
        ));
    }

    targets.history_events.write(HistoryActionEvent {
        action: HistoryAction::ClearAll,
    });
    Ok(serde_json::json!({"success": true}))
}

fn handle_set_annotation_note(
    params: &serde_json::Value,
    targets: &mut RpcTargets,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct NoteParams {
        id: AnnotationId,
        note: String,
    }

    let note: NoteParams = parse_params(params, "'id' and 'note'")?;
    if !targets.registry.set_annotation_note(note.id, &note.note) {
        return Err(RpcError::invalid_params(&format!(
            "Unknown annotation: {}",
            note.id
        )));
    }
    Ok(serde_json::json!({"success": true}))
}

fn handle_remove_measurement(
    params: &serde_json::Value,
    targets: &mut RpcTargets,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct RemoveParams {
        id: MeasurementId,
    }

    let remove: RemoveParams = parse_params(params, "'id' parameter")?;
    let removal = targets
        .registry
        .remove_measurement(remove.id)
        .ok_or_else(|| {
            RpcError::invalid_params(&format!("Unknown measurement: {}", remove.id.0))
        })?;
    let objects: Vec<u64> = removal.object_ids().into_iter().map(|id| id.0).collect();

    targets.rpc_interface.send_notification(
        "objects_erased",
        serde_json::json!({
            "objects": objects,
            "measurements": [remove.id.0],
            "annotations": [],
        }),
    );
    Ok(serde_json::json!({"success": true, "objects": objects}))
}

fn handle_export_project(targets: &mut RpcTargets) -> Result<serde_json::Value, RpcError> {
    let snapshot = ProjectSnapshot::capture(&targets.registry, &targets.scale);
    info!(
        "Exporting project: {} object(s), {} measurement(s), {} annotation(s)",
        snapshot.objects.len(),
        snapshot.measurements.len(),
        snapshot.annotations.len()
    );
    to_result(&snapshot)
}

fn handle_import_project(
    params: &serde_json::Value,
    targets: &mut RpcTargets,
) -> Result<serde_json::Value, RpcError> {
    let project = params
        .get("project")
        .cloned()
        .ok_or_else(|| RpcError::invalid_params("Expected 'project' parameter"))?;
    let snapshot = ProjectSnapshot::from_value(project)
        .map_err(|error| RpcError::invalid_params(&error.to_string()))?;

    let RpcTargets {
        tool_manager,
        registry,
        scale,
        rpc_interface,
        ..
    } = targets;

    if let Err(error) = registry.restore(snapshot, scale, tool_manager.session_mut()) {
        warn!("Project import rejected: {}", error);
        return Err(RpcError::invalid_params(&error.to_string()));
    }
    info!(
        "Project imported: {} object(s), {} measurement(s), {} annotation(s)",
        registry.objects().len(),
        registry.measurements().len(),
        registry.annotations().len()
    );

    rpc_interface.send_notification(
        "history_changed",
        serde_json::json!({
            "action": "import",
            "remaining": registry.objects().len(),
        }),
    );
    Ok(serde_json::json!({"success": true}))
}

/// Create standardised error response with optional data payload.
fn create_error_response(
    id: serde_json::Value,
    code: i32,
    message: &str,
    data: Option<serde_json::Value>,
) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.to_string(),
            data,
        }),
        id: Some(id),
    }
}

/// Send queued notifications and responses to the host page.
fn send_outgoing_messages(mut rpc_interface: ResMut<WebRpcInterface>) {
    // Send notifications first.
    for notification in rpc_interface.outgoing_notifications.drain(..) {
        send_message_to_parent(&notification);
    }

    // Send responses second to maintain order.
    for response in rpc_interface.outgoing_responses.drain(..) {
        send_message_to_parent(&response);
    }
}

/// Send serialised message to parent window.
fn send_message_to_parent<T: Serialize>(message: &T) {
    #[cfg(target_arch = "wasm32")]
    {
        match serde_json::to_string(message) {
            Ok(json) => {
                if let Some(window) = window() {
                    if let Some(parent) = window.parent().ok().flatten() {
                        if let Err(e) = parent.post_message(&JsValue::from_str(&json), "*") {
                            error!("Failed to send message to parent: {:?}", e);
                        }
                    } else {
                        warn!("No parent window available for message transmission");
                    }
                } else {
                    error!("Window object not available");
                }
            }
            Err(e) => {
                error!("Failed to serialise message: {}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
    }
}

/// Standard RPC error codes and constructors.
impl RpcError {
    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn internal_error(message: &str) -> Self {
        Self {
            code: -32603,
            message: message.to_string(),
            data: None,
        }
    }
}
