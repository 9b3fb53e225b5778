//! JSON-RPC 2.0 communication layer for host page integration.
//!
//! Implements bidirectional messaging between Bevy engine and the host page via
//! iframe postMessage, supporting both request-response and notification patterns.
//!
//! ## Architecture
//!
//! The RPC system uses standard JSON-RPC 2.0 protocol with:
//! - **Requests**: Expect responses with matching IDs
//! - **Notifications**: One-way messages without responses
//! - **Responses**: Reply to requests with results or errors
//!
//! ## Message Flow
//!
//! ```text
//! Host (Parent Window)  <──postMessage──>  Bevy (iframe)
//!        │                                        │
//!        ├─ Request (with ID) ──────────────────> │
//!        │                                        ├─ Process request
//!        │ <───────────────── Response (with ID) ─┤
//!        │                                        │
//!        │ <────────── Notification (no ID) ─────┤
//! ```
//!
//! ## Adding New RPC Methods
//!
//! ### 1. Define Request Handler
//!
//! Add a new method case in `handle_rpc_request()`:
//!
//! ```rust,ignore
//! fn handle_rpc_request(request: &RpcRequest, ...) -> Option<RpcResponse> {
//!     let result = match request.method.as_str() {
//!         "your_method_name" => handle_your_method(&request.params, ...),
//!         // ... existing methods
//!         _ => return Some(create_error_response(id, -32601, "Method not found", None)),
//!     };
//!     // ... response creation
//! }
//! ```
//!
//! ### 2. Implement Handler Function
//!
//! ```rust,ignore
//! fn handle_your_method(
//!     params: &Value,
//!     // ... required resources
//! ) -> Result<Value, RpcError> {
//!     // Deserialize parameters
//!     #[derive(Deserialize)]
//!     struct YourParams {
//!         field: String,
//!     }
//!
//!     let parsed = serde_json::from_value::<YourParams>(params.clone())
//!         .map_err(|_| RpcError::invalid_params("Expected 'field' parameter"))?;
//!
//!     // Process logic here
//!
//!     // Return success response
//!     Ok(json!({
//!         "success": true,
//!         "result": parsed.field
//!     }))
//! }
//! ```
//!
//! ### 3. Call From the Host
//!
//! ```typescript
//! // Request-response pattern
//! const response = await window.postMessage({
//!   jsonrpc: "2.0",
//!   method: "your_method_name",
//!   params: { field: "value" },
//!   id: 1
//! }, "*");
//!
//! // Notification pattern (no response expected)
//! window.postMessage({
//!   jsonrpc: "2.0",
//!   method: "your_notification",
//!   params: { data: "value" }
//! }, "*");
//! ```
//!
//! ## Sending Notifications from Bevy
//!
//! Use `WebRpcInterface::send_notification()` to push updates to the host:
//!
//! ```rust,ignore
//! fn your_system(mut rpc: ResMut<WebRpcInterface>) {
//!     rpc.send_notification("event_name", json!({
//!         "data": "value",
//!         "timestamp": 123456
//!     }));
//! }
//! ```
//!
//! ## Error Handling
//!
//! Standard JSON-RPC 2.0 error codes:
//! - `-32600`: Invalid request
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//! - `-32603`: Internal error
//!
//! ## Existing Methods
//!
//! ### Tool Management
//! - `tool_selection`: Activate a tool, or toggle its settings panel when already active
//! - `clear_tool`: Return to the view tool
//! - `update_settings`: Change colour, line width, opacity, surface offset or eraser radius
//!
//! ### Calibration
//! - `set_scale_factor`: Millimetres per scene unit
//! - `calibrate`: Derive the scale factor from a known distance pair
//!
//! ### History
//! - `undo`: Remove the most recent drawing
//! - `clear_all`: Remove everything, requires `confirm: true`
//!
//! ### Annotations and Measurements
//! - `set_annotation_note`: Edit an annotation's note text
//! - `remove_measurement`: Delete a measurement with its geometry
//!
//! ### Project
//! - `export_project`: Snapshot of drawings, measurements and annotations
//! - `import_project`: Replace the current state, rejected as a whole if invalid
//! - `get_report`: Measurement and annotation listing for report export
//!
//! ## Notifications
//!
//! `tool_state_changed`, `measurement_completed`, `annotation_created`,
//! `objects_erased`, `history_changed`, `settings_changed`, `model_loaded`,
//! `debug_message`

/// JSON-RPC 2.0 bidirectional communication system for host page integration.
///
/// Handles request-response patterns, notifications, and WASM message listeners.
pub mod web_rpc;
