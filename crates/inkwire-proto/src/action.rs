//! Protocol actions.
//!
//! An action is a flat JSON object with a mandatory string `kind`
//! discriminant. Request actions add a `requestId` (empty when no reply is
//! expected), responses add a `responseId`, and operations add
//! `isOperation: true`. This shape is the wire contract: encoding an action
//! and decoding it again must produce an equivalent value, including for
//! kinds this crate does not know about (they are preserved verbatim in
//! [`Action::Custom`]).
//!
//! # Invariants
//!
//! - Kind uniqueness: each variant corresponds to exactly one `kind` string,
//!   available as the `KIND` constant on its payload type.
//! - Unknown kinds are not an error. They deserialize into [`Action::Custom`]
//!   and re-serialize unchanged, so a client can forward actions it does not
//!   understand.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{ModelRoot, Point};

fn default_true() -> bool {
    true
}

/// All actions exchanged between client and server.
///
/// The `kind` field selects the variant; payload fields are flattened beside
/// it. The [`Action::Custom`] fallback must stay last so unknown kinds fall
/// through to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Action {
    /// Ask the server for the current model (correlated request).
    #[serde(rename = "requestModel")]
    RequestModel(RequestModelAction),

    /// Server delivers a full model, usually answering `requestModel`.
    #[serde(rename = "setModel")]
    SetModel(SetModelAction),

    /// Server replaces the model after a mutation.
    #[serde(rename = "updateModel")]
    UpdateModel(UpdateModelAction),

    /// Server-side status for the client to surface.
    #[serde(rename = "serverStatus")]
    ServerStatus(ServerStatusAction),

    /// Dirty-state change of the server-side model.
    #[serde(rename = "setDirtyState")]
    SetDirtyState(SetDirtyStateAction),

    /// Server rejects a pending request.
    #[serde(rename = "rejectRequest")]
    Reject(RejectAction),

    /// Apply CSS classes to an element (transient view state).
    #[serde(rename = "addCssClasses")]
    AddCssClasses(AddCssClassesAction),

    /// Remove CSS classes from an element (transient view state).
    #[serde(rename = "removeCssClasses")]
    RemoveCssClasses(RemoveCssClassesAction),

    /// Toggle the client's debug decorations.
    #[serde(rename = "enableDebugMode")]
    EnableDebugMode(EnableDebugModeAction),

    /// Create a node (server-fulfilled operation).
    #[serde(rename = "createNode")]
    CreateNode(CreateNodeOperation),

    /// Delete elements (server-fulfilled operation).
    #[serde(rename = "deleteElement")]
    DeleteElement(DeleteElementOperation),

    /// Apply an edited label text (server-fulfilled operation).
    #[serde(rename = "applyLabelEdit")]
    ApplyLabelEdit(ApplyLabelEditOperation),

    /// Undo the previous operation on the server.
    #[serde(rename = "undo")]
    Undo(UndoOperation),

    /// Redo the previously undone operation on the server.
    #[serde(rename = "redo")]
    Redo(RedoOperation),

    /// Any action kind this crate does not model. Preserved verbatim.
    #[serde(untagged)]
    Custom(CustomAction),
}

impl Action {
    /// The `kind` discriminant of this action.
    pub fn kind(&self) -> &str {
        match self {
            Self::RequestModel(_) => RequestModelAction::KIND,
            Self::SetModel(_) => SetModelAction::KIND,
            Self::UpdateModel(_) => UpdateModelAction::KIND,
            Self::ServerStatus(_) => ServerStatusAction::KIND,
            Self::SetDirtyState(_) => SetDirtyStateAction::KIND,
            Self::Reject(_) => RejectAction::KIND,
            Self::AddCssClasses(_) => AddCssClassesAction::KIND,
            Self::RemoveCssClasses(_) => RemoveCssClassesAction::KIND,
            Self::EnableDebugMode(_) => EnableDebugModeAction::KIND,
            Self::CreateNode(_) => CreateNodeOperation::KIND,
            Self::DeleteElement(_) => DeleteElementOperation::KIND,
            Self::ApplyLabelEdit(_) => ApplyLabelEditOperation::KIND,
            Self::Undo(_) => UndoOperation::KIND,
            Self::Redo(_) => RedoOperation::KIND,
            Self::Custom(custom) => &custom.kind,
        }
    }

    /// The `requestId` of a request-shaped action.
    ///
    /// `Some("")` is a meaningful wire state: the caller expects no reply.
    /// `None` means this action is not a request at all.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::RequestModel(request) => Some(&request.request_id),
            Self::Custom(custom) => custom.properties.get("requestId").and_then(Value::as_str),
            _ => None,
        }
    }

    /// The correlation id of a response action.
    ///
    /// Returns `None` when absent or empty; an empty `responseId` carries no
    /// correlation and the action is routed like any other.
    pub fn response_id(&self) -> Option<&str> {
        let id = match self {
            Self::SetModel(set_model) => set_model.response_id.as_str(),
            Self::Reject(reject) => reject.response_id.as_str(),
            Self::Custom(custom) => {
                custom.properties.get("responseId").and_then(Value::as_str).unwrap_or("")
            },
            _ => "",
        };
        if id.is_empty() { None } else { Some(id) }
    }

    /// Whether this action is an operation (a server-fulfilled mutation).
    pub fn is_operation(&self) -> bool {
        match self {
            Self::CreateNode(op) => op.is_operation,
            Self::DeleteElement(op) => op.is_operation,
            Self::ApplyLabelEdit(op) => op.is_operation,
            Self::Undo(op) => op.is_operation,
            Self::Redo(op) => op.is_operation,
            Self::Custom(custom) => {
                custom.properties.get("isOperation").and_then(Value::as_bool) == Some(true)
            },
            _ => false,
        }
    }

    /// Substitute the `requestId` of a request-shaped action.
    ///
    /// No effect on actions that are not requests.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        match &mut self {
            Self::RequestModel(request) => request.request_id = id,
            Self::Custom(custom) => {
                if custom.properties.contains_key("requestId") {
                    custom.properties.insert("requestId".to_string(), Value::String(id));
                }
            },
            _ => {},
        }
        self
    }
}

/// Check that a JSON value has the minimal action shape (string `kind`).
pub fn is_action_value(value: &Value) -> bool {
    value.as_object().is_some_and(|object| object.get("kind").is_some_and(Value::is_string))
}

/// Check that a JSON value is a request action (string `requestId` present).
pub fn is_request_value(value: &Value) -> bool {
    is_action_value(value) && value.get("requestId").is_some_and(Value::is_string)
}

/// Check that a JSON value is a response action (non-empty `responseId`).
pub fn is_response_value(value: &Value) -> bool {
    is_action_value(value)
        && value.get("responseId").and_then(Value::as_str).is_some_and(|id| !id.is_empty())
}

/// Check that a JSON value is an operation (`isOperation: true`).
pub fn is_operation_value(value: &Value) -> bool {
    is_action_value(value) && value.get("isOperation").and_then(Value::as_bool) == Some(true)
}

/// Request the current model from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestModelAction {
    /// Client-supplied options forwarded to the model factory.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,

    /// Correlation id. Empty when no reply is expected.
    #[serde(default)]
    pub request_id: String,
}

impl RequestModelAction {
    /// Wire discriminant.
    pub const KIND: &'static str = "requestModel";

    /// Create a request with empty `requestId` (no correlation yet).
    pub fn new(options: Map<String, Value>) -> Self {
        Self { options, request_id: String::new() }
    }
}

/// Replace the client's model with a freshly loaded one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetModelAction {
    /// The new model root.
    pub new_root: ModelRoot,

    /// Correlation id of the `requestModel` this answers. Empty when the
    /// server pushed the model unsolicited.
    #[serde(default)]
    pub response_id: String,
}

impl SetModelAction {
    /// Wire discriminant.
    pub const KIND: &'static str = "setModel";

    /// Create an unsolicited model load (empty `responseId`).
    pub fn new(new_root: ModelRoot) -> Self {
        Self { new_root, response_id: String::new() }
    }

    /// Create a response to a `requestModel` with the given correlation id.
    pub fn response(new_root: ModelRoot, response_id: impl Into<String>) -> Self {
        Self { new_root, response_id: response_id.into() }
    }
}

/// Replace the model after a server-side mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModelAction {
    /// The new model root.
    pub new_root: ModelRoot,

    /// Whether the client should animate the transition. Defaults to `true`.
    #[serde(default = "default_true")]
    pub animate: bool,
}

impl UpdateModelAction {
    /// Wire discriminant.
    pub const KIND: &'static str = "updateModel";

    /// Create an animated model update.
    pub fn new(new_root: ModelRoot) -> Self {
        Self { new_root, animate: true }
    }
}

/// Severity of a server status notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusSeverity {
    /// Clear any previous status.
    None,
    /// Informational.
    Info,
    /// Something the user should notice.
    Warning,
    /// A recoverable server-side failure.
    Error,
    /// An unrecoverable server-side failure.
    Fatal,
}

/// Server-side status for the client to surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatusAction {
    /// Status severity.
    pub severity: StatusSeverity,

    /// Human-readable status message.
    pub message: String,
}

impl ServerStatusAction {
    /// Wire discriminant.
    pub const KIND: &'static str = "serverStatus";

    /// Create a status action.
    pub fn new(severity: StatusSeverity, message: impl Into<String>) -> Self {
        Self { severity, message: message.into() }
    }
}

/// Dirty-state change of the server-side model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDirtyStateAction {
    /// Whether the model has unsaved changes.
    pub is_dirty: bool,

    /// What caused the change (e.g. `operation`, `undo`, `save`).
    #[serde(default)]
    pub reason: String,
}

impl SetDirtyStateAction {
    /// Wire discriminant.
    pub const KIND: &'static str = "setDirtyState";

    /// Create a dirty-state action.
    pub fn new(is_dirty: bool, reason: impl Into<String>) -> Self {
        Self { is_dirty, reason: reason.into() }
    }
}

/// Server rejection of a pending request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectAction {
    /// Why the request was rejected.
    pub message: String,

    /// Structured rejection detail, `null` when absent.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub detail: Value,

    /// Correlation id of the rejected request.
    #[serde(default)]
    pub response_id: String,
}

impl RejectAction {
    /// Wire discriminant.
    pub const KIND: &'static str = "rejectRequest";

    /// Create a rejection for the given correlation id.
    pub fn new(message: impl Into<String>, response_id: impl Into<String>) -> Self {
        Self { message: message.into(), detail: Value::Null, response_id: response_id.into() }
    }
}

/// Apply CSS classes to one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCssClassesAction {
    /// Target element id.
    pub element_id: String,

    /// Classes to apply (idempotent per class).
    pub classes: Vec<String>,
}

impl AddCssClassesAction {
    /// Wire discriminant.
    pub const KIND: &'static str = "addCssClasses";

    /// Create an apply action for one element.
    pub fn new(element_id: impl Into<String>, classes: Vec<String>) -> Self {
        Self { element_id: element_id.into(), classes }
    }
}

/// Remove CSS classes from one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCssClassesAction {
    /// Target element id.
    pub element_id: String,

    /// Classes to remove.
    pub classes: Vec<String>,
}

impl RemoveCssClassesAction {
    /// Wire discriminant.
    pub const KIND: &'static str = "removeCssClasses";

    /// Create a remove action for one element.
    pub fn new(element_id: impl Into<String>, classes: Vec<String>) -> Self {
        Self { element_id: element_id.into(), classes }
    }
}

/// Toggle the client's debug decorations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableDebugModeAction {
    /// `true` to enable, `false` to disable.
    pub enable: bool,
}

impl EnableDebugModeAction {
    /// Wire discriminant.
    pub const KIND: &'static str = "enableDebugMode";

    /// Create a debug-mode toggle.
    pub fn new(enable: bool) -> Self {
        Self { enable }
    }
}

/// Create a node in the diagram. Fulfilled by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeOperation {
    /// Type of node to create.
    pub element_type_id: String,

    /// Where to place the node, if the gesture supplied a position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Point>,

    /// Operation marker, always `true` on the wire.
    #[serde(default)]
    pub is_operation: bool,
}

impl CreateNodeOperation {
    /// Wire discriminant.
    pub const KIND: &'static str = "createNode";

    /// Create an unplaced node-creation operation.
    pub fn new(element_type_id: impl Into<String>) -> Self {
        Self { element_type_id: element_type_id.into(), location: None, is_operation: true }
    }

    /// Attach a target position.
    pub fn at(mut self, location: Point) -> Self {
        self.location = Some(location);
        self
    }
}

/// Delete elements from the diagram. Fulfilled by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteElementOperation {
    /// Ids of the elements to delete.
    pub element_ids: Vec<String>,

    /// Operation marker, always `true` on the wire.
    #[serde(default)]
    pub is_operation: bool,
}

impl DeleteElementOperation {
    /// Wire discriminant.
    pub const KIND: &'static str = "deleteElement";

    /// Create a deletion operation.
    pub fn new(element_ids: Vec<String>) -> Self {
        Self { element_ids, is_operation: true }
    }
}

/// Apply an edited label text. Fulfilled by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyLabelEditOperation {
    /// Id of the label element.
    pub label_id: String,

    /// New label text.
    pub text: String,

    /// Operation marker, always `true` on the wire.
    #[serde(default)]
    pub is_operation: bool,
}

impl ApplyLabelEditOperation {
    /// Wire discriminant.
    pub const KIND: &'static str = "applyLabelEdit";

    /// Create a label-edit operation.
    pub fn new(label_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { label_id: label_id.into(), text: text.into(), is_operation: true }
    }
}

/// Undo the previous operation. Fulfilled by the server; the client keeps no
/// local undo history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoOperation {
    /// Operation marker, always `true` on the wire.
    #[serde(default)]
    pub is_operation: bool,
}

impl UndoOperation {
    /// Wire discriminant.
    pub const KIND: &'static str = "undo";

    /// Create an undo operation.
    pub fn new() -> Self {
        Self { is_operation: true }
    }
}

impl Default for UndoOperation {
    fn default() -> Self {
        Self::new()
    }
}

/// Redo the previously undone operation. Fulfilled by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedoOperation {
    /// Operation marker, always `true` on the wire.
    #[serde(default)]
    pub is_operation: bool,
}

impl RedoOperation {
    /// Wire discriminant.
    pub const KIND: &'static str = "redo";

    /// Create a redo operation.
    pub fn new() -> Self {
        Self { is_operation: true }
    }
}

impl Default for RedoOperation {
    fn default() -> Self {
        Self::new()
    }
}

/// An action kind this crate does not model.
///
/// Tools and server extensions exchange their own action kinds; the runtime
/// routes them by `kind` like any other action and preserves their payload
/// verbatim on re-serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAction {
    /// The wire discriminant.
    pub kind: String,

    /// All remaining payload fields, untouched.
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl CustomAction {
    /// Create a custom action with an empty payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), properties: Map::new() }
    }

    /// Attach a payload property.
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}
