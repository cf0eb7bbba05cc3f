use crate::errors::{ClickError, ClickResult};
use crate::llm::types::{FunctionDef, ToolDef};

/// Loads the planner's function declarations from prompts/tools/actions.json.
/// The JSON is embedded at compile time via include_str!.
pub fn load_action_tools() -> ClickResult<Vec<ToolDef>> {
    let json = include_str!("../../prompts/tools/actions.json");
    serde_json::from_str(json)
        .map_err(|e| ClickError::Config(format!("Failed to parse action tools: {e}")))
}

pub const RETURN_COORDINATES: &str = "return_coordinates";

/// The single tool declared to the grounding backend.
pub fn return_coordinates_tool() -> ToolDef {
    let coord = |desc: &str| serde_json::json!({ "type": "integer", "description": desc });
    ToolDef {
        def_type: "function".into(),
        function: FunctionDef {
            name: RETURN_COORDINATES.into(),
            description: "Return the bounding box coordinates of the found element".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "xmin": coord("Left coordinate"),
                    "ymin": coord("Top coordinate"),
                    "xmax": coord("Right coordinate"),
                    "ymax": coord("Bottom coordinate"),
                },
                "required": ["xmin", "ymin", "xmax", "ymax"],
            }),
        },
    }
}
