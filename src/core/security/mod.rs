// Security module for tool identifier validation
//
// Tool identifiers double as directory names in the tool store. This module
// makes sure an identifier can never escape the configured tools directory.

pub mod tool_id;

pub use tool_id::{IdentifierError, MAX_TOOL_ID_LEN, tool_dir, validate_tool_id};
