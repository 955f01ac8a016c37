//! Debugger collaborator seam
//!
//! The debugging engine is only callable from the thread that owns it, so
//! implementations are used through `Rc` and are deliberately not `Send`.

use crate::types::TargetId;

/// A live debugging session
pub trait DebugSession {
    /// Execute a single literal command and return its captured output.
    ///
    /// Engine failures are reported in the returned text.
    fn execute(&self, command: &str) -> String;

    /// Name of the process image or dump file under debug
    fn target_name(&self) -> String;

    /// Human-readable execution state ("running", "break", "dump", ...)
    fn target_state(&self) -> String;

    /// Process id of the target, 0 when unknown
    fn process_id(&self) -> u32;

    /// Target architecture ("x64", "arm64", ...)
    fn architecture(&self) -> String;

    /// Debugger flavour ("WinDbg", "CDB", "gdb", ...)
    fn debugger_type(&self) -> String;

    /// True once the operator requested a break (Ctrl+C)
    fn is_interrupted(&self) -> bool;

    /// Plain output
    fn output(&self, text: &str);

    /// Error output
    fn output_error(&self, text: &str);

    /// Warning output
    fn output_warning(&self, text: &str);

    /// Streaming reasoning output
    fn output_thinking(&self, text: &str);

    /// Final assistant response
    fn output_response(&self, text: &str);

    /// Target identity used to key conversation state
    fn target_id(&self) -> TargetId {
        TargetId::new(self.target_name())
    }
}
