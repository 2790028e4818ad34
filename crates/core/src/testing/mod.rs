//! Testing utilities and mock implementations.
//!
//! [`MockTool`] stands in for the external tool boundary so the job
//! orchestrators can be exercised without spawning real subprocesses.

mod mock_tool;

pub use mock_tool::{MockTool, RecordedCropApply};
