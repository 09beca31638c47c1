//! Application layer for chatflow
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod registry;
pub mod use_cases;

// Re-export commonly used types
pub use config::ChatParams;
pub use ports::{
    chat_progress::{ChatProgressNotifier, NoChatProgress},
    confirmation::{
        AutoApproveConfirmation, AutoRejectConfirmation, ConfirmationError, ConfirmationPort,
    },
    frame_writer::{DEFAULT_FRAME_BUFFER, FrameStream, FrameWriter, frame_channel},
    model_backend::{
        BackendError, BackendEvent, ModelBackend, ModelMessage, StepRequest, StepStream,
    },
    tool_executor::{NoProgressSink, ProgressSink, ToolContext, ToolDescriptor, ToolExecutor},
    tool_source::{SourceRequest, ToolSourcePort},
    trace_sink::{NoTraceSink, TraceError, TraceEvent, TraceSink},
    workflow::{WorkflowCatalog, WorkflowError, WorkflowRunner, WorkflowSummary},
};
pub use registry::ToolRegistry;
pub use use_cases::assemble_tools::{
    AssembleToolsError, AssembleToolsInput, AssembleToolsUseCase, AssembledTools, AssemblyReport,
    SourceStatus,
};
pub use use_cases::record_confirmation::{ConfirmationTally, RecordConfirmationUseCase};
pub use use_cases::run_chat::{ChatError, RunChatInput, RunChatOutput, RunChatUseCase};
