pub mod breathing_task;
pub mod chat_task;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the main WebSocket handler to make it easily accessible
// to the binary that will build the web server router.
pub use rest::{
    create_study_session_handler, export_calendar_handler, export_doc_handler,
    export_form_handler, generate_quiz_handler, generate_summary_handler,
};
pub use ws_handler::ws_handler;
