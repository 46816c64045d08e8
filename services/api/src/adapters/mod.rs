pub mod chat_llm;
pub mod firestore;
pub mod gemini;
pub mod google_workspace;
pub mod quiz_llm;
pub mod sentiment;
pub mod storage;
pub mod summary_llm;
pub mod vision;

pub use chat_llm::GeminiChatAdapter;
pub use firestore::FirestoreAdapter;
pub use gemini::GeminiClient;
pub use google_workspace::GoogleWorkspaceAdapter;
pub use quiz_llm::GeminiQuizAdapter;
pub use sentiment::GoogleSentimentAdapter;
pub use storage::FirebaseStorageAdapter;
pub use summary_llm::GeminiSummaryAdapter;
pub use vision::GoogleVisionAdapter;
