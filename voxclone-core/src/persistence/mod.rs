pub mod memory;
pub mod records;
pub mod storage;
pub mod store;

pub use memory::MemoryStore;
pub use records::{SpeechRecord, VoiceCloneRecord};
pub use storage::JsonFileStore;
pub use store::CloneStore;
