mod core;
pub use self::core::{OpenAiCompatible, completion_stream};
