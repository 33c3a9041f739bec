// Export components
pub mod google_calendar;
pub mod prompt_parser;

pub use google_calendar::{EventMaterializer, TokenManager};
pub use prompt_parser::{EventDescriptor, PromptParser};
