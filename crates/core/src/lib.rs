pub mod article;
pub mod config;
pub mod error;
pub mod fetch;
pub mod heuristic;
pub mod highlight;
pub mod metadata;
pub mod orchestrator;
pub mod parse;
pub mod postprocess;
pub mod preprocess;
pub mod protocol;
pub mod remote;
pub mod render;
pub mod scoring;
pub mod session;
pub mod speech;
pub mod wordmap;

pub use article::{ArticleRecord, ContentFormat, PageContext, project_text, text_segments};
pub use config::{ExtractionConfig, RecitalConfig, RecitalConfigBuilder, RemoteBackend, RemoteConfig, SpeechConfig};
pub use error::{RecitalError, Result};
pub use fetch::FetchConfig;
pub use fetch::{fetch_file, fetch_stdin, fetch_url};
pub use heuristic::{extract_generic, extract_heuristic, extract_site_specific};
pub use highlight::{HighlightHandle, HighlightRenderer, HighlightSurface, NodeRange, TextBuffer};
pub use metadata::PageMetadata;
pub use orchestrator::{AttemptOutcome, ExtractionAttempt, ExtractionMethod, MethodKind, Orchestrator};
pub use parse::Document;
#[doc(hidden)]
pub use postprocess::PostProcessConfig;
pub use postprocess::postprocess_html;
#[doc(hidden)]
pub use preprocess::PreprocessConfig;
pub use preprocess::preprocess_html;
pub use protocol::{LocalTransport, ReaderService, ReaderSession, Request, Response, Transport};
pub use remote::RemoteClient;
pub use render::{OutputFormat, RenderConfig, render_article};
#[doc(hidden)]
pub use scoring::{ScoreConfig, base_tag_score, class_id_weight, content_density_score, link_density};
pub use session::{SessionId, SessionStore};
pub use speech::{
    PacedEngine, PlaybackState, SpeechController, SpeechEngine, SpeechEvent, SpeechEventKind, SpeechSession,
    UtteranceRequest, Voice,
};
pub use wordmap::{WordPositionEntry, WordTable, build_table};
