//! Application state shared across handlers

use resolution::{IngestionPipeline, SessionIssuer};

use crate::repositories::GarmentRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: IngestionPipeline,
    pub garments: GarmentRepository,
    pub sessions: SessionIssuer,
}
