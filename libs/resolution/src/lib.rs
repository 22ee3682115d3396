//! External-signal resolution engine
//!
//! Turns untrusted external payloads (OAuth profiles, image-analysis labels,
//! barcode-catalog products) into canonical users and garments.
//!
//! ```text
//! raw payload → normalizer → resolver (UserStore / GarmentStore) → session issuer
//! photo → vision → classifier → background removal → object storage → normalizer → resolver
//! ```
//!
//! Every external system is reached through a trait in [`ports`], so the
//! services plug in real adapters and the tests plug in fakes.

pub mod classifier;
pub mod color;
pub mod error;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod ports;
pub mod resolver;
pub mod session;
pub mod signin;
pub mod taxonomy;

pub use classifier::LabelClassifier;
pub use error::{
    Collaborator, CredentialError, ProviderError, ResolutionError, ResolutionResult, StoreError,
};
pub use normalizer::{Normalizer, normalize_classification, normalize_oauth};
pub use pipeline::{AnalyzedGarment, Collaborators, IngestionPipeline, PhotoUpload};
pub use ports::CollaboratorTimeouts;
pub use resolver::{GarmentResolver, ResolvedUser, UserResolver};
pub use session::{Claims, IssuedSession, SessionConfig, SessionError, SessionIssuer};
pub use signin::{Registration, SignIn, SignedIn};
pub use taxonomy::Taxonomy;
