pub mod classifier;
pub mod resolver;
pub mod store;

pub use classifier::FamilyClassifier;
pub use resolver::{PartnerLink, RelationResolver};
pub use store::RelationStore;
