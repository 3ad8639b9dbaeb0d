pub mod builder;
pub mod model;
pub mod serializer;

pub use builder::TreeLayoutBuilder;
pub use model::{
    Cluster, EdgeRole, LayoutEdge, LayoutNode, Mountpoint, NodeRef, PairKey, RankGroup, TreeLayout,
};
pub use serializer::{DotFormatter, JsonFormatter, LayoutFormatter, LayoutSerializer, OutputFormat};
